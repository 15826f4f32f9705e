//! Note markup → Telegram HTML translation.
//!
//! The translator is a fixed-order pipeline of pure rules (see [`rules`]).
//! Order matters:
//! 1. Code rules run first and their output is shelved, so no later rule
//!    sees the code contents. Fenced blocks go before whole-line `~pre~` so
//!    a tilde line inside a fence stays literal code.
//! 2. Links run before emphasis and are shelved too, so `_`, `*` and `~`
//!    inside labels and URLs stay literal.
//! 3. Line rules (headers, lists) run last, after inline markup is settled.
//!
//! Ordinary prose is not HTML-escaped; only code contents are.

pub mod rules;

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::config::FormattingConfig;

type Rewrite = fn(&str, &FormattingConfig) -> String;

/// One pipeline stage.
struct Step {
    rewrite: Rewrite,
    /// Spans produced by this step that later steps must not touch.
    shelves: Option<&'static LazyLock<Regex>>,
}

static PIPELINE: [Step; 13] = [
    Step { rewrite: rules::fenced_code, shelves: Some(&rules::CODE_SPAN) },
    Step { rewrite: rules::preformatted, shelves: Some(&rules::CODE_SPAN) },
    Step { rewrite: rules::inline_code, shelves: Some(&rules::CODE_SPAN) },
    Step { rewrite: rules::blockquotes, shelves: None },
    Step { rewrite: rules::links, shelves: Some(&rules::ANCHOR) },
    Step { rewrite: rules::spoilers, shelves: None },
    Step { rewrite: rules::bold, shelves: None },
    Step { rewrite: rules::underline, shelves: None },
    Step { rewrite: rules::italic, shelves: None },
    Step { rewrite: rules::strikethrough, shelves: None },
    Step { rewrite: rules::headers, shelves: None },
    Step { rewrite: rules::lists, shelves: None },
    Step { rewrite: rules::collapse_blank_lines, shelves: None },
];

/// Translate note markup into Telegram HTML.
pub fn translate(input: &str, config: &FormattingConfig) -> String {
    // Line rules expect every line, the last one included, to end in '\n'.
    let terminated = input.ends_with('\n');
    let mut text = if terminated {
        input.to_string()
    } else {
        format!("{input}\n")
    };

    let mut shelf = Shelf::default();
    for step in &PIPELINE {
        text = (step.rewrite)(&text, config);
        if let Some(pattern) = step.shelves {
            text = shelf.stash(pattern, &text);
        }
    }

    let mut text = rules::tighten_after_pre(&shelf.restore(text));
    if !terminated {
        text.pop();
    }
    text
}

// ── Shelf ───────────────────────────────────────────────────────────

const OPEN: char = '\u{E000}';
const CLOSE: char = '\u{E001}';

static TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("\u{E000}([0-9]+)\u{E001}").unwrap());

/// Finished spans swapped out for opaque tokens while the remaining rules run.
///
/// Tokens use private-use code points and carry no markup characters, so no
/// rule can match inside them.
#[derive(Debug, Default)]
struct Shelf {
    spans: Vec<String>,
}

impl Shelf {
    fn stash(&mut self, pattern: &Regex, text: &str) -> String {
        pattern
            .replace_all(text, |caps: &Captures| {
                self.spans.push(caps[0].to_string());
                format!("{OPEN}{}{CLOSE}", self.spans.len() - 1)
            })
            .into_owned()
    }

    /// Put every shelved span back. Later spans may contain tokens of
    /// earlier ones, so restoring repeats; nesting is never deeper than the
    /// number of spans. Tokens that name no span are left as they are.
    fn restore(&self, mut text: String) -> String {
        for _ in 0..=self.spans.len() {
            if !TOKEN.is_match(&text) {
                break;
            }
            text = TOKEN
                .replace_all(&text, |caps: &Captures| {
                    caps[1]
                        .parse::<usize>()
                        .ok()
                        .and_then(|i| self.spans.get(i))
                        .map_or_else(|| caps[0].to_string(), Clone::clone)
                })
                .into_owned();
        }
        text
    }
}
