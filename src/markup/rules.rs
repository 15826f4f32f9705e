//! Individual rewrite rules of the markup pipeline.
//!
//! Every rule is a pure `(text, config) -> text` function. Rules only see
//! the text handed to them; protecting spans from later rules is the
//! pipeline's job (see `markup::translate`).

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::config::FormattingConfig;

static PREFORMATTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^~([^~\n]+)~$").unwrap());
static FENCED_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```([^\n]*)\n([\s\S]*?)```").unwrap());
static INLINE_CODE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"`([^`\n]*)`").unwrap());
static QUOTE_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(^|\n)(>[^\n]*\n)+").unwrap());
static QUOTE_MARK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^> ?").unwrap());
static LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"!?\[(.*?)\]\((.*?)\)").unwrap());
static SPOILER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\|\|(.+?)\|\|").unwrap());
static BOLD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*\*(.+?)\*\*").unwrap());
static UNDERLINE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"__(.+?)__").unwrap());
static ITALIC: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"_(.+?)_").unwrap());
static STRIKETHROUGH: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"~(.+?)~").unwrap());
static HEADER_2: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^#{2,}[ \t]([^\r\n]*)").unwrap());
static HEADER_1: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^#[ \t]([^\r\n]*)").unwrap());
static LIST_2: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]+[-*][ \t]([^\r\n]*)").unwrap());
static LIST_1: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[-*][ \t]([^\r\n]*)").unwrap());
static BLANK_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());

/// Spans emitted by the code rules.
pub(crate) static CODE_SPAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<pre>[\s\S]*?</pre>|<code>[\s\S]*?</code>").unwrap());
/// Anchors emitted by the link rule.
pub(crate) static ANCHOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<a\b[^>]*>[\s\S]*?</a>").unwrap());

/// Escape the characters Telegram's HTML mode treats specially.
///
/// `&` goes first so the entities produced for `<` and `>` are left alone.
pub fn escape_html(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// `~text~` on a line of its own → `<pre>`.
pub fn preformatted(text: &str, _config: &FormattingConfig) -> String {
    PREFORMATTED
        .replace_all(text, |caps: &Captures| {
            format!("<pre>{}</pre>", escape_html(&caps[1]))
        })
        .into_owned()
}

/// ```` ```lang\ncode``` ```` → `<pre><code class="language-lang">`.
pub fn fenced_code(text: &str, _config: &FormattingConfig) -> String {
    FENCED_CODE
        .replace_all(text, |caps: &Captures| {
            let lang = caps[1].trim();
            let code = escape_html(&caps[2]);
            if lang.is_empty() {
                format!("<pre><code>{code}</code></pre>")
            } else {
                format!("<pre><code class=\"language-{lang}\">{code}</code></pre>")
            }
        })
        .into_owned()
}

/// `` `code` `` → `<code>`.
pub fn inline_code(text: &str, _config: &FormattingConfig) -> String {
    INLINE_CODE
        .replace_all(text, |caps: &Captures| {
            format!("<code>{}</code>", escape_html(&caps[1]))
        })
        .into_owned()
}

/// Consecutive `>` lines → a single `<blockquote>`.
///
/// Only lines terminated by `\n` are considered.
pub fn blockquotes(text: &str, _config: &FormattingConfig) -> String {
    QUOTE_BLOCK
        .replace_all(text, |caps: &Captures| {
            let lead = &caps[1];
            let body = QUOTE_MARK.replace_all(&caps[0], "");
            format!("{lead}<blockquote>{}</blockquote>\n", body.trim())
        })
        .into_owned()
}

/// `[label](url)` and `![label](url)` → `<a href="url">label</a>`.
pub fn links(text: &str, _config: &FormattingConfig) -> String {
    LINK.replace_all(text, |caps: &Captures| {
        format!("<a href=\"{}\">{}</a>", &caps[2], &caps[1])
    })
    .into_owned()
}

/// `||text||` → Telegram spoiler.
pub fn spoilers(text: &str, _config: &FormattingConfig) -> String {
    wrap(&SPOILER, text, "<span class=\"tg-spoiler\">", "</span>")
}

/// `**text**` → `<b>`.
pub fn bold(text: &str, _config: &FormattingConfig) -> String {
    wrap(&BOLD, text, "<b>", "</b>")
}

/// `__text__` → `<u>`.
pub fn underline(text: &str, _config: &FormattingConfig) -> String {
    wrap(&UNDERLINE, text, "<u>", "</u>")
}

/// `_text_` → `<i>`. Must run after [`underline`].
pub fn italic(text: &str, _config: &FormattingConfig) -> String {
    wrap(&ITALIC, text, "<i>", "</i>")
}

/// Inline `~text~` → `<s>`. Whole-line pairs were already taken by [`preformatted`].
pub fn strikethrough(text: &str, _config: &FormattingConfig) -> String {
    wrap(&STRIKETHROUGH, text, "<s>", "</s>")
}

/// `## title` and `# title` → `<strong>` lines with the configured markers.
pub fn headers(text: &str, config: &FormattingConfig) -> String {
    let text = HEADER_2.replace_all(text, |caps: &Captures| {
        format!("<strong>{}</strong>", with_marker(config.header_second(), &caps[1]))
    });
    HEADER_1
        .replace_all(&text, |caps: &Captures| {
            format!("<strong>{}</strong>", with_marker(config.header_first(), &caps[1]))
        })
        .into_owned()
}

/// `-`/`*` bullets → marker lines; indented bullets become the second level.
pub fn lists(text: &str, config: &FormattingConfig) -> String {
    let text = LIST_2.replace_all(text, |caps: &Captures| {
        format!("   {} {}", config.list_second(), &caps[1])
    });
    LIST_1
        .replace_all(&text, |caps: &Captures| {
            format!(" {} {}", config.list_first(), &caps[1])
        })
        .into_owned()
}

/// Three or more newlines → one blank line.
pub fn collapse_blank_lines(text: &str, _config: &FormattingConfig) -> String {
    BLANK_RUN.replace_all(text, "\n\n").into_owned()
}

/// Drop the blank line right after a closed `<pre>` block.
pub fn tighten_after_pre(text: &str) -> String {
    text.replace("</pre>\n\n", "</pre>\n")
}

fn wrap(pattern: &Regex, text: &str, open: &str, close: &str) -> String {
    pattern
        .replace_all(text, |caps: &Captures| format!("{open}{}{close}", &caps[1]))
        .into_owned()
}

fn with_marker(marker: Option<&str>, title: &str) -> String {
    match marker {
        Some(marker) => format!("{marker} {title}"),
        None => title.to_string(),
    }
}
