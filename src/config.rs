//! Configuration types.
//!
//! Process settings come from environment variables; channel aliases and
//! formatting markers come from a YAML file read once at startup.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use secrecy::SecretString;
use serde::Deserialize;

use crate::channels::telegram::TELEGRAM_API_URL;
use crate::error::ConfigError;

/// Marker used for list items when none is configured.
pub const DEFAULT_LIST_MARKER: &str = "–";

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_CONFIG_PATH: &str = "config.yml";
const DEFAULT_CORS_ORIGIN: &str = "http://0.0.0.0:8081";

// ── Formatting ──────────────────────────────────────────────────────

/// First/second level marker strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MarkerPair {
    pub first: Option<String>,
    pub second: Option<String>,
}

/// Markers the translator puts in front of headers and list items.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FormattingConfig {
    pub header: MarkerPair,
    pub list: MarkerPair,
}

impl FormattingConfig {
    /// Level-1 header prefix, `None` when unset or empty.
    pub fn header_first(&self) -> Option<&str> {
        non_empty(self.header.first.as_deref())
    }

    /// Level-2 header prefix, `None` when unset or empty.
    pub fn header_second(&self) -> Option<&str> {
        non_empty(self.header.second.as_deref())
    }

    pub fn list_first(&self) -> &str {
        self.list.first.as_deref().unwrap_or(DEFAULT_LIST_MARKER)
    }

    pub fn list_second(&self) -> &str {
        self.list.second.as_deref().unwrap_or(DEFAULT_LIST_MARKER)
    }
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.filter(|s| !s.is_empty())
}

// ── Config file ─────────────────────────────────────────────────────

/// A chat reference in the channel collection: numeric id or `@username`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum ChatRef {
    Id(i64),
    Name(String),
}

impl From<ChatRef> for String {
    fn from(chat: ChatRef) -> Self {
        match chat {
            ChatRef::Id(id) => id.to_string(),
            ChatRef::Name(name) => name,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawFileConfig {
    collection: BTreeMap<String, ChatRef>,
    format: FormattingConfig,
}

/// Contents of the YAML config file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileConfig {
    /// Channel alias → chat id.
    pub collection: BTreeMap<String, String>,
    pub format: FormattingConfig,
}

impl FileConfig {
    /// Parse YAML config text. An empty document yields the defaults.
    pub fn parse(yaml: &str, origin: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let raw: RawFileConfig =
            serde_yaml::from_str(yaml).map_err(|e| ConfigError::ParseError {
                path: origin.to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self {
            collection: raw
                .collection
                .into_iter()
                .map(|(name, chat)| (name, chat.into()))
                .collect(),
            format: raw.format,
        })
    }

    /// Load the config file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(yaml) => Self::parse(&yaml, &path.display().to_string()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(path = %path.display(), "Config file not found, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(ConfigError::Io(e)),
        }
    }

    /// Resolve a channel alias to its chat id; unknown names pass through.
    pub fn resolve_channel<'a>(&'a self, channel: &'a str) -> &'a str {
        self.collection
            .get(channel)
            .map_or(channel, String::as_str)
    }
}

// ── Process config ──────────────────────────────────────────────────

/// Relay process configuration, built from environment variables.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub bot_token: SecretString,
    pub port: u16,
    /// Directory uploads are written to; `None` keeps them in memory.
    pub upload_path: Option<PathBuf>,
    pub config_path: PathBuf,
    pub cors_origin: String,
    pub api_url: String,
    /// Directory for a daily-rotated log file; `None` logs to stderr only.
    pub log_dir: Option<PathBuf>,
}

impl RelayConfig {
    /// Build config from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary variable lookup.
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bot_token = var("BOT_TOKEN")
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar("BOT_TOKEN".into()))?;

        let port = match var("PORT") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
                key: "PORT".into(),
                message: format!("not a port number: {raw:?}"),
            })?,
            None => DEFAULT_PORT,
        };

        let upload_path = var("BOT_UPLOAD_PATH")
            .filter(|p| !p.is_empty())
            .map(PathBuf::from);

        let config_path = var("RELAY_CONFIG")
            .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);

        let cors_origin =
            var("RELAY_CORS_ORIGIN").unwrap_or_else(|| DEFAULT_CORS_ORIGIN.to_string());

        let api_url = var("TELEGRAM_API_URL")
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|| TELEGRAM_API_URL.to_string());

        let log_dir = var("RELAY_LOG_DIR")
            .filter(|p| !p.is_empty())
            .map(PathBuf::from);

        Ok(Self {
            bot_token: SecretString::from(bot_token),
            port,
            upload_path,
            config_path,
            cors_origin,
            api_url,
            log_dir,
        })
    }
}
