//! Error types for the relay.

use crate::content::ContentType;

/// Errors raised while wiring the relay at startup.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Upload error: {0}")]
    Upload(#[from] UploadError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to parse configuration file {path}: {reason}")]
    ParseError { path: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while unpacking an uploaded export archive.
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("Invalid zip archive: {0}")]
    Invalid(#[from] zip::result::ZipError),

    #[error("Failed to read archive entry {name}: {source}")]
    Entry {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised while storing an upload before extraction.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("Failed to persist upload to {path}: {source}")]
    Persist {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read stored upload {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Telegram Bot API errors.
#[derive(Debug, thiserror::Error)]
pub enum TelegramError {
    /// The Bot API answered with `ok: false`.
    #[error("{method} failed with {code} ({name}): {description}")]
    Api {
        method: String,
        code: u16,
        name: String,
        description: String,
    },

    /// The request never produced an API answer.
    #[error("{method} request failed: {reason}")]
    Http { method: String, reason: String },

    /// The API answered with something that is not a Bot API envelope.
    #[error("Invalid response from {method}: {reason}")]
    InvalidResponse { method: String, reason: String },
}

impl TelegramError {
    /// Numeric code surfaced to HTTP callers.
    pub fn code(&self) -> u16 {
        match self {
            Self::Api { code, .. } => *code,
            Self::Http { .. } | Self::InvalidResponse { .. } => 502,
        }
    }

    /// Short error name surfaced to HTTP callers.
    pub fn name(&self) -> &str {
        match self {
            Self::Api { name, .. } => name,
            Self::Http { .. } => "Bad Gateway",
            Self::InvalidResponse { .. } => "Invalid Response",
        }
    }

    /// Human-readable description surfaced to HTTP callers.
    pub fn description(&self) -> String {
        match self {
            Self::Api { description, .. } => description.clone(),
            Self::Http { reason, .. } | Self::InvalidResponse { reason, .. } => reason.clone(),
        }
    }
}

/// Errors raised while turning an outgoing message into client calls.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Content type {content_type} cannot be sent with {count} media item(s)")]
    MediaMismatch {
        content_type: ContentType,
        count: usize,
    },

    #[error(transparent)]
    Client(#[from] TelegramError),
}

/// Result type alias for the relay.
pub type Result<T> = std::result::Result<T, Error>;
