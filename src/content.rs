//! Outgoing message model and content classification.
//!
//! An uploaded export becomes one [`OutgoingMessage`]. Its [`ContentType`]
//! decides which dispatch operation is used:
//! 1. An explicit client hint always wins
//! 2. No media → `text`
//! 3. One media item → that item's kind
//! 4. Two or more → `group`

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ── Content type ────────────────────────────────────────────────────

/// Shape of the outgoing message body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    /// Plain text message without media.
    Text,
    /// Generic single media item, sent according to the item's own kind.
    Media,
    Photo,
    Video,
    Audio,
    /// Any attachment.
    Document,
    /// Two or more media items sent as an album.
    Group,
}

impl ContentType {
    pub const ALL: [ContentType; 7] = [
        ContentType::Text,
        ContentType::Media,
        ContentType::Photo,
        ContentType::Video,
        ContentType::Audio,
        ContentType::Document,
        ContentType::Group,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ContentType::Text => "text",
            ContentType::Media => "media",
            ContentType::Photo => "photo",
            ContentType::Video => "video",
            ContentType::Audio => "audio",
            ContentType::Document => "document",
            ContentType::Group => "group",
        }
    }

    /// Media kind for the single-item variants.
    pub fn media_kind(self) -> Option<MediaKind> {
        match self {
            ContentType::Photo => Some(MediaKind::Photo),
            ContentType::Video => Some(MediaKind::Video),
            ContentType::Audio => Some(MediaKind::Audio),
            ContentType::Document => Some(MediaKind::Document),
            ContentType::Text | ContentType::Media | ContentType::Group => None,
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A content type hint that names no known variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown content type: {0:?}")]
pub struct UnknownContentType(pub String);

impl FromStr for ContentType {
    type Err = UnknownContentType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ContentType::ALL
            .into_iter()
            .find(|ct| ct.as_str() == s)
            .ok_or_else(|| UnknownContentType(s.to_string()))
    }
}

impl From<MediaKind> for ContentType {
    fn from(kind: MediaKind) -> Self {
        match kind {
            MediaKind::Photo => ContentType::Photo,
            MediaKind::Video => ContentType::Video,
            MediaKind::Audio => ContentType::Audio,
            MediaKind::Document => ContentType::Document,
        }
    }
}

// ── Media ───────────────────────────────────────────────────────────

/// Kind of an attached file, derived from its MIME category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Photo,
    Video,
    Audio,
    Document,
}

impl MediaKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MediaKind::Photo => "photo",
            MediaKind::Video => "video",
            MediaKind::Audio => "audio",
            MediaKind::Document => "document",
        }
    }

    /// Map a MIME type to a media kind. Only image, video and audio are
    /// recognized; everything else yields `None`.
    pub fn from_mime(mime: &str) -> Option<Self> {
        let (top, _) = mime.split_once('/')?;
        match top {
            "image" => Some(MediaKind::Photo),
            "video" => Some(MediaKind::Video),
            "audio" => Some(MediaKind::Audio),
            _ => None,
        }
    }
}

/// Raw file payload of a media item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputFile {
    pub bytes: Vec<u8>,
    pub file_name: Option<String>,
}

impl InputFile {
    pub fn new(bytes: Vec<u8>, file_name: impl Into<String>) -> Self {
        Self {
            bytes,
            file_name: Some(file_name.into()),
        }
    }
}

/// A single attached file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaItem {
    pub kind: MediaKind,
    pub file: InputFile,
    /// Set by the dispatcher on the lead item of a group.
    pub caption: Option<String>,
}

impl MediaItem {
    pub fn new(kind: MediaKind, file: InputFile) -> Self {
        Self {
            kind,
            file,
            caption: None,
        }
    }
}

// ── Outgoing message ────────────────────────────────────────────────

/// Unit of work passed from request handling to dispatch.
#[derive(Debug, Clone)]
pub struct OutgoingMessage {
    /// Destination chat (numeric id or `@username`).
    pub channel: String,
    /// Existing message to edit instead of sending a new one.
    pub message: Option<i64>,
    /// Source text in the note markup dialect.
    pub content: Option<String>,
    pub content_type: ContentType,
    pub media: Vec<MediaItem>,
}

impl OutgoingMessage {
    /// Build a message, classifying its content from the hint and media.
    pub fn new(
        channel: impl Into<String>,
        content: Option<String>,
        hint: Option<ContentType>,
        media: Vec<MediaItem>,
    ) -> Self {
        Self {
            channel: channel.into(),
            message: None,
            content,
            content_type: classify(hint, &media),
            media,
        }
    }

    /// Switch the message into edit mode for an existing message.
    pub fn editing(mut self, message_id: i64) -> Self {
        self.message = Some(message_id);
        self
    }

    pub fn is_edit(&self) -> bool {
        self.message.is_some()
    }
}

/// Decide the content type for an outgoing message.
///
/// An explicit hint is trusted even if it disagrees with the media present.
pub fn classify(hint: Option<ContentType>, media: &[MediaItem]) -> ContentType {
    if let Some(hint) = hint {
        return hint;
    }
    match media {
        [] => ContentType::Text,
        [single] => single.kind.into(),
        _ => ContentType::Group,
    }
}

/// Parse an optional client hint. Empty or whitespace-only hints count as absent.
pub fn parse_hint(raw: Option<&str>) -> Result<Option<ContentType>, UnknownContentType> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => s.parse().map(Some),
    }
}
