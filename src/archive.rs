//! Export archive extraction.
//!
//! A note export is a zip holding one text file plus optional media. Text
//! entries are concatenated; image, video and audio entries become media
//! items. Entries of any other MIME category are skipped.

use std::io::{Cursor, Read};
use std::path::Path;

use tracing::debug;
use zip::ZipArchive;

use crate::content::{InputFile, MediaItem, MediaKind};
use crate::error::ArchiveError;

/// Separator placed between the contents of multiple text entries.
pub const TEXT_SEPARATOR: &str = "\n----";

/// Text and media pulled out of an export archive.
#[derive(Debug, Clone, Default)]
pub struct ExtractedArchive {
    /// Concatenated text entries; empty when the archive holds none.
    pub text: String,
    /// Media entries in archive order.
    pub media: Vec<MediaItem>,
}

impl ExtractedArchive {
    /// Text payload, `None` when the archive held no text at all.
    pub fn content(&self) -> Option<String> {
        (!self.text.is_empty()).then(|| self.text.clone())
    }
}

/// Unpack an export archive held in memory.
pub fn extract(bytes: &[u8]) -> Result<ExtractedArchive, ArchiveError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    debug!(entries = archive.len(), "Opened export archive");

    let mut extracted = ExtractedArchive::default();

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        let entry_name = entry.name().to_string();
        if entry.is_dir() {
            continue;
        }

        let file_name = Path::new(&entry_name)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(&entry_name)
            .to_string();

        let Some(mime) = mime_guess::from_path(&file_name).first() else {
            debug!(entry = %entry_name, "Skipping entry with unknown MIME type");
            continue;
        };

        let mut data = Vec::new();
        entry
            .read_to_end(&mut data)
            .map_err(|source| ArchiveError::Entry {
                name: entry_name.clone(),
                source,
            })?;

        if mime.type_() == mime_guess::mime::TEXT {
            if !extracted.text.is_empty() {
                extracted.text.push_str(TEXT_SEPARATOR);
            }
            extracted.text.push_str(&String::from_utf8_lossy(&data));
            debug!(entry = %entry_name, bytes = data.len(), "Extracted text entry");
        } else if let Some(kind) = MediaKind::from_mime(mime.essence_str()) {
            debug!(entry = %entry_name, kind = kind.as_str(), "Extracted media entry");
            extracted
                .media
                .push(MediaItem::new(kind, InputFile::new(data, file_name)));
        } else {
            debug!(entry = %entry_name, mime = %mime, "Skipping unsupported media type");
        }
    }

    Ok(extracted)
}
