//! Upload storage.
//!
//! Uploaded archives are either kept in memory or written to the upload
//! directory as `<uuid>.zip` before extraction.

use std::path::PathBuf;

use tracing::debug;
use uuid::Uuid;

use crate::error::UploadError;

/// Where uploaded archives live before they are unpacked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadStore {
    Memory,
    Disk(PathBuf),
}

impl UploadStore {
    /// Disk storage when an upload directory is configured, memory otherwise.
    pub fn from_path(path: Option<PathBuf>) -> Self {
        path.map_or(Self::Memory, Self::Disk)
    }

    /// Make sure the upload directory exists.
    pub async fn prepare(&self) -> Result<(), UploadError> {
        if let Self::Disk(dir) = self {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|source| UploadError::Persist {
                    path: dir.display().to_string(),
                    source,
                })?;
        }
        Ok(())
    }

    /// Store an upload and hand back the bytes to extract.
    pub async fn store(&self, bytes: Vec<u8>) -> Result<Vec<u8>, UploadError> {
        let Self::Disk(dir) = self else {
            return Ok(bytes);
        };

        let path = dir.join(format!("{}.zip", Uuid::new_v4()));
        let shown = path.display().to_string();

        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|source| UploadError::Persist {
                path: shown.clone(),
                source,
            })?;
        debug!(path = %shown, bytes = bytes.len(), "Upload stored");

        tokio::fs::read(&path)
            .await
            .map_err(|source| UploadError::Read {
                path: shown,
                source,
            })
    }
}
