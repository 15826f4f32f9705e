//! Messaging client abstraction used by the dispatcher.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::content::{InputFile, MediaItem, MediaKind};
use crate::error::TelegramError;

/// Identifies a message the platform accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRef {
    pub chat_id: i64,
    pub message_id: i64,
}

/// Delivery options for plain text messages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SendOptions {
    /// Deliver without a notification sound.
    pub disable_notification: bool,
    /// Thread the message as a reply to this message id.
    pub reply_to: Option<i64>,
}

impl SendOptions {
    /// A silent reply to `message_id`.
    pub fn silent_reply(message_id: i64) -> Self {
        Self {
            disable_notification: true,
            reply_to: Some(message_id),
        }
    }
}

/// Operations the relay needs from the messaging platform.
///
/// All text and captions are pre-rendered HTML; implementations send them in
/// HTML parse mode and must not escape them again.
#[async_trait]
pub trait MessagingClient: Send + Sync {
    async fn send_message(
        &self,
        chat_id: &str,
        text: &str,
        options: SendOptions,
    ) -> Result<MessageRef, TelegramError>;

    /// Send one file as `kind` (sendPhoto, sendVideo, sendAudio, sendDocument).
    async fn send_media(
        &self,
        chat_id: &str,
        kind: MediaKind,
        file: &InputFile,
        caption: Option<&str>,
    ) -> Result<MessageRef, TelegramError>;

    /// Send an album. Captions are taken from the items themselves.
    async fn send_media_group(
        &self,
        chat_id: &str,
        media: &[MediaItem],
    ) -> Result<Vec<MessageRef>, TelegramError>;

    async fn edit_message_text(
        &self,
        chat_id: &str,
        message_id: i64,
        text: &str,
    ) -> Result<MessageRef, TelegramError>;

    async fn edit_message_caption(
        &self,
        chat_id: &str,
        message_id: i64,
        caption: &str,
    ) -> Result<MessageRef, TelegramError>;
}
