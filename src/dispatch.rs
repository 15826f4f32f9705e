//! Message dispatch.
//!
//! Turns an [`OutgoingMessage`] into messaging client calls. The content
//! type picks one operation; the byte length of the translated text decides
//! whether it rides along as a caption or follows as a silent threaded reply.

use std::sync::Arc;

use tracing::{debug, info};

use crate::channels::{MessageRef, MessagingClient, SendOptions};
use crate::config::FormattingConfig;
use crate::content::{ContentType, MediaKind, OutgoingMessage};
use crate::error::DispatchError;
use crate::markup;

/// Captions must stay strictly below this many bytes.
pub const CAPTION_BYTE_LIMIT: usize = 1024;

/// Whether translated text can be attached to media as a caption.
pub fn fits_caption(text: &str) -> bool {
    text.len() < CAPTION_BYTE_LIMIT
}

/// The client call an outgoing message maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    SendText,
    SendMedia(MediaKind),
    SendGroup,
    EditText(i64),
    EditCaption(i64),
}

/// Pick the operation for `message`.
///
/// Edits never look at media. A text message ignores any media it carries;
/// single-media types need exactly one item and groups at least two.
pub fn operation(message: &OutgoingMessage) -> Result<Operation, DispatchError> {
    if let Some(id) = message.message {
        return Ok(match message.content_type {
            ContentType::Text => Operation::EditText(id),
            _ => Operation::EditCaption(id),
        });
    }

    let count = message.media.len();
    let mismatch = || DispatchError::MediaMismatch {
        content_type: message.content_type,
        count,
    };

    match message.content_type {
        ContentType::Text => Ok(Operation::SendText),
        ContentType::Media => match message.media.as_slice() {
            [item] => Ok(Operation::SendMedia(item.kind)),
            _ => Err(mismatch()),
        },
        ContentType::Photo | ContentType::Video | ContentType::Audio | ContentType::Document => {
            match (message.content_type.media_kind(), count) {
                (Some(kind), 1) => Ok(Operation::SendMedia(kind)),
                _ => Err(mismatch()),
            }
        }
        ContentType::Group if count >= 2 => Ok(Operation::SendGroup),
        ContentType::Group => Err(mismatch()),
    }
}

/// Sends outgoing messages through a messaging client.
#[derive(Clone)]
pub struct Dispatcher {
    client: Arc<dyn MessagingClient>,
    format: FormattingConfig,
}

impl Dispatcher {
    pub fn new(client: Arc<dyn MessagingClient>, format: FormattingConfig) -> Self {
        Self { client, format }
    }

    /// Deliver one message. Returns every message the platform produced,
    /// empty when there was nothing to send.
    pub async fn dispatch(
        &self,
        message: OutgoingMessage,
    ) -> Result<Vec<MessageRef>, DispatchError> {
        let op = operation(&message)?;
        let OutgoingMessage {
            channel,
            content,
            content_type,
            mut media,
            ..
        } = message;
        let chat_id = channel.as_str();
        let text = markup::translate(content.as_deref().unwrap_or_default(), &self.format);

        debug!(
            chat_id,
            content_type = %content_type,
            operation = ?op,
            text_bytes = text.len(),
            media = media.len(),
            "Dispatching message"
        );

        let sent = match op {
            Operation::EditText(_) | Operation::SendText if text.is_empty() => {
                info!(chat_id, "Empty text, nothing to send");
                Vec::new()
            }
            Operation::EditText(id) => {
                vec![self.client.edit_message_text(chat_id, id, &text).await?]
            }
            Operation::EditCaption(id) => {
                vec![self.client.edit_message_caption(chat_id, id, &text).await?]
            }
            Operation::SendText => {
                vec![
                    self.client
                        .send_message(chat_id, &text, SendOptions::default())
                        .await?,
                ]
            }
            Operation::SendMedia(kind) => {
                let file = media.swap_remove(0).file;
                let caption = (!text.is_empty() && fits_caption(&text)).then_some(text.as_str());
                let first = self
                    .client
                    .send_media(chat_id, kind, &file, caption)
                    .await?;
                let mut sent = vec![first];
                if caption.is_none() {
                    sent.extend(self.follow_up(chat_id, &text, first).await?);
                }
                sent
            }
            Operation::SendGroup => {
                let inline = !text.is_empty() && fits_caption(&text);
                if inline {
                    media[0].caption = Some(text.clone());
                }
                let mut sent = self.client.send_media_group(chat_id, &media).await?;
                if !inline {
                    if let Some(first) = sent.first().copied() {
                        sent.extend(self.follow_up(chat_id, &text, first).await?);
                    }
                }
                sent
            }
        };

        info!(chat_id, messages = sent.len(), "Message dispatched");
        Ok(sent)
    }

    /// Send text that did not fit a caption as a silent reply to `anchor`.
    async fn follow_up(
        &self,
        chat_id: &str,
        text: &str,
        anchor: MessageRef,
    ) -> Result<Option<MessageRef>, DispatchError> {
        if text.is_empty() {
            return Ok(None);
        }
        debug!(
            chat_id,
            reply_to = anchor.message_id,
            text_bytes = text.len(),
            "Caption too long, sending as reply"
        );
        let reply = self
            .client
            .send_message(chat_id, text, SendOptions::silent_reply(anchor.message_id))
            .await?;
        Ok(Some(reply))
    }
}
