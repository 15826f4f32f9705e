//! Telegram Bot API client.
//!
//! Native Rust implementation over `reqwest`: JSON bodies for text calls,
//! multipart uploads for media. Every call uses HTML parse mode.

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::multipart::{Form, Part};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::channels::{MessageRef, MessagingClient, SendOptions};
use crate::content::{InputFile, MediaItem, MediaKind};
use crate::error::TelegramError;

/// Default Bot API endpoint.
pub const TELEGRAM_API_URL: &str = "https://api.telegram.org";

const PARSE_MODE: &str = "HTML";

/// Bot identity returned by `getMe`.
#[derive(Debug, Clone, Deserialize)]
pub struct BotInfo {
    pub id: i64,
    pub username: Option<String>,
}

/// Bot API envelope: `{"ok": bool, "result": ..., "error_code": n, "description": ".."}`.
#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error_code: Option<u16>,
    #[serde(default)]
    description: Option<String>,
}

/// Telegram client — talks to the Bot API over HTTPS.
pub struct TelegramClient {
    api_base: String,
    bot_token: SecretString,
    client: reqwest::Client,
}

impl TelegramClient {
    pub fn new(bot_token: SecretString) -> Self {
        Self::with_api_url(bot_token, TELEGRAM_API_URL)
    }

    /// Client for a non-default Bot API server (local Bot API, tests).
    pub fn with_api_url(bot_token: SecretString, api_url: impl Into<String>) -> Self {
        Self {
            api_base: api_url.into(),
            bot_token,
            client: reqwest::Client::new(),
        }
    }

    fn api_url(&self, method: &str) -> String {
        format!(
            "{}/bot{}/{method}",
            self.api_base,
            self.bot_token.expose_secret()
        )
    }

    /// Verify the token by asking who we are.
    pub async fn get_me(&self) -> Result<BotInfo, TelegramError> {
        let request = self.client.get(self.api_url("getMe"));
        let result = self.call("getMe", request).await?;
        serde_json::from_value(result).map_err(|e| TelegramError::InvalidResponse {
            method: "getMe".into(),
            reason: e.to_string(),
        })
    }

    async fn post_json(&self, method: &str, body: &Value) -> Result<Value, TelegramError> {
        let request = self.client.post(self.api_url(method)).json(body);
        self.call(method, request).await
    }

    async fn post_form(&self, method: &str, form: Form) -> Result<Value, TelegramError> {
        let request = self.client.post(self.api_url(method)).multipart(form);
        self.call(method, request).await
    }

    async fn call(
        &self,
        method: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<Value, TelegramError> {
        let resp = request.send().await.map_err(|e| TelegramError::Http {
            method: method.into(),
            reason: e.to_string(),
        })?;
        let status = resp.status();
        let body = resp.text().await.map_err(|e| TelegramError::Http {
            method: method.into(),
            reason: e.to_string(),
        })?;

        let result = parse_response(method, status, &body);
        if let Err(ref e) = result {
            tracing::warn!(method, status = %status, error = %e, "Telegram call failed");
        }
        result
    }
}

#[async_trait]
impl MessagingClient for TelegramClient {
    async fn send_message(
        &self,
        chat_id: &str,
        text: &str,
        options: SendOptions,
    ) -> Result<MessageRef, TelegramError> {
        let mut body = json!({
            "chat_id": chat_id,
            "text": text,
            "parse_mode": PARSE_MODE,
        });
        if options.disable_notification {
            body["disable_notification"] = Value::Bool(true);
        }
        if let Some(reply_to) = options.reply_to {
            body["reply_parameters"] = json!({ "message_id": reply_to });
        }

        let result = self.post_json("sendMessage", &body).await?;
        let sent = message_ref("sendMessage", &result)?;
        tracing::info!(chat_id, message_id = sent.message_id, "Telegram message sent");
        Ok(sent)
    }

    async fn send_media(
        &self,
        chat_id: &str,
        kind: MediaKind,
        file: &InputFile,
        caption: Option<&str>,
    ) -> Result<MessageRef, TelegramError> {
        let method = media_method(kind);
        let mut form = Form::new()
            .text("chat_id", chat_id.to_string())
            .text("parse_mode", PARSE_MODE)
            .part(kind.as_str(), file_part(kind, file));

        if let Some(cap) = caption {
            form = form.text("caption", cap.to_string());
        }

        let result = self.post_form(method, form).await?;
        let sent = message_ref(method, &result)?;
        tracing::info!(
            chat_id,
            message_id = sent.message_id,
            kind = kind.as_str(),
            "Telegram media sent"
        );
        Ok(sent)
    }

    async fn send_media_group(
        &self,
        chat_id: &str,
        media: &[MediaItem],
    ) -> Result<Vec<MessageRef>, TelegramError> {
        let mut form = Form::new().text("chat_id", chat_id.to_string());
        let mut entries = Vec::with_capacity(media.len());

        for (index, item) in media.iter().enumerate() {
            let attach = format!("file{index}");
            let mut entry = json!({
                "type": item.kind.as_str(),
                "media": format!("attach://{attach}"),
                "parse_mode": PARSE_MODE,
            });
            if let Some(ref caption) = item.caption {
                entry["caption"] = Value::String(caption.clone());
            }
            entries.push(entry);
            form = form.part(attach, file_part(item.kind, &item.file));
        }
        form = form.text("media", Value::Array(entries).to_string());

        let result = self.post_form("sendMediaGroup", form).await?;
        let sent = result
            .as_array()
            .ok_or_else(|| TelegramError::InvalidResponse {
                method: "sendMediaGroup".into(),
                reason: "result is not an array".into(),
            })?
            .iter()
            .map(|msg| message_ref("sendMediaGroup", msg))
            .collect::<Result<Vec<_>, _>>()?;
        tracing::info!(chat_id, items = sent.len(), "Telegram media group sent");
        Ok(sent)
    }

    async fn edit_message_text(
        &self,
        chat_id: &str,
        message_id: i64,
        text: &str,
    ) -> Result<MessageRef, TelegramError> {
        let body = json!({
            "chat_id": chat_id,
            "message_id": message_id,
            "text": text,
            "parse_mode": PARSE_MODE,
        });
        let result = self.post_json("editMessageText", &body).await?;
        tracing::info!(chat_id, message_id, "Telegram message text edited");
        message_ref("editMessageText", &result)
    }

    async fn edit_message_caption(
        &self,
        chat_id: &str,
        message_id: i64,
        caption: &str,
    ) -> Result<MessageRef, TelegramError> {
        let body = json!({
            "chat_id": chat_id,
            "message_id": message_id,
            "caption": caption,
            "parse_mode": PARSE_MODE,
        });
        let result = self.post_json("editMessageCaption", &body).await?;
        tracing::info!(chat_id, message_id, "Telegram message caption edited");
        message_ref("editMessageCaption", &result)
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

/// Bot API method that uploads a single file of `kind`.
fn media_method(kind: MediaKind) -> &'static str {
    match kind {
        MediaKind::Photo => "sendPhoto",
        MediaKind::Video => "sendVideo",
        MediaKind::Audio => "sendAudio",
        MediaKind::Document => "sendDocument",
    }
}

fn file_part(kind: MediaKind, file: &InputFile) -> Part {
    let file_name = file
        .file_name
        .clone()
        .unwrap_or_else(|| kind.as_str().to_string());
    Part::bytes(file.bytes.clone()).file_name(file_name)
}

/// Unwrap a Bot API envelope into its `result`.
fn parse_response(method: &str, status: StatusCode, body: &str) -> Result<Value, TelegramError> {
    let envelope: ApiResponse =
        serde_json::from_str(body).map_err(|e| TelegramError::InvalidResponse {
            method: method.into(),
            reason: format!("HTTP {status}: {e}"),
        })?;

    if envelope.ok {
        return envelope.result.ok_or_else(|| TelegramError::InvalidResponse {
            method: method.into(),
            reason: "missing result".into(),
        });
    }

    let description = envelope
        .description
        .unwrap_or_else(|| format!("HTTP {status}"));
    Err(TelegramError::Api {
        method: method.into(),
        code: envelope.error_code.unwrap_or(status.as_u16()),
        name: error_name(&description, status),
        description,
    })
}

/// Short name of an API error: the description's prefix ("Bad Request: ...")
/// or the HTTP reason phrase.
fn error_name(description: &str, status: StatusCode) -> String {
    description
        .split_once(':')
        .map(|(name, _)| name.trim())
        .filter(|name| !name.is_empty())
        .or_else(|| status.canonical_reason())
        .unwrap_or("Unknown Error")
        .to_string()
}

fn message_ref(method: &str, message: &Value) -> Result<MessageRef, TelegramError> {
    let message_id = message.get("message_id").and_then(Value::as_i64);
    let chat_id = message
        .get("chat")
        .and_then(|c| c.get("id"))
        .and_then(Value::as_i64);

    match (chat_id, message_id) {
        (Some(chat_id), Some(message_id)) => Ok(MessageRef {
            chat_id,
            message_id,
        }),
        _ => Err(TelegramError::InvalidResponse {
            method: method.into(),
            reason: format!("result is not a message: {message}"),
        }),
    }
}

// ── Tests ───────────────────────────────────────────────────────────
