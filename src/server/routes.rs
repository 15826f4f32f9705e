//! HTTP handlers.

use axum::{
    Json,
    extract::{Multipart, State, multipart::MultipartError},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use super::AppState;
use crate::archive;
use crate::content::{OutgoingMessage, parse_hint};
use crate::error::{ArchiveError, DispatchError, UploadError};

// ── Errors ──────────────────────────────────────────────────────────────

/// Error body returned to callers: `{"code", "name", "description"}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: u16,
    name: String,
    description: String,
}

impl ApiError {
    fn new(status: StatusCode, description: impl Into<String>) -> Self {
        Self {
            status,
            code: status.as_u16(),
            name: status.canonical_reason().unwrap_or("Error").to_string(),
            description: description.into(),
        }
    }

    pub fn bad_request(description: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, description)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(json!({
                "code": self.code,
                "name": self.name,
                "description": self.description,
            })),
        )
            .into_response()
    }
}

impl From<DispatchError> for ApiError {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::MediaMismatch { .. } => Self::bad_request(err.to_string()),
            DispatchError::Client(e) => Self {
                status: StatusCode::from_u16(e.code()).unwrap_or(StatusCode::BAD_GATEWAY),
                code: e.code(),
                name: e.name().to_string(),
                description: e.description(),
            },
        }
    }
}

impl From<ArchiveError> for ApiError {
    fn from(err: ArchiveError) -> Self {
        Self::bad_request(err.to_string())
    }
}

impl From<UploadError> for ApiError {
    fn from(err: UploadError) -> Self {
        warn!(error = %err, "Upload storage failed");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        Self::new(err.status(), err.body_text())
    }
}

// ── Info ────────────────────────────────────────────────────────────────

pub(super) async fn welcome() -> impl IntoResponse {
    Json(json!({
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "message": "Upload a note export to POST /api",
    }))
}

pub(super) async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// Configured channel names, as a bare JSON array.
pub(super) async fn list_channels(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.config.collection.keys().cloned().collect())
}

// ── Publish ─────────────────────────────────────────────────────────────

/// Raw multipart fields of a publish request.
#[derive(Debug, Default)]
struct PublishForm {
    data: Option<Vec<u8>>,
    channel: Option<String>,
    message: Option<String>,
    media: Option<String>,
}

impl PublishForm {
    async fn read(multipart: &mut Multipart) -> Result<Self, ApiError> {
        let mut form = Self::default();
        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "data" => form.data = Some(field.bytes().await?.to_vec()),
                "channel" => form.channel = Some(field.text().await?),
                "message" => form.message = Some(field.text().await?),
                "media" => form.media = Some(field.text().await?),
                _ => debug!(field = %name, "Ignoring unknown form field"),
            }
        }
        Ok(form)
    }
}

/// Parse the optional id of a message to edit. Blank means "send new".
fn parse_message_id(raw: Option<&str>) -> Result<Option<i64>, ApiError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => s
            .parse()
            .map(Some)
            .map_err(|_| ApiError::bad_request(format!("Invalid message id: {s:?}"))),
    }
}

pub(super) async fn publish(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let form = PublishForm::read(&mut multipart).await?;

    let data = form
        .data
        .ok_or_else(|| ApiError::bad_request("Missing upload field `data`"))?;
    let channel = form
        .channel
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .ok_or_else(|| ApiError::bad_request("Missing field `channel`"))?;
    let message_id = parse_message_id(form.message.as_deref())?;
    let hint = parse_hint(form.media.as_deref()).map_err(|e| ApiError::bad_request(e.to_string()))?;

    let bytes = state.uploads.store(data).await?;
    let extracted = tokio::task::spawn_blocking(move || archive::extract(&bytes))
        .await
        .map_err(|e| {
            warn!(error = %e, "Archive extraction task failed");
            ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })??;

    let chat_id = state.config.resolve_channel(&channel).to_string();
    let mut outgoing =
        OutgoingMessage::new(chat_id.clone(), extracted.content(), hint, extracted.media);
    if let Some(id) = message_id {
        outgoing = outgoing.editing(id);
    }

    info!(
        channel = %channel,
        chat_id = %chat_id,
        content_type = %outgoing.content_type,
        media = outgoing.media.len(),
        edit = outgoing.is_edit(),
        "Publishing upload"
    );

    let sent = state.dispatcher.dispatch(outgoing).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "status": "sent",
            "chat_id": chat_id,
            "messages": sent,
        })),
    ))
}
