//! HTTP surface: upload endpoint plus small info routes.

pub mod routes;
pub mod upload;

use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method, header},
    routing::get,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::channels::TelegramClient;
use crate::config::{FileConfig, RelayConfig};
use crate::dispatch::Dispatcher;
use crate::error::{ConfigError, Result};

pub use routes::ApiError;
pub use upload::UploadStore;

/// Largest upload accepted, matching the Bot API's upload cap.
pub const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub config: Arc<FileConfig>,
    pub uploads: UploadStore,
}

/// Build the router with CORS restricted to `cors_origin`.
pub fn router(
    state: AppState,
    cors_origin: &str,
) -> std::result::Result<Router, ConfigError> {
    let origin = cors_origin
        .parse::<HeaderValue>()
        .map_err(|e| ConfigError::InvalidValue {
            key: "RELAY_CORS_ORIGIN".into(),
            message: e.to_string(),
        })?;

    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    Ok(Router::new()
        .route("/", get(routes::welcome))
        .route("/health", get(routes::health))
        .route("/api", get(routes::list_channels).post(routes::publish))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .with_state(state))
}

/// Wire the relay for `config`: YAML config, Telegram client, upload store
/// and router.
pub async fn app(config: &RelayConfig) -> Result<Router> {
    let file_config = FileConfig::load(&config.config_path)?;
    tracing::info!(
        path = %config.config_path.display(),
        channels = file_config.collection.len(),
        "Config loaded"
    );

    let client = TelegramClient::with_api_url(config.bot_token.clone(), config.api_url.clone());
    match client.get_me().await {
        Ok(bot) => tracing::info!(
            bot_id = bot.id,
            username = bot.username.as_deref().unwrap_or("-"),
            "Telegram bot verified"
        ),
        Err(e) => tracing::warn!(error = %e, "Telegram getMe failed, continuing anyway"),
    }

    let uploads = UploadStore::from_path(config.upload_path.clone());
    uploads.prepare().await?;

    let state = AppState {
        dispatcher: Arc::new(Dispatcher::new(
            Arc::new(client),
            file_config.format.clone(),
        )),
        config: Arc::new(file_config),
        uploads,
    };
    Ok(router(state, &config.cors_origin)?)
}
