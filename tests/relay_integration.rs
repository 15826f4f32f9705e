//! Integration tests for the upload → Telegram relay.
//!
//! Each test spins up two Axum servers on random ports: a fake Bot API that
//! records every call, and the relay itself wired to it through a real
//! `TelegramClient`. Uploads are driven with reqwest multipart requests.

use std::io::{Cursor, Write};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{StatusCode, Uri},
    response::IntoResponse,
};
use reqwest::multipart::{Form, Part};
use secrecy::SecretString;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::time::timeout;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use ulysses_relay::channels::TelegramClient;
use ulysses_relay::config::{FileConfig, FormattingConfig, MarkerPair, RelayConfig};
use ulysses_relay::dispatch::Dispatcher;
use ulysses_relay::server::{self, AppState, UploadStore};

/// Maximum time any test is allowed to run before we consider it hung.
const TEST_TIMEOUT: Duration = Duration::from_secs(5);

const TOKEN: &str = "test-token";

// ── Fake Bot API ────────────────────────────────────────────────────

/// A recorded Bot API call: method name and lossy body text.
#[derive(Debug, Clone)]
struct ApiCall {
    method: String,
    body: String,
}

#[derive(Clone, Default)]
struct FakeBotApi {
    calls: Arc<Mutex<Vec<ApiCall>>>,
    fail: bool,
}

impl FakeBotApi {
    fn calls(&self) -> Vec<ApiCall> {
        self.calls.lock().unwrap().clone()
    }

    fn methods(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.method).collect()
    }
}

async fn fake_bot_api(State(api): State<FakeBotApi>, uri: Uri, body: Bytes) -> impl IntoResponse {
    let path = uri.path();
    let method = path
        .strip_prefix(&format!("/bot{TOKEN}/"))
        .unwrap_or("<bad token>")
        .to_string();

    let message_id = {
        let mut calls = api.calls.lock().unwrap();
        calls.push(ApiCall {
            method: method.clone(),
            body: String::from_utf8_lossy(&body).into_owned(),
        });
        calls.len() as i64
    };

    if api.fail {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "ok": false,
                "error_code": 400,
                "description": "Bad Request: chat not found",
            })),
        );
    }

    let message = |id: i64| json!({ "message_id": id, "chat": { "id": -1001 } });
    let result = match method.as_str() {
        "getMe" => json!({ "id": 1, "is_bot": true, "username": "relay_bot" }),
        "sendMediaGroup" => json!([message(message_id * 10), message(message_id * 10 + 1)]),
        _ => message(message_id),
    };
    (StatusCode::OK, Json(json!({ "ok": true, "result": result })))
}

async fn spawn(app: Router, listener: TcpListener) {
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
}

/// Start the fake Bot API and the relay in front of it. Returns the relay
/// base URL and the fake API handle.
async fn start_relay(fail: bool, file_config: FileConfig) -> (String, FakeBotApi) {
    let api = FakeBotApi {
        fail,
        ..Default::default()
    };
    let api_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let api_url = format!("http://{}", api_listener.local_addr().unwrap());
    spawn(
        Router::new().fallback(fake_bot_api).with_state(api.clone()),
        api_listener,
    )
    .await;

    let client = TelegramClient::with_api_url(SecretString::from(TOKEN.to_string()), api_url);
    let state = AppState {
        dispatcher: Arc::new(Dispatcher::new(
            Arc::new(client),
            file_config.format.clone(),
        )),
        config: Arc::new(file_config),
        uploads: UploadStore::Memory,
    };
    let app = server::router(state, "http://0.0.0.0:8081").unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    spawn(app, listener).await;

    // Give the servers a moment to start accepting connections.
    tokio::time::sleep(Duration::from_millis(50)).await;

    (base, api)
}

// ── Helpers ─────────────────────────────────────────────────────────

fn build_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    for (name, contents) in entries {
        writer.start_file(*name, options).unwrap();
        writer.write_all(contents).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

fn upload_form(zip: Vec<u8>, fields: &[(&'static str, &str)]) -> Form {
    let mut form = Form::new().part("data", Part::bytes(zip).file_name("export.zip"));
    for (name, value) in fields {
        form = form.text(*name, value.to_string());
    }
    form
}

async fn post(base: &str, form: Form) -> (StatusCode, Value) {
    let resp = reqwest::Client::new()
        .post(format!("{base}/api"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    let status = StatusCode::from_u16(resp.status().as_u16()).unwrap();
    (status, resp.json().await.unwrap())
}

// ── Info routes ─────────────────────────────────────────────────────

#[tokio::test]
async fn health_and_channel_listing() {
    timeout(TEST_TIMEOUT, async {
        let file_config = FileConfig::parse("collection:\n  notes: -1001\n  blog: \"@blog\"\n", "test")
            .unwrap();
        let (base, _api) = start_relay(false, file_config).await;

        let health: Value = reqwest::get(format!("{base}/health"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(health["status"], "ok");

        let welcome = reqwest::get(format!("{base}/")).await.unwrap();
        assert_eq!(welcome.status().as_u16(), 200);

        let channels: Value = reqwest::get(format!("{base}/api"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(channels, json!(["blog", "notes"]));
    })
    .await
    .expect("test timed out");
}

// ── Publishing ──────────────────────────────────────────────────────

#[tokio::test]
async fn text_upload_is_translated_and_sent() {
    timeout(TEST_TIMEOUT, async {
        let file_config = FileConfig {
            format: FormattingConfig {
                header: MarkerPair {
                    first: Some("§".into()),
                    second: None,
                },
                ..Default::default()
            },
            ..Default::default()
        };
        let (base, api) = start_relay(false, file_config).await;

        let zip = build_zip(&[("Content.ulysses/text.md", b"# Title\n**bold** move")]);
        let (status, body) = post(&base, upload_form(zip, &[("channel", "-1001")])).await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
        assert_eq!(body["messages"][0]["chat_id"], -1001);

        let calls = api.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].method, "sendMessage");
        let sent: Value = serde_json::from_str(&calls[0].body).unwrap();
        assert_eq!(sent["chat_id"], "-1001");
        assert_eq!(sent["parse_mode"], "HTML");
        assert_eq!(sent["text"], "<strong>§ Title</strong>\n<b>bold</b> move");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn channel_alias_resolves_to_chat_id() {
    timeout(TEST_TIMEOUT, async {
        let file_config = FileConfig::parse("collection:\n  notes: -1001\n", "test").unwrap();
        let (base, api) = start_relay(false, file_config).await;

        let zip = build_zip(&[("note.md", b"hello")]);
        let (status, body) = post(&base, upload_form(zip, &[("channel", "notes")])).await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["chat_id"], "-1001");
        let sent: Value = serde_json::from_str(&api.calls()[0].body).unwrap();
        assert_eq!(sent["chat_id"], "-1001");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn photo_with_short_text_gets_caption() {
    timeout(TEST_TIMEOUT, async {
        let (base, api) = start_relay(false, FileConfig::default()).await;

        let zip = build_zip(&[
            ("text.md", b"_look_"),
            ("media/pic.png", &[0x89, 0x50, 0x4E, 0x47]),
        ]);
        let (status, body) = post(&base, upload_form(zip, &[("channel", "@blog")])).await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
        assert_eq!(api.methods(), vec!["sendPhoto"]);

        let form = &api.calls()[0].body;
        assert!(form.contains("name=\"photo\"; filename=\"pic.png\""));
        assert!(form.contains("<i>look</i>"));
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn photo_with_long_text_gets_silent_reply() {
    timeout(TEST_TIMEOUT, async {
        let (base, api) = start_relay(false, FileConfig::default()).await;

        let text = "a".repeat(1024);
        let zip = build_zip(&[("text.md", text.as_bytes()), ("pic.jpg", b"jpg")]);
        let (status, body) = post(&base, upload_form(zip, &[("channel", "@blog")])).await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["messages"].as_array().unwrap().len(), 2);
        assert_eq!(api.methods(), vec!["sendPhoto", "sendMessage"]);

        let calls = api.calls();
        assert!(!calls[0].body.contains("name=\"caption\""));
        let reply: Value = serde_json::from_str(&calls[1].body).unwrap();
        assert_eq!(reply["text"], text);
        assert_eq!(reply["disable_notification"], true);
        assert_eq!(reply["reply_parameters"]["message_id"], 1);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn several_media_become_a_group() {
    timeout(TEST_TIMEOUT, async {
        let (base, api) = start_relay(false, FileConfig::default()).await;

        let zip = build_zip(&[
            ("text.md", b"album"),
            ("a.png", b"png"),
            ("b.mp4", b"mp4"),
        ]);
        let (status, body) = post(&base, upload_form(zip, &[("channel", "@blog")])).await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["messages"].as_array().unwrap().len(), 2);
        assert_eq!(api.methods(), vec!["sendMediaGroup"]);

        let form = &api.calls()[0].body;
        assert!(form.contains("attach://file0"));
        assert!(form.contains("attach://file1"));
        assert!(form.contains("\"caption\":\"album\""));
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn edit_request_edits_text() {
    timeout(TEST_TIMEOUT, async {
        let (base, api) = start_relay(false, FileConfig::default()).await;

        let zip = build_zip(&[("text.md", b"fixed")]);
        let (status, _) = post(
            &base,
            upload_form(zip, &[("channel", "@blog"), ("message", "77")]),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(api.methods(), vec!["editMessageText"]);
        let sent: Value = serde_json::from_str(&api.calls()[0].body).unwrap();
        assert_eq!(sent["message_id"], 77);
        assert_eq!(sent["text"], "fixed");
    })
    .await
    .expect("test timed out");
}

// ── Errors ──────────────────────────────────────────────────────────

#[tokio::test]
async fn validation_errors_are_bad_requests() {
    timeout(TEST_TIMEOUT, async {
        let (base, api) = start_relay(false, FileConfig::default()).await;
        let zip = build_zip(&[("text.md", b"hi")]);

        // missing channel
        let (status, body) = post(&base, upload_form(zip.clone(), &[])).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], 400);
        assert_eq!(body["name"], "Bad Request");

        // missing upload
        let form = Form::new().text("channel", "@blog");
        let (status, _) = post(&base, form).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        // unknown content type hint
        let (status, body) = post(
            &base,
            upload_form(zip.clone(), &[("channel", "@blog"), ("media", "sticker")]),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["description"].as_str().unwrap().contains("sticker"));

        // malformed message id
        let (status, _) = post(
            &base,
            upload_form(zip.clone(), &[("channel", "@blog"), ("message", "abc")]),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        // corrupt archive
        let (status, _) = post(
            &base,
            upload_form(b"not a zip".to_vec(), &[("channel", "@blog")]),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        // hint that contradicts the media present
        let (status, _) = post(
            &base,
            upload_form(zip, &[("channel", "@blog"), ("media", "photo")]),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        assert!(api.calls().is_empty());
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn telegram_errors_are_passed_through() {
    timeout(TEST_TIMEOUT, async {
        let (base, _api) = start_relay(true, FileConfig::default()).await;

        let zip = build_zip(&[("text.md", b"hi")]);
        let (status, body) = post(&base, upload_form(zip, &[("channel", "@nowhere")])).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], 400);
        assert_eq!(body["name"], "Bad Request");
        assert_eq!(body["description"], "Bad Request: chat not found");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn get_me_reports_bot_identity() {
    timeout(TEST_TIMEOUT, async {
        let api = FakeBotApi::default();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let api_url = format!("http://{}", listener.local_addr().unwrap());
        spawn(
            Router::new().fallback(fake_bot_api).with_state(api.clone()),
            listener,
        )
        .await;

        let client = TelegramClient::with_api_url(SecretString::from(TOKEN.to_string()), api_url);
        let bot = client.get_me().await.unwrap();
        assert_eq!(bot.id, 1);
        assert_eq!(bot.username.as_deref(), Some("relay_bot"));
        assert_eq!(api.methods(), vec!["getMe"]);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn app_from_env_style_config_stores_uploads_on_disk() {
    timeout(TEST_TIMEOUT, async {
        let api = FakeBotApi::default();
        let api_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let api_url = format!("http://{}", api_listener.local_addr().unwrap());
        spawn(
            Router::new().fallback(fake_bot_api).with_state(api.clone()),
            api_listener,
        )
        .await;

        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.yml");
        std::fs::write(&config_path, "collection:\n  notes: -1001\n").unwrap();
        let uploads = dir.path().join("uploads");

        let vars = [
            ("BOT_TOKEN", TOKEN.to_string()),
            ("TELEGRAM_API_URL", api_url),
            ("RELAY_CONFIG", config_path.display().to_string()),
            ("BOT_UPLOAD_PATH", uploads.display().to_string()),
        ];
        let config = RelayConfig::from_vars(|key| {
            vars.iter()
                .find(|(name, _)| *name == key)
                .map(|(_, value)| value.clone())
        })
        .unwrap();

        let app = server::app(&config).await.unwrap();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        spawn(app, listener).await;
        tokio::time::sleep(Duration::from_millis(50)).await;

        let zip = build_zip(&[("text.md", b"from disk")]);
        let (status, body) = post(&base, upload_form(zip, &[("channel", "notes")])).await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["chat_id"], "-1001");
        assert_eq!(api.methods(), vec!["getMe", "sendMessage"]);
        assert_eq!(std::fs::read_dir(&uploads).unwrap().count(), 1);
    })
    .await
    .expect("test timed out");
}
