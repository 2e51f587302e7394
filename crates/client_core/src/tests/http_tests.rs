use std::{collections::HashMap, sync::Arc};

use anyhow::Result;
use axum::{
    extract::{Form, Multipart, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use shared::protocol::{ChatMessage, ChatState};
use tokio::{net::TcpListener, sync::Mutex};

use super::*;

const SESSION_COOKIE: &str = "chat_session";

#[derive(Debug, Clone, PartialEq, Eq)]
struct ReceivedUpload {
    file_name: String,
    content_type: Option<String>,
    len: usize,
}

#[derive(Clone, Default)]
struct ServerState {
    chat: Arc<Mutex<ChatState>>,
    uploads: Arc<Mutex<Vec<ReceivedUpload>>>,
}

fn session_user(headers: &HeaderMap) -> Option<String> {
    let cookies = headers.get(header::COOKIE)?.to_str().ok()?;
    cookies.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == SESSION_COOKIE).then(|| value.to_string())
    })
}

fn error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

async fn login(
    State(state): State<ServerState>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    let username = form.get("username").map(|name| name.trim()).unwrap_or_default();
    if username.is_empty() {
        return error(StatusCode::BAD_REQUEST, "Username is required");
    }
    state.chat.lock().await.users.push(username.to_string());
    (
        [(header::SET_COOKIE, format!("{SESSION_COOKIE}={username}; Path=/"))],
        Json(json!({ "success": true })),
    )
        .into_response()
}

async fn messages(State(state): State<ServerState>, headers: HeaderMap) -> Response {
    if session_user(&headers).is_none() {
        return error(StatusCode::UNAUTHORIZED, "Not logged in");
    }
    Json(state.chat.lock().await.clone()).into_response()
}

async fn send(
    State(state): State<ServerState>,
    headers: HeaderMap,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    let Some(username) = session_user(&headers) else {
        return error(StatusCode::UNAUTHORIZED, "Not logged in");
    };
    let text = form.get("message").cloned().unwrap_or_default();
    state
        .chat
        .lock()
        .await
        .messages
        .push(ChatMessage::new(username, text, "12:00:00"));
    Json(json!({ "success": true })).into_response()
}

async fn upload(State(state): State<ServerState>, mut multipart: Multipart) -> Response {
    while let Ok(Some(field)) = multipart.next_field().await {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().map(str::to_string);
        if file_name.ends_with(".exe") {
            return error(StatusCode::BAD_REQUEST, "File type not allowed");
        }
        let Ok(bytes) = field.bytes().await else {
            return error(StatusCode::BAD_REQUEST, "Upload interrupted");
        };
        state.uploads.lock().await.push(ReceivedUpload {
            file_name,
            content_type,
            len: bytes.len(),
        });
        return Json(json!({ "success": true })).into_response();
    }
    error(StatusCode::BAD_REQUEST, "No file part")
}

async fn spawn_chat_server() -> Result<(String, ServerState)> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let state = ServerState::default();
    let app = Router::new()
        .route("/login", post(login))
        .route("/logout", post(|| async { Json(json!({ "success": true })) }))
        .route("/messages", get(messages))
        .route("/send", post(send))
        .route("/upload", post(upload))
        .with_state(state.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok((format!("http://{addr}"), state))
}

#[tokio::test]
async fn session_cookie_from_login_authorizes_polling() {
    let (server_url, _state) = spawn_chat_server().await.expect("spawn server");
    let backend = HttpChatBackend::new(server_url).expect("backend");

    let err = backend.fetch_state().await.expect_err("not logged in yet");
    assert!(err.is_session_expired());
    assert_eq!(err.server_message(), Some("Not logged in"));

    backend.login("alice").await.expect("login");
    backend.send("hello <b>world</b>").await.expect("send");
    let state = backend.fetch_state().await.expect("fetch");

    assert_eq!(state.users, vec!["alice"]);
    assert_eq!(
        state.messages,
        vec![ChatMessage::new("alice", "hello <b>world</b>", "12:00:00")]
    );
    backend.logout().await.expect("logout");
}

#[tokio::test]
async fn rejected_login_carries_server_error_text() {
    let (server_url, _state) = spawn_chat_server().await.expect("spawn server");
    let backend = HttpChatBackend::new(server_url).expect("backend");

    let err = backend.login("   ").await.expect_err("blank username");
    assert!(matches!(err, ChatError::Api { status: 400, .. }));
    assert_eq!(err.user_message("Login failed"), "Username is required");
}

#[tokio::test]
async fn upload_sends_multipart_file_and_reports_completion() {
    let (server_url, state) = spawn_chat_server().await.expect("spawn server");
    let backend = HttpChatBackend::new(server_url).expect("backend");
    let file = UploadFile::new("cat.png", vec![42_u8; 200_000]);
    let (progress_tx, progress_rx) = watch::channel(UploadProgress::default());

    backend.upload(file, progress_tx).await.expect("upload");

    let last = *progress_rx.borrow();
    assert_eq!(last.bytes_sent, 200_000);
    assert_eq!(last.percent(), Some(100.0));
    assert_eq!(
        *state.uploads.lock().await,
        vec![ReceivedUpload {
            file_name: "cat.png".to_string(),
            content_type: Some("image/png".to_string()),
            len: 200_000,
        }]
    );
}

#[tokio::test]
async fn rejected_upload_surfaces_server_reason() {
    let (server_url, state) = spawn_chat_server().await.expect("spawn server");
    let backend = HttpChatBackend::new(server_url).expect("backend");
    let (progress_tx, _progress_rx) = watch::channel(UploadProgress::default());

    let err = backend
        .upload(UploadFile::new("virus.exe", vec![0; 16]), progress_tx)
        .await
        .expect_err("disallowed type");
    assert_eq!(err.server_message(), Some("File type not allowed"));
    assert!(!err.is_transport());
    assert!(state.uploads.lock().await.is_empty());
}

#[tokio::test]
async fn unreachable_server_is_a_transport_error() {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let backend = HttpChatBackend::new(format!("http://{addr}")).expect("backend");
    let err = backend.login("alice").await.expect_err("nothing listening");
    assert!(err.is_transport());
}

#[test]
fn media_links_resolve_against_server_root() {
    let backend = HttpChatBackend::new("http://127.0.0.1:5000/").expect("backend");
    assert_eq!(backend.server_url(), "http://127.0.0.1:5000");
    assert_eq!(
        backend
            .resolve_url("/uploads/cat.png")
            .expect("resolve")
            .as_str(),
        "http://127.0.0.1:5000/uploads/cat.png"
    );
    assert!(HttpChatBackend::new("not a url").is_err());
}
