//! `ApiClient` against an in-process backend.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tempfile::TempDir;

use vidsync_core::api::{ApiClient, ApiError, ApiErrorKind, AuthApi};
use vidsync_core::auth::{AuthStatus, FileTokenStore, SessionManager, TokenStore};
use vidsync_core::models::Credentials;

const GOOD_TOKEN: &str = "jwt-good";

#[derive(Clone, Default)]
struct Backend {
    me_calls: Arc<AtomicUsize>,
    limited_calls: Arc<AtomicUsize>,
}

async fn signin(Json(body): Json<Value>) -> impl IntoResponse {
    if body["email"] == "a@b.com" && body["password"] == "secret123" {
        (StatusCode::CREATED, Json(json!({ "access_token": GOOD_TOKEN })))
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "statusCode": 401, "message": "Invalid credentials" })),
        )
    }
}

async fn signup(Json(body): Json<Value>) -> impl IntoResponse {
    let password = body["password"].as_str().unwrap_or_default();
    if password.len() < 8 {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "message": ["password must be longer than or equal to 8 characters"] })),
        );
    }
    (StatusCode::CREATED, Json(json!({ "access_token": GOOD_TOKEN })))
}

async fn me(State(backend): State<Backend>, headers: HeaderMap) -> impl IntoResponse {
    backend.me_calls.fetch_add(1, Ordering::SeqCst);
    let expected = format!("Bearer {}", GOOD_TOKEN);
    match headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok()) {
        Some(value) if value == expected => (
            StatusCode::OK,
            Json(json!({
                "id": 42,
                "email": "a@b.com",
                "nickname": "ab",
                "createdAt": "2024-05-01T10:00:00.000Z",
                "updatedAt": "2024-05-02T10:00:00.000Z"
            })),
        ),
        _ => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "statusCode": 401, "message": "Unauthorized" })),
        ),
    }
}

async fn limited(State(backend): State<Backend>) -> impl IntoResponse {
    let call = backend.limited_calls.fetch_add(1, Ordering::SeqCst);
    if call < 2 {
        (StatusCode::TOO_MANY_REQUESTS, Json(json!({ "message": "slow down" })))
    } else {
        (StatusCode::OK, Json(json!({ "ok": true })))
    }
}

async fn garbage() -> impl IntoResponse {
    (StatusCode::OK, "this is not json")
}

async fn spawn_backend() -> (SocketAddr, Backend) {
    let backend = Backend::default();
    let app = Router::new()
        .route("/auth/signin", post(signin))
        .route("/auth/signup", post(signup))
        .route("/users/me", get(me))
        .route("/limited", get(limited))
        .route("/garbage", get(garbage))
        .with_state(backend.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, backend)
}

fn client_for(addr: SocketAddr) -> ApiClient {
    ApiClient::new(format!("http://{}", addr))
        .unwrap()
        .with_initial_backoff(Duration::from_millis(1))
}

fn api_error(err: &anyhow::Error) -> &ApiError {
    err.downcast_ref::<ApiError>().expect("expected an ApiError")
}

#[tokio::test]
async fn test_sign_in_returns_token() {
    let (addr, _) = spawn_backend().await;
    let client = client_for(addr);

    let token = client
        .sign_in(&Credentials::new("a@b.com", "secret123"))
        .await
        .unwrap();
    assert_eq!(token.as_str(), GOOD_TOKEN);
}

#[tokio::test]
async fn test_sign_in_rejected_maps_server_message() {
    let (addr, _) = spawn_backend().await;
    let client = client_for(addr);

    let err = client
        .sign_in(&Credentials::new("a@b.com", "wrong"))
        .await
        .unwrap_err();
    let api = api_error(&err);
    assert_eq!(api.status, 401);
    assert_eq!(api.message, "Invalid credentials");
    assert_eq!(api.kind(), ApiErrorKind::Unauthorized);
}

#[tokio::test]
async fn test_sign_up_validation_messages_are_joined() {
    let (addr, _) = spawn_backend().await;
    let client = client_for(addr);

    let err = client
        .sign_up(&Credentials::new("a@b.com", "short"))
        .await
        .unwrap_err();
    let api = api_error(&err);
    assert_eq!(api.status, 400);
    assert_eq!(api.message, "password must be longer than or equal to 8 characters");
    assert!(api.details.is_some());
}

#[tokio::test]
async fn test_fetch_current_user_sends_bearer_token() {
    let (addr, _) = spawn_backend().await;
    let client = client_for(addr);

    let user = client.fetch_current_user(GOOD_TOKEN).await.unwrap();
    assert_eq!(user.id, 42);
    assert_eq!(user.nickname.as_deref(), Some("ab"));
    assert!(user.created_at.is_some());

    let err = client.fetch_current_user("forged").await.unwrap_err();
    assert!(api_error(&err).is_unauthorized());
}

#[tokio::test]
async fn test_default_token_used_when_call_has_none() {
    let (addr, _) = spawn_backend().await;
    let client = client_for(addr).with_token(GOOD_TOKEN.to_string());

    let user: Value = client.get("/users/me", None).await.unwrap();
    assert_eq!(user["email"], "a@b.com");
}

#[tokio::test]
async fn test_rate_limited_get_is_retried() {
    let (addr, backend) = spawn_backend().await;
    let client = client_for(addr);

    let body: Value = client.get("/limited", None).await.unwrap();
    assert_eq!(body["ok"], true);
    assert_eq!(backend.limited_calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_malformed_body_is_not_a_transport_error() {
    let (addr, _) = spawn_backend().await;
    let client = client_for(addr);

    let err = client.get::<Value>("/garbage", None).await.unwrap_err();
    assert!(err.downcast_ref::<ApiError>().is_none());
}

#[tokio::test]
async fn test_unreachable_server_is_status_zero() {
    // Grab a free port, then close it so nothing is listening
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = client_for(addr);
    let err = client.fetch_current_user(GOOD_TOKEN).await.unwrap_err();
    let api = api_error(&err);
    assert_eq!(api.status, 0);
    assert_eq!(api.kind(), ApiErrorKind::Network);
}

#[tokio::test]
async fn test_session_survives_restart_through_file_store() {
    let (addr, backend) = spawn_backend().await;
    let dir = TempDir::new().unwrap();

    let store = Arc::new(FileTokenStore::new(dir.path()));
    store.hydrate();
    let manager = SessionManager::new(Arc::new(client_for(addr)), store.clone());
    manager.initialize().await;
    assert_eq!(manager.status(), AuthStatus::Unauthenticated);

    manager
        .login(&Credentials::new("a@b.com", "secret123"))
        .await
        .unwrap();
    assert!(manager.is_authenticated());

    // Fresh process: new store and manager over the same directory
    let store = Arc::new(FileTokenStore::new(dir.path()));
    let restored = SessionManager::new(Arc::new(client_for(addr)), store.clone());
    let handle = restored.initialize_when_ready();
    store.hydrate();
    handle.await.unwrap();

    assert!(restored.is_authenticated());
    assert_eq!(restored.token().as_deref(), Some(GOOD_TOKEN));
    assert_eq!(restored.user().unwrap().email, "a@b.com");
    assert_eq!(backend.me_calls.load(Ordering::SeqCst), 2);

    restored.logout();
    assert_eq!(store.get(), None);
    assert!(!dir.path().join(vidsync_core::auth::TOKEN_FILE).exists());
}
