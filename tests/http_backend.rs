use axum::{
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, put},
    Json, Router,
};
use serde_json::json;
use std::time::Duration;

use marketplace_admin::confirm::Confirmation;
use marketplace_admin::manage_accounts::AccountDirectory;
use marketplace_admin::services::{http::HttpBackend, AdminError, BackendService, Method, ViewContext};
use marketplace_admin::session::MemorySession;

fn authorized(headers: &HeaderMap) -> bool {
    headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()) == Some("Bearer jwt")
}

async fn all_users(headers: HeaderMap) -> impl IntoResponse {
    if !authorized(&headers) {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "message": "jwt expired" })));
    }
    (
        StatusCode::OK,
        Json(json!({ "data": [
            { "_id": "u-1", "name": "Lan", "isBlocked": false },
            { "_id": "u-2", "name": "Khoa", "isBlocked": false }
        ] })),
    )
}

async fn block_user(headers: HeaderMap) -> impl IntoResponse {
    if !authorized(&headers) {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "message": "jwt expired" })));
    }
    (StatusCode::OK, Json(json!({ "message": "blocked" })))
}

async fn spawn_fake_backend() -> String {
    let app = Router::new()
        .route("/user/all", get(all_users))
        .route("/admin/users/:id/block", put(block_user))
        .route("/broken", get(|| async { "<html>oops</html>" }))
        .route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(2)).await;
                Json(json!({ "data": [] }))
            }),
        );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}/")
}

#[tokio::test]
async fn sends_bearer_token_and_parses_json() {
    let backend = HttpBackend::new(&spawn_fake_backend().await, Duration::from_secs(5)).unwrap();

    let response = backend.get("/user/all", "jwt").await.unwrap();
    assert!(response.is_success());
    assert_eq!(response.body["data"].as_array().unwrap().len(), 2);

    let response = backend.get("/user/all", "stale").await.unwrap();
    assert!(response.is_unauthorized());
    assert_eq!(response.body["message"], "jwt expired");
}

#[tokio::test]
async fn non_json_success_body_is_a_transport_error() {
    let backend = HttpBackend::new(&spawn_fake_backend().await, Duration::from_secs(5)).unwrap();
    let err = backend.send(Method::Get, "/broken", "jwt").await.unwrap_err();
    assert!(matches!(err, AdminError::Transport(_)));
}

#[tokio::test]
async fn account_directory_runs_over_http() {
    let backend = HttpBackend::new(&spawn_fake_backend().await, Duration::from_secs(5)).unwrap();
    let session = MemorySession::with_token("jwt");
    let mut ctx = ViewContext::default();
    let mut accounts = AccountDirectory::new(backend);

    accounts.load(&mut ctx, &session).await.unwrap();
    assert_eq!(ctx.context.list("account_list").len(), 2);

    accounts
        .set_blocked(&mut ctx, &session, &Confirmation::Accepted, "u-2", true)
        .await
        .unwrap();
    assert_eq!(accounts.blocked_count(), 1);
    let list = ctx.context.list("account_list");
    assert_eq!(list[1]["isBlocked"], true);
}

#[tokio::test]
async fn configured_timeout_is_honoured() {
    let backend =
        HttpBackend::new(&spawn_fake_backend().await, Duration::from_millis(200)).unwrap();
    let err = backend.get("/slow", "jwt").await.unwrap_err();
    assert!(matches!(err, AdminError::Transport(_)));
}
