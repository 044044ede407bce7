//! HTTP surface over [`AdminDashboard`]. The caller's bearer token becomes
//! the session for the duration of one request.

use crate::confirm::Confirmation;
use crate::dashboard::{AdminAction, AdminDashboard};
use crate::services::{AdminError, BackendService, ViewContext};
use crate::session::{logout, require_token, MemorySession};
use crate::views::ViewKind;
use axum::{
    extract::{Path, Query, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::warn;

pub struct AppState<B: BackendService + Clone> {
    dashboard: Arc<Mutex<AdminDashboard<B>>>,
}

impl<B: BackendService + Clone> Clone for AppState<B> {
    fn clone(&self) -> Self {
        Self {
            dashboard: Arc::clone(&self.dashboard),
        }
    }
}

impl<B: BackendService + Clone> AppState<B> {
    pub fn new(backend: B) -> Self {
        Self {
            dashboard: Arc::new(Mutex::new(AdminDashboard::new(backend))),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ViewParams {
    q: Option<String>,
    refresh: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ActionParams {
    confirm: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SummaryParams {
    refresh: Option<bool>,
}

pub fn router<B: BackendService + Clone + 'static>(state: AppState<B>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/dashboard", get(dashboard_summary::<B>))
        .route("/logout", post(logout_session::<B>))
        .route("/views/:view", get(show_view::<B>))
        .route("/views/:view/:id/:action", post(run_action::<B>))
        .with_state(state)
}

fn bearer_session(headers: &HeaderMap) -> MemorySession {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| MemorySession::with_token(token))
        .unwrap_or_default()
}

fn error_response(err: &AdminError, ctx: &ViewContext) -> Response {
    let (status, code) = match err {
        AdminError::MissingAuth => (StatusCode::UNAUTHORIZED, "missing_auth"),
        AdminError::Unauthorized => (StatusCode::UNAUTHORIZED, "login_required"),
        AdminError::Validation(_) => (StatusCode::BAD_REQUEST, "validation"),
        AdminError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
        AdminError::Transport(_)
        | AdminError::EmptyOrMalformedPayload(_)
        | AdminError::RequestFailed { .. }
        | AdminError::MutationRejected { .. } => (StatusCode::BAD_GATEWAY, "backend"),
    };
    (
        status,
        Json(json!({
            "status": "error",
            "code": code,
            "message": err.to_string(),
            "notifications": ctx.notifications,
        })),
    )
        .into_response()
}

async fn health() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({ "service": "ok", "timestamp": Utc::now() })),
    )
}

async fn show_view<B: BackendService + Clone + 'static>(
    State(state): State<AppState<B>>,
    Path(view): Path<String>,
    Query(params): Query<ViewParams>,
    headers: HeaderMap,
) -> Response {
    let mut ctx = ViewContext::default();
    let kind = match view.parse::<ViewKind>() {
        Ok(kind) => kind,
        Err(message) => return error_response(&AdminError::NotFound(message), &ctx),
    };
    let session = bearer_session(&headers);
    if let Err(err) = require_token(&session) {
        return error_response(&err, &ctx);
    }

    let mut dashboard = state.dashboard.lock().await;
    if params.refresh.unwrap_or(true) {
        if let Err(err) = dashboard.load_view(kind, &mut ctx, &session).await {
            return error_response(&err, &ctx);
        }
    }
    dashboard.render_view(kind, &mut ctx, params.q.as_deref().unwrap_or(""));

    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "view": kind.as_str(),
            "items": ctx.context.list(kind.list_key()),
            "notifications": ctx.notifications,
        })),
    )
        .into_response()
}

async fn run_action<B: BackendService + Clone + 'static>(
    State(state): State<AppState<B>>,
    Path((view, id, action)): Path<(String, String, String)>,
    Query(params): Query<ActionParams>,
    headers: HeaderMap,
) -> Response {
    let mut ctx = ViewContext::default();
    let kind = match view.parse::<ViewKind>() {
        Ok(kind) => kind,
        Err(message) => return error_response(&AdminError::NotFound(message), &ctx),
    };
    let action = match action.parse::<AdminAction>() {
        Ok(action) => action,
        Err(message) => return error_response(&AdminError::Validation(message), &ctx),
    };
    let session = bearer_session(&headers);
    let confirm = Confirmation::from(params.confirm.unwrap_or(false));

    let mut dashboard = state.dashboard.lock().await;
    match dashboard
        .perform(kind, action, &id, &mut ctx, &session, &confirm)
        .await
    {
        Ok(outcome) => {
            dashboard.render_view(kind, &mut ctx, "");
            (
                StatusCode::OK,
                Json(json!({
                    "status": outcome,
                    "view": kind.as_str(),
                    "id": id,
                    "items": ctx.context.list(kind.list_key()),
                    "notifications": ctx.notifications,
                    "actions": ctx.actions,
                })),
            )
                .into_response()
        }
        Err(err) => {
            warn!(view = %kind, id = %id, error = %err, "admin action failed");
            error_response(&err, &ctx)
        }
    }
}

async fn dashboard_summary<B: BackendService + Clone + 'static>(
    State(state): State<AppState<B>>,
    Query(params): Query<SummaryParams>,
    headers: HeaderMap,
) -> Response {
    let mut ctx = ViewContext::default();
    let session = bearer_session(&headers);
    if let Err(err) = require_token(&session) {
        return error_response(&err, &ctx);
    }
    let mut dashboard = state.dashboard.lock().await;
    if params.refresh.unwrap_or(true) {
        match dashboard.refresh_all(&mut ctx, &session).await {
            Ok(failures) => {
                for (kind, err) in failures {
                    warn!(view = %kind, error = %err, "view left stale");
                }
            }
            Err(err) => return error_response(&err, &ctx),
        }
    }
    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "summary": dashboard.summary(),
            "notifications": ctx.notifications,
        })),
    )
        .into_response()
}

async fn logout_session<B: BackendService + Clone + 'static>(
    State(state): State<AppState<B>>,
    headers: HeaderMap,
) -> Response {
    let ctx = ViewContext::default();
    let session = bearer_session(&headers);
    let dashboard = state.dashboard.lock().await;
    match logout(dashboard.backend(), &session).await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "status": "ok", "login_required": true })),
        )
            .into_response(),
        Err(err) => error_response(&err, &ctx),
    }
}
