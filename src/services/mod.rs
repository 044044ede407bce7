use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use thiserror::Error;

pub mod http;

pub type ServiceResult<T> = Result<T, AdminError>;

/// A primary record as delivered by the backend: a flat JSON object.
pub type Record = serde_json::Map<String, Value>;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum AdminError {
    #[error("missing auth token")]
    MissingAuth,
    #[error("unauthorized: session must be re-authenticated")]
    Unauthorized,
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("empty or malformed payload: {0}")]
    EmptyOrMalformedPayload(String),
    #[error("request failed with status {status}: {message}")]
    RequestFailed { status: u16, message: String },
    #[error("mutation rejected with status {status}: {message}")]
    MutationRejected { status: u16, message: String },
    #[error("validation error: {0}")]
    Validation(String),
    #[error("not found: {0}")]
    NotFound(String),
}

/// Rendered view state: lists and flags keyed by name.
#[derive(Clone, Debug, Default)]
pub struct DataBag(Record);

impl DataBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set<T: Serialize>(&mut self, key: &str, value: T) {
        let value = serde_json::to_value(value).unwrap_or(Value::Null);
        self.0.insert(key.to_string(), value);
    }

    pub fn bool(&self, key: &str) -> bool {
        self.0.get(key).and_then(Value::as_bool).unwrap_or(false)
    }

    pub fn string(&self, key: &str) -> Option<String> {
        self.0.get(key).and_then(Value::as_str).map(str::to_string)
    }

    pub fn list(&self, key: &str) -> Vec<Value> {
        match self.0.get(key) {
            Some(Value::Array(items)) => items.clone(),
            _ => Vec::new(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Info,
    Error,
}

/// User-visible toast.
#[derive(Clone, Debug, Serialize)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize)]
pub struct ActionLogEntry {
    pub view: String,
    pub action: String,
    pub details: Value,
    pub timestamp: DateTime<Utc>,
}

/// Per-render state handed to a view: the rendered output, the toasts it
/// raised, and the admin actions it performed.
#[derive(Clone, Debug, Default)]
pub struct ViewContext {
    pub context: DataBag,
    pub notifications: Vec<Notification>,
    pub actions: Vec<ActionLogEntry>,
}

impl ViewContext {
    pub fn notify(&mut self, level: NotificationLevel, message: impl Into<String>) {
        self.notifications.push(Notification {
            level,
            message: message.into(),
            created_at: Utc::now(),
        });
    }

    pub fn errors(&self) -> impl Iterator<Item = &Notification> {
        self.notifications
            .iter()
            .filter(|notification| notification.level == NotificationLevel::Error)
    }

    pub fn has_errors(&self) -> bool {
        self.errors().next().is_some()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Put,
    Post,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Method::Get => "GET",
            Method::Put => "PUT",
            Method::Post => "POST",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct BackendResponse {
    pub status: u16,
    pub body: Value,
}

impl BackendResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    pub fn ok(body: Value) -> Self {
        Self::new(200, body)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }
}

/// The REST backend the dashboard talks to. Non-2xx answers come back as
/// responses; only transport problems are errors.
#[async_trait]
pub trait BackendService: Send + Sync {
    async fn send(&self, method: Method, path: &str, token: &str)
        -> ServiceResult<BackendResponse>;

    async fn get(&self, path: &str, token: &str) -> ServiceResult<BackendResponse> {
        self.send(Method::Get, path, token).await
    }
}

#[derive(Clone, Debug)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub token: String,
}

#[derive(Default)]
struct InMemoryState {
    routes: HashMap<(Method, String), BackendResponse>,
    broken: Vec<(Method, String)>,
    requests: Vec<RecordedRequest>,
}

/// Scripted backend: answers from a route table and records every request.
#[derive(Clone, Default)]
pub struct InMemoryBackend {
    state: Arc<Mutex<InMemoryState>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_with_sample() -> Self {
        let backend = Self::new();
        let freelancer = json!({
            "_id": "u-100",
            "name": "Linh Tran",
            "email": "linh@example.com",
            "role": "Influencer",
            "isVerified": false,
            "isBlocked": false
        });
        let business = json!({
            "_id": "u-200",
            "name": "Acme Studio",
            "email": "hello@acme.example",
            "role": "Doanh nghiệp",
            "isVerified": false,
            "isBlocked": false
        });
        let verified = json!({
            "_id": "u-300",
            "name": "Minh Pham",
            "email": "minh@example.com",
            "role": "Influencer",
            "isVerified": true,
            "isBlocked": true
        });
        backend.respond_ok(
            Method::Get,
            "/user/unverified",
            json!({ "data": [freelancer.clone(), business.clone()] }),
        );
        backend.respond_ok(
            Method::Get,
            "/user/all",
            json!({ "data": [freelancer, business, verified] }),
        );
        backend.respond_ok(
            Method::Get,
            "/influ/all",
            json!({ "data": [
                { "_id": "p-1", "userId": "u-100", "fullName": "Linh Tran" },
                { "_id": "p-3", "userId": "u-300", "fullName": "Minh Pham" }
            ] }),
        );
        backend.respond_ok(
            Method::Get,
            "/influ/get-influ-by-userId/u-100",
            json!({ "data": { "follower": 12800, "city": "Hanoi" } }),
        );
        backend.respond_ok(
            Method::Get,
            "/influ/get-influ-by-userId/u-300",
            json!({ "data": { "follower": 930, "city": "Da Nang" } }),
        );
        backend.respond_ok(
            Method::Get,
            "/field/get-all-field-of-influ/u-100",
            json!({ "data": [{ "name": "Beauty" }, { "name": "Travel" }] }),
        );
        backend.respond_ok(
            Method::Get,
            "/field/get-all-field-of-influ/u-300",
            json!([{ "name": "Food" }]),
        );
        backend.respond_ok(
            Method::Get,
            "/business/all",
            json!([{ "_id": "b-1", "userId": "u-200", "businessName": "Acme Studio" }]),
        );
        backend.respond_ok(
            Method::Get,
            "/business/get-business-by-user-id/u-200",
            json!({ "data": { "taxCode": "0312345678", "address": "12 Le Loi, HCMC" } }),
        );
        backend.respond_ok(
            Method::Get,
            "/business/u-200/representative",
            json!({ "data": { "fullName": "Quang Vo", "position": "CEO" } }),
        );
        backend.respond_ok(
            Method::Get,
            "/transaction/all",
            json!({ "data": [
                { "_id": "t-1", "userName": "Linh Tran", "amount": 199000, "status": "PENDING" },
                { "_id": "t-2", "userName": "Acme Studio", "amount": 499000, "status": "SUCCESS" }
            ] }),
        );
        for id in ["u-100", "u-200", "u-300"] {
            for flag in ["true", "false"] {
                backend.respond_ok(
                    Method::Put,
                    &format!("/admin/users/{id}/verify-account?isVerified={flag}"),
                    json!({ "message": "ok" }),
                );
                backend.respond_ok(
                    Method::Put,
                    &format!("/admin/users/{id}/block?isBlocked={flag}"),
                    json!({ "message": "ok" }),
                );
            }
        }
        for id in ["t-1", "t-2"] {
            backend.respond_ok(Method::Post, &format!("/transaction/approve/{id}"), json!({}));
            backend.respond_ok(Method::Post, &format!("/transaction/cancel/{id}"), json!({}));
        }
        backend.respond_ok(Method::Post, "/user/logout", json!({ "message": "bye" }));
        backend
    }

    pub fn respond(&self, method: Method, path: &str, response: BackendResponse) {
        let mut state = self.lock();
        state.broken.retain(|(m, p)| !(*m == method && p == path));
        state.routes.insert((method, path.to_string()), response);
    }

    pub fn respond_ok(&self, method: Method, path: &str, body: Value) {
        self.respond(method, path, BackendResponse::ok(body));
    }

    /// Makes the route fail at the transport level.
    pub fn break_route(&self, method: Method, path: &str) {
        self.lock().broken.push((method, path.to_string()));
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.lock().requests.clone()
    }

    pub fn request_count(&self, method: Method, path: &str) -> usize {
        self.lock()
            .requests
            .iter()
            .filter(|request| request.method == method && request.path == path)
            .count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, InMemoryState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl BackendService for InMemoryBackend {
    async fn send(
        &self,
        method: Method,
        path: &str,
        token: &str,
    ) -> ServiceResult<BackendResponse> {
        let mut state = self.lock();
        state.requests.push(RecordedRequest {
            method,
            path: path.to_string(),
            token: token.to_string(),
        });
        if state
            .broken
            .iter()
            .any(|(m, p)| *m == method && p == path)
        {
            return Err(AdminError::Transport(format!(
                "connection reset: {method} {path}"
            )));
        }
        Ok(state
            .routes
            .get(&(method, path.to_string()))
            .cloned()
            .unwrap_or_else(|| BackendResponse::new(404, json!({ "message": "not found" }))))
    }
}
