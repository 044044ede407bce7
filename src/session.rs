use crate::services::{AdminError, BackendService, Method, ServiceResult};
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

/// Access to the admin's session token, injected into every view.
pub trait SessionStore: Send + Sync {
    fn token(&self) -> Option<String>;
    fn clear(&self);
}

#[derive(Clone, Debug, Default)]
pub struct MemorySession {
    token: Arc<Mutex<Option<String>>>,
}

impl MemorySession {
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Arc::new(Mutex::new(Some(token.into()))),
        }
    }

    pub fn set_token(&self, token: impl Into<String>) {
        *self.slot() = Some(token.into());
    }

    pub fn is_active(&self) -> bool {
        self.token().is_some()
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<String>> {
        self.token
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl SessionStore for MemorySession {
    fn token(&self) -> Option<String> {
        self.slot()
            .as_ref()
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty())
    }

    fn clear(&self) {
        *self.slot() = None;
    }
}

pub fn require_token(session: &dyn SessionStore) -> ServiceResult<String> {
    session.token().ok_or(AdminError::MissingAuth)
}

/// Ends the session on the backend. The local session is cleared even when
/// the backend call fails.
pub async fn logout<B: BackendService>(
    backend: &B,
    session: &dyn SessionStore,
) -> ServiceResult<()> {
    let token = require_token(session)?;
    match backend.send(Method::Post, "/user/logout", &token).await {
        Ok(response) if response.is_success() => info!("admin logged out"),
        Ok(response) => warn!(status = response.status, "logout rejected by backend"),
        Err(err) => warn!(error = %err, "logout request failed"),
    }
    session.clear();
    Ok(())
}
