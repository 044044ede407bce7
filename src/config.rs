use std::{env, time::Duration};

/// Runtime configuration loaded from environment.
#[derive(Debug, Clone)]
pub struct AdminConfig {
    /// Marketplace REST API root. `None` runs against built-in sample data.
    pub backend_url: Option<String>,
    pub http_timeout: Duration,
    pub bind_addr: String,
}

impl AdminConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let backend_url = lookup("ADMIN_API_BASE_URL")
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty());
        let timeout_secs = lookup("ADMIN_HTTP_TIMEOUT_SECS")
            .and_then(|v| v.parse().ok())
            .unwrap_or(15);
        let bind_addr = lookup("BIND_ADDR").unwrap_or_else(|| "127.0.0.1:3000".into());

        Self {
            backend_url,
            http_timeout: Duration::from_secs(timeout_secs),
            bind_addr,
        }
    }
}
