use crate::services::{AdminError, BackendResponse, BackendService, Method, ServiceResult};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument};

/// reqwest-backed client for the marketplace REST API.
#[derive(Clone)]
pub struct HttpBackend {
    base_url: String,
    client: reqwest::Client,
}

impl HttpBackend {
    pub fn new(base_url: &str, timeout: Duration) -> ServiceResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AdminError::Transport(format!("http client setup failed: {e}")))?;
        Ok(Self {
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn auth_headers(token: &str) -> ServiceResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if !token.trim().is_empty() {
            let value = HeaderValue::from_str(&format!("Bearer {}", token.trim()))
                .map_err(|e| AdminError::Transport(format!("invalid auth header: {e}")))?;
            headers.insert(AUTHORIZATION, value);
        }
        Ok(headers)
    }
}

#[async_trait]
impl BackendService for HttpBackend {
    #[instrument(name = "backend_send", skip(self, token))]
    async fn send(
        &self,
        method: Method,
        path: &str,
        token: &str,
    ) -> ServiceResult<BackendResponse> {
        let url = self.url(path);
        let request = match method {
            Method::Get => self.client.get(&url),
            Method::Put => self.client.put(&url),
            Method::Post => self.client.post(&url),
        };
        let response = request
            .headers(Self::auth_headers(token)?)
            .send()
            .await
            .map_err(|e| AdminError::Transport(format!("{method} {url}: {e}")))?;
        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| AdminError::Transport(format!("read body failed: {e}")))?;
        debug!(status, bytes = text.len(), "backend answered");

        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            match serde_json::from_str(&text) {
                Ok(body) => body,
                Err(e) if (200..300).contains(&status) => {
                    return Err(AdminError::Transport(format!("parse failed: {e}")));
                }
                Err(_) => Value::String(text),
            }
        };
        Ok(BackendResponse { status, body })
    }
}
