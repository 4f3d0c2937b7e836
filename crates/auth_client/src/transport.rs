use std::time::Duration;

use reqwest::{multipart::Form, Client, Response};
use serde::Serialize;
use serde_json::Value;
use shared::error::TransportError;
use tracing::debug;

/// Thin wrapper over the HTTP client: joins paths onto the configured base
/// URL, applies per-call timeouts, and converts failures into the shared
/// transport taxonomy so the submission boundary can classify them.
pub struct Transport {
    http: Client,
    base_url: String,
}

impl Transport {
    /// `base_url` must already be normalized (no trailing slash), see
    /// `config::normalize_base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn post_json<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        timeout: Duration,
    ) -> Result<Value, TransportError> {
        debug!(path, "POST json");
        let response = self
            .http
            .post(self.url(path))
            .json(body)
            .timeout(timeout)
            .send()
            .await
            .map_err(request_error)?;
        read_body(response).await
    }

    pub async fn post_multipart(
        &self,
        path: &str,
        form: Form,
        timeout: Duration,
    ) -> Result<Value, TransportError> {
        debug!(path, "POST multipart");
        let response = self
            .http
            .post(self.url(path))
            .multipart(form)
            .timeout(timeout)
            .send()
            .await
            .map_err(request_error)?;
        read_body(response).await
    }

    pub async fn get_json(&self, path: &str, timeout: Duration) -> Result<Value, TransportError> {
        debug!(path, "GET json");
        let response = self
            .http
            .get(self.url(path))
            .timeout(timeout)
            .send()
            .await
            .map_err(request_error)?;
        read_body(response).await
    }
}

fn request_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout
    } else {
        TransportError::Network(err.to_string())
    }
}

/// Non-2xx becomes `Status` with the raw body text preserved for message
/// classification. Successful bodies parse as JSON when possible; a bare
/// text body (some endpoints answer with just the identifier) is kept as a
/// JSON string so the identifier extraction strategies still apply.
async fn read_body(response: Response) -> Result<Value, TransportError> {
    let status = response.status();
    let text = response.text().await.map_err(request_error)?;

    if !status.is_success() {
        return Err(TransportError::Status {
            status: status.as_u16(),
            body: (!text.is_empty()).then_some(text),
        });
    }

    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    match serde_json::from_str(&text) {
        Ok(value) => Ok(value),
        Err(_) => Ok(Value::String(text)),
    }
}
