//! Blocking execution of `HttpRequest` values.

use std::time::Duration;

use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse};

/// Executes one request synchronously on the caller's thread.
///
/// Implementations must return HTTP error statuses as data; only failures
/// of the round-trip itself become `ApiError::Transport`.
pub trait Transport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError>;
}

/// `Transport` backed by a ureq agent.
#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    /// `timeout` bounds the whole round-trip; `None` uses ureq's defaults.
    pub fn new(timeout: Option<Duration>) -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(timeout)
            .build()
            .new_agent();
        Self { agent }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new(None)
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        let mut builder = self.agent.post(&request.url);
        for (key, value) in &request.headers {
            builder = builder.header(key.as_str(), value.as_str());
        }

        let mut response = builder
            .send(request.body.as_bytes())
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str().to_string(), v.to_string())))
            .collect();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        Ok(HttpResponse { status, headers, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_refused_is_transport_error() {
        // Port 9 (discard) is essentially never listening on loopback.
        let request = HttpRequest {
            url: "http://127.0.0.1:9/status".to_string(),
            headers: Vec::new(),
            body: String::new(),
        };
        let err = UreqTransport::new(Some(Duration::from_secs(2)))
            .execute(&request)
            .unwrap_err();
        assert!(matches!(err, ApiError::Transport(_)));
    }
}
