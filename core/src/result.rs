//! Tagged result of a single Iguana API call.
//!
//! # Design
//! Iguana reports failures as a JSON envelope,
//! `{"error": {"return_code": <int>, "description": <string>}}`, while
//! successful payloads are JSON, XML or plain text. A body is a
//! `ServerError` only when it decodes against that exact envelope schema.
//! Anything else, including JSON that merely has an `error` key of another
//! shape, is a `Success` carrying the body verbatim.

use std::fmt;

use serde::Deserialize;

use crate::error::ApiError;

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    return_code: i64,
    description: String,
}

/// Outcome of one API call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiResult {
    /// The raw response body.
    Success(String),

    /// The server's error envelope.
    ServerError { code: i64, description: String },
}

impl ApiResult {
    /// Classify a raw response body.
    pub fn from_body(body: impl Into<String>) -> Self {
        let body = body.into();
        match serde_json::from_str::<ErrorEnvelope>(&body) {
            Ok(envelope) => ApiResult::ServerError {
                code: envelope.error.return_code,
                description: envelope.error.description,
            },
            Err(_) => ApiResult::Success(body),
        }
    }

    /// 0 on success, otherwise the server's return code.
    pub fn status(&self) -> i64 {
        match self {
            ApiResult::Success(_) => 0,
            ApiResult::ServerError { code, .. } => *code,
        }
    }

    /// The payload on success, the error description otherwise.
    pub fn text(&self) -> &str {
        match self {
            ApiResult::Success(body) => body,
            ApiResult::ServerError { description, .. } => description,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status() == 0
    }

    pub fn len(&self) -> usize {
        self.text().len()
    }

    pub fn is_empty(&self) -> bool {
        self.text().is_empty()
    }

    /// Convert into a plain `Result`, mapping the envelope to `ApiError::Server`.
    pub fn into_result(self) -> Result<String, ApiError> {
        match self {
            ApiResult::Success(body) => Ok(body),
            ApiResult::ServerError { code, description } => Err(ApiError::Server { code, description }),
        }
    }
}

impl fmt::Display for ApiResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}

impl From<&ApiResult> for i64 {
    fn from(result: &ApiResult) -> Self {
        result.status()
    }
}

impl From<&ApiResult> for bool {
    fn from(result: &ApiResult) -> Self {
        result.is_success()
    }
}
