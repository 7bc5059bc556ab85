//! Error types for the Iguana API client.
//!
//! # Design
//! Server-reported failures normally travel inside `ApiResult::ServerError`
//! as data. `ApiError::Server` exists only for operations that must decode a
//! typed payload (e.g. `version`) and cannot hand back a raw result.
//! Channel lifecycle calls that the client does not support return
//! `NotImplemented` before any request is built.

use thiserror::Error;

/// Errors returned by the client, transport and parse methods.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The HTTP round-trip itself failed (connection refused, timeout, DNS).
    #[error("transport failed: {0}")]
    Transport(String),

    /// The server answered with an `{"error": {...}}` envelope where a typed
    /// payload was required.
    #[error("server error {code}: {description}")]
    Server { code: i64, description: String },

    /// A non-2xx response that did not carry an error envelope.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The operation has no server-side counterpart in this client.
    #[error("{operation} is not implemented")]
    NotImplemented { operation: &'static str },

    /// The response body could not be deserialized into the expected type.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    /// The form payload could not be encoded.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// The channel configuration document could not be read or edited.
    #[error(transparent)]
    Channel(#[from] ChannelError),

    /// Client configuration could not be loaded.
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Errors raised by the `Channel` configuration accessor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelError {
    #[error("malformed channel config: {0}")]
    Parse(String),

    #[error("channel config has no <{0}> element")]
    MissingElement(&'static str),

    #[error("<{element}> has no `{attribute}` attribute")]
    MissingAttribute {
        element: &'static str,
        attribute: &'static str,
    },
}
