//! Blocking client for the Iguana integration engine's HTTP control API.
//!
//! # Overview
//! Reads server version, status, monitor values and logs, fetches channel
//! configuration templates and existing channel configs, and edits channel
//! fields through a live view of the XML document.
//!
//! # Design
//! - `IguanaClient` is stateless apart from its `ClientConfig`; it splits
//!   every endpoint into `build_*` (produces an `HttpRequest`) and `parse_*`
//!   (consumes an `HttpResponse`), so the I/O boundary is explicit.
//! - `Iguana` pairs the client with a blocking `Transport` (ureq by default)
//!   for callers that just want answers.
//! - Server errors are data (`ApiResult::ServerError`), not faults.
//! - `Channel` keeps the document as parsed and rewrites only the attributes
//!   that are set, so everything else round-trips unchanged.

pub mod channel;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod iguana;
pub mod result;
pub mod transport;
pub mod version;

pub use channel::{Channel, ChannelField};
pub use client::{ChannelLookup, IguanaClient, StatusAction};
pub use config::ClientConfig;
pub use error::{ApiError, ChannelError};
pub use http::{HttpRequest, HttpResponse};
pub use iguana::Iguana;
pub use result::ApiResult;
pub use transport::{Transport, UreqTransport};
pub use version::Version;
