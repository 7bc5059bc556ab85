//! Stateless HTTP request builder and response parser for the Iguana API.
//!
//! # Design
//! `IguanaClient` holds only a `ClientConfig`. Each endpoint is split into
//! a `build_*` method that produces an `HttpRequest` and a `parse_*` method
//! that consumes an `HttpResponse`. The `Iguana` facade (or a foreign host
//! through the FFI crate) executes the round-trip in between.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use uuid::Uuid;

use crate::channel::Channel;
use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse, FORM_CONTENT_TYPE};
use crate::result::ApiResult;
use crate::version::Version;

pub mod endpoint {
    pub const CURRENT_VERSION: &str = "current_version";
    pub const MONITOR_QUERY: &str = "monitor_query";
    pub const API_QUERY: &str = "api_query";
    pub const SERVER_CONFIG: &str = "get_server_config";
    pub const DEFAULT_CONFIG: &str = "get_default_config";
    pub const STATUS: &str = "status";
    pub const CHANNEL_CONFIG: &str = "get_channel_config";
    pub const UPDATE_CHANNEL: &str = "update_channel";
}

/// How `get_channel_config` should find a channel. Iguana recommends GUIDs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelLookup {
    Guid(Uuid),
    Name(String),
}

impl ChannelLookup {
    /// Form field name and value. GUIDs use Iguana's 32 upper-case hex form.
    fn form_pair(&self) -> (&'static str, String) {
        match self {
            ChannelLookup::Guid(guid) => ("guid", format!("{:X}", guid.simple())),
            ChannelLookup::Name(name) => ("name", name.clone()),
        }
    }
}

/// `status` actions that act on every channel at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusAction {
    StopAll,
    StartAll,
}

impl StatusAction {
    pub fn as_str(self) -> &'static str {
        match self {
            StatusAction::StopAll => "stopall",
            StatusAction::StartAll => "startall",
        }
    }
}

/// Synchronous, stateless request builder for the Iguana API.
#[derive(Debug, Clone, Default)]
pub struct IguanaClient {
    config: ClientConfig,
}

impl IguanaClient {
    pub fn new(config: ClientConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut ClientConfig {
        &mut self.config
    }

    /// Resolve `endpoint` against the base URL unless it is already absolute.
    pub fn url_for(&self, endpoint: &str) -> String {
        if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            endpoint.to_string()
        } else {
            format!("{}{endpoint}", self.config.base_url)
        }
    }

    /// Build a form POST to any endpoint. An empty payload yields an empty body.
    pub fn build_api(&self, endpoint: &str, payload: &[(&str, &str)]) -> Result<HttpRequest, ApiError> {
        let body = serde_urlencoded::to_string(payload).map_err(|e| ApiError::Serialization(e.to_string()))?;
        let credentials = BASE64.encode(format!("{}:{}", self.config.username, self.config.password));
        Ok(HttpRequest {
            url: self.url_for(endpoint),
            headers: vec![
                ("authorization".to_string(), format!("Basic {credentials}")),
                ("content-type".to_string(), FORM_CONTENT_TYPE.to_string()),
            ],
            body,
        })
    }

    pub fn build_version(&self) -> Result<HttpRequest, ApiError> {
        self.build_api(endpoint::CURRENT_VERSION, &[])
    }

    pub fn build_monitor(&self) -> Result<HttpRequest, ApiError> {
        self.build_api(endpoint::MONITOR_QUERY, &[])
    }

    pub fn build_log_messages(&self) -> Result<HttpRequest, ApiError> {
        self.build_api(endpoint::API_QUERY, &[])
    }

    pub fn build_server_config(&self) -> Result<HttpRequest, ApiError> {
        self.build_api(endpoint::SERVER_CONFIG, &[])
    }

    /// Template config for a new channel, e.g. `("LLP Listener", "To Database")`.
    pub fn build_default_config(&self, source: &str, destination: &str) -> Result<HttpRequest, ApiError> {
        self.build_api(endpoint::DEFAULT_CONFIG, &[("source", source), ("destination", destination)])
    }

    pub fn build_status(&self) -> Result<HttpRequest, ApiError> {
        self.build_api(endpoint::STATUS, &[])
    }

    pub fn build_status_action(&self, action: StatusAction) -> Result<HttpRequest, ApiError> {
        self.build_api(endpoint::STATUS, &[("action", action.as_str())])
    }

    pub fn build_channel_config(&self, lookup: &ChannelLookup) -> Result<HttpRequest, ApiError> {
        let (key, value) = lookup.form_pair();
        self.build_api(endpoint::CHANNEL_CONFIG, &[(key, value.as_str())])
    }

    pub fn build_channel_update(&self, channel: &Channel) -> Result<HttpRequest, ApiError> {
        let config = channel.to_xml()?;
        self.build_api(endpoint::UPDATE_CHANNEL, &[("config", config.as_str())])
    }

    /// Classify a response. Error envelopes win over the HTTP status; any
    /// other non-2xx response is an `ApiError::Http`.
    pub fn parse_api(&self, response: HttpResponse) -> Result<ApiResult, ApiError> {
        let success = response.is_success();
        let status = response.status;
        let result = ApiResult::from_body(response.body);
        match result {
            ApiResult::Success(body) if !success => Err(ApiError::Http { status, body }),
            result => Ok(result),
        }
    }

    pub fn parse_version(&self, response: HttpResponse) -> Result<Version, ApiError> {
        let body = self.parse_api(response)?.into_result()?;
        Version::from_json(&body)
    }

    /// `None` when the server reports an error (unknown GUID or name).
    pub fn parse_channel_config(&self, response: HttpResponse) -> Result<Option<Channel>, ApiError> {
        match self.parse_api(response)? {
            ApiResult::Success(body) => Ok(Some(Channel::parse(&body)?)),
            ApiResult::ServerError { .. } => Ok(None),
        }
    }
}
