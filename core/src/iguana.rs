//! Blocking facade over `IguanaClient` and a `Transport`.
//!
//! Every operation is one POST (`channel_restart_all` is two) performed on
//! the caller's thread. Channel lifecycle calls the client has no endpoint
//! for return `ApiError::NotImplemented` without touching the network.

use tracing::{debug, warn};

use crate::channel::Channel;
use crate::client::{ChannelLookup, IguanaClient, StatusAction};
use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse};
use crate::result::ApiResult;
use crate::transport::{Transport, UreqTransport};
use crate::version::Version;

/// Main entry point for talking to an Iguana server.
#[derive(Debug)]
pub struct Iguana<T = UreqTransport> {
    client: IguanaClient,
    transport: T,
}

impl Iguana<UreqTransport> {
    /// Client over ureq. The timeout is read from `config` here; changing it
    /// later through `config_mut` has no effect on the transport.
    pub fn new(config: ClientConfig) -> Self {
        let transport = UreqTransport::new(config.timeout());
        Self::with_transport(config, transport)
    }
}

impl Default for Iguana<UreqTransport> {
    fn default() -> Self {
        Self::new(ClientConfig::default())
    }
}

impl<T: Transport> Iguana<T> {
    pub fn with_transport(config: ClientConfig, transport: T) -> Self {
        Self {
            client: IguanaClient::new(config),
            transport,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        self.client.config()
    }

    /// Base URL and credentials may be changed between calls.
    pub fn config_mut(&mut self) -> &mut ClientConfig {
        self.client.config_mut()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        debug!(url = %request.url, body_len = request.body.len(), "POST");
        let response = self.transport.execute(&request)?;
        debug!(url = %request.url, status = response.status, len = response.body.len(), "response");
        Ok(response)
    }

    fn call(&self, request: HttpRequest) -> Result<ApiResult, ApiError> {
        let result = self.client.parse_api(self.send(request)?)?;
        if let ApiResult::ServerError { code, description } = &result {
            warn!(code, %description, "server reported an error");
        }
        Ok(result)
    }

    /// POST to `endpoint` (relative to the base URL unless absolute) with an
    /// optional form payload.
    pub fn api(&self, endpoint: &str, payload: &[(&str, &str)]) -> Result<ApiResult, ApiError> {
        self.call(self.client.build_api(endpoint, payload)?)
    }

    pub fn version(&self) -> Result<Version, ApiError> {
        let response = self.send(self.client.build_version()?)?;
        self.client.parse_version(response)
    }

    /// System monitoring values.
    pub fn monitor(&self) -> Result<ApiResult, ApiError> {
        self.call(self.client.build_monitor()?)
    }

    pub fn log_messages(&self) -> Result<ApiResult, ApiError> {
        self.call(self.client.build_log_messages()?)
    }

    pub fn server_config(&self) -> Result<ApiResult, ApiError> {
        self.call(self.client.build_server_config()?)
    }

    /// Template config for a new channel. The body is returned unchanged.
    pub fn default_config(&self, source: &str, destination: &str) -> Result<ApiResult, ApiError> {
        self.call(self.client.build_default_config(source, destination)?)
    }

    pub fn status(&self) -> Result<ApiResult, ApiError> {
        self.call(self.client.build_status()?)
    }

    /// Load a channel's config. `None` if the server does not know it.
    pub fn channel_config(&self, lookup: &ChannelLookup) -> Result<Option<Channel>, ApiError> {
        let response = self.send(self.client.build_channel_config(lookup)?)?;
        self.client.parse_channel_config(response)
    }

    /// Submit an edited config for an existing channel.
    pub fn channel_update(&self, channel: &Channel) -> Result<ApiResult, ApiError> {
        self.call(self.client.build_channel_update(channel)?)
    }

    pub fn channel_create(&self, _channel: &Channel) -> Result<ApiResult, ApiError> {
        not_implemented("channel_create")
    }

    pub fn channel_remove(&self, _lookup: &ChannelLookup) -> Result<ApiResult, ApiError> {
        not_implemented("channel_remove")
    }

    pub fn channel_start(&self, _lookup: &ChannelLookup) -> Result<ApiResult, ApiError> {
        not_implemented("channel_start")
    }

    pub fn channel_stop(&self, _lookup: &ChannelLookup) -> Result<ApiResult, ApiError> {
        not_implemented("channel_stop")
    }

    pub fn channel_restart(&self, lookup: &ChannelLookup) -> Result<ApiResult, ApiError> {
        self.channel_stop(lookup)?;
        self.channel_start(lookup)
    }

    pub fn channel_stop_all(&self) -> Result<ApiResult, ApiError> {
        self.call(self.client.build_status_action(StatusAction::StopAll)?)
    }

    pub fn channel_start_all(&self) -> Result<ApiResult, ApiError> {
        self.call(self.client.build_status_action(StatusAction::StartAll)?)
    }

    /// Stop then start every channel. A failed stop is returned as-is and
    /// the start is skipped.
    pub fn channel_restart_all(&self) -> Result<ApiResult, ApiError> {
        let stopped = self.channel_stop_all()?;
        if !stopped.is_success() {
            return Ok(stopped);
        }
        self.channel_start_all()
    }
}

fn not_implemented(operation: &'static str) -> Result<ApiResult, ApiError> {
    warn!(operation, "operation is not implemented");
    Err(ApiError::NotImplemented { operation })
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::VecDeque;

    use super::*;

    /// Records every request and answers from a queue of canned bodies.
    #[derive(Default)]
    struct Recording {
        requests: RefCell<Vec<HttpRequest>>,
        replies: RefCell<VecDeque<HttpResponse>>,
    }

    impl Recording {
        fn replying(bodies: &[&str]) -> Self {
            let recording = Self::default();
            recording
                .replies
                .borrow_mut()
                .extend(bodies.iter().map(|b| HttpResponse::ok(*b)));
            recording
        }

        fn forms(&self) -> Vec<(String, Vec<(String, String)>)> {
            self.requests
                .borrow()
                .iter()
                .map(|r| (r.url.clone(), serde_urlencoded::from_str(&r.body).unwrap()))
                .collect()
        }
    }

    impl Transport for Recording {
        fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
            self.requests.borrow_mut().push(request.clone());
            self.replies
                .borrow_mut()
                .pop_front()
                .ok_or_else(|| ApiError::Transport("no canned reply".to_string()))
        }
    }

    fn iguana(bodies: &[&str]) -> Iguana<Recording> {
        Iguana::with_transport(ClientConfig::default(), Recording::replying(bodies))
    }

    fn pair(k: &str, v: &str) -> (String, String) {
        (k.to_string(), v.to_string())
    }

    #[test]
    fn default_config_is_one_post_with_raw_body() {
        let template = r#"<channel name="Channel 1"><from_llp_listener port="5145"/></channel>"#;
        let i = iguana(&[template]);
        let result = i.default_config("LLP Listener", "To Database").unwrap();

        assert_eq!(result, ApiResult::Success(template.to_string()));
        assert_eq!(
            i.transport().forms(),
            vec![(
                "http://localhost:6543/get_default_config".to_string(),
                vec![pair("source", "LLP Listener"), pair("destination", "To Database")]
            )]
        );
    }

    #[test]
    fn unsupported_lifecycle_calls_do_not_touch_network() {
        let i = iguana(&[]);
        let channel = Channel::parse(r#"<channel name="x"/>"#).unwrap();
        let lookup = ChannelLookup::Name("x".to_string());

        let results = [
            i.channel_create(&channel),
            i.channel_remove(&lookup),
            i.channel_start(&lookup),
            i.channel_stop(&lookup),
            i.channel_restart(&lookup),
        ];
        for result in results {
            assert!(matches!(result, Err(ApiError::NotImplemented { .. })));
        }
        assert!(i.transport().requests.borrow().is_empty());
    }

    #[test]
    fn restart_reports_the_stop_step() {
        let err = iguana(&[])
            .channel_restart(&ChannelLookup::Name("x".to_string()))
            .unwrap_err();
        assert!(matches!(err, ApiError::NotImplemented { operation: "channel_stop" }));
    }

    #[test]
    fn restart_all_stops_then_starts() {
        let i = iguana(&["stopped", "started"]);
        let result = i.channel_restart_all().unwrap();
        assert_eq!(result.text(), "started");

        let forms = i.transport().forms();
        assert_eq!(forms.len(), 2);
        assert_eq!(forms[0].1, vec![pair("action", "stopall")]);
        assert_eq!(forms[1].1, vec![pair("action", "startall")]);
    }

    #[test]
    fn restart_all_skips_start_after_failed_stop() {
        let i = iguana(&[r#"{"error":{"return_code":5,"description":"busy"}}"#, "started"]);
        let result = i.channel_restart_all().unwrap();
        assert_eq!(result.status(), 5);
        assert_eq!(i.transport().requests.borrow().len(), 1);
    }

    #[test]
    fn simple_endpoints_hit_expected_urls() {
        let i = iguana(&["a", "b", "c", "d"]);
        i.monitor().unwrap();
        i.log_messages().unwrap();
        i.server_config().unwrap();
        i.status().unwrap();

        let urls: Vec<String> = i.transport().requests.borrow().iter().map(|r| r.url.clone()).collect();
        assert_eq!(
            urls,
            [
                "http://localhost:6543/monitor_query",
                "http://localhost:6543/api_query",
                "http://localhost:6543/get_server_config",
                "http://localhost:6543/status",
            ]
        );
        assert!(i.transport().requests.borrow().iter().all(|r| r.body.is_empty()));
    }

    #[test]
    fn version_decodes_payload() {
        let i = iguana(&[r#"{"Major":5,"Minor":6,"Build":7,"BuildExt":""}"#]);
        assert_eq!(i.version().unwrap().to_string(), "5.6.7");
    }

    #[test]
    fn channel_config_none_on_server_error() {
        let i = iguana(&[r#"{"error":{"return_code":2,"description":"unknown channel"}}"#]);
        let found = i.channel_config(&ChannelLookup::Name("ghost".to_string())).unwrap();
        assert!(found.is_none());
        assert_eq!(i.transport().forms()[0].1, vec![pair("name", "ghost")]);
    }

    #[test]
    fn channel_update_sends_config_field() {
        let i = iguana(&["ok"]);
        let mut channel = Channel::parse(r#"<channel name="x"/>"#).unwrap();
        channel.set_name("y").unwrap();
        i.channel_update(&channel).unwrap();

        let forms = i.transport().forms();
        assert_eq!(forms[0].0, "http://localhost:6543/update_channel");
        assert_eq!(forms[0].1, vec![pair("config", r#"<channel name="y"/>"#)]);
    }

    #[test]
    fn config_changes_apply_to_next_call() {
        let mut i = iguana(&["ok"]);
        i.config_mut().base_url = "http://iguana:7000/".to_string();
        i.api("status", &[]).unwrap();
        assert_eq!(i.transport().requests.borrow()[0].url, "http://iguana:7000/status");
    }

    #[test]
    fn transport_errors_propagate() {
        let err = iguana(&[]).status().unwrap_err();
        assert!(matches!(err, ApiError::Transport(_)));
    }
}
