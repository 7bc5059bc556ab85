//! In-process stand-in for the Iguana HTTP control API.
//!
//! Implements the endpoints the client uses, with the same shapes the real
//! server produces: form-encoded POST bodies in, JSON or XML out, and the
//! `{"error": {"return_code", "description"}}` envelope for failures.
//! Requests without the configured basic-auth credentials get a plain 401.

use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use quick_xml::{events::Event, Reader};
use serde::Deserialize;
use serde_json::json;
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

pub const USERNAME: &str = "admin";
pub const PASSWORD: &str = "password";

/// Channel present on every fresh server.
pub const SEED_CHANNEL_NAME: &str = "ADT In";
pub const SEED_CHANNEL_GUID: &str = "5A8A33C4CD3E1C13F3C0D0D9B1B3DD8C";

pub const VERSION: (u32, u32, u32) = (6, 1, 5);

/// Return codes used in error envelopes.
pub mod code {
    pub const MISSING_PARAMETER: i64 = 1;
    pub const UNKNOWN_CHANNEL: i64 = 2;
    pub const INVALID_CONFIG: i64 = 3;
    pub const UNKNOWN_COMPONENT: i64 = 4;
    pub const INVALID_ACTION: i64 = 5;
}

const SOURCES: &[&str] = &["LLP Listener", "From File", "From Database", "From HTTPS", "From Channel"];
const DESTINATIONS: &[&str] = &["To Database", "To File", "LLP Client", "To HTTPS", "To Channel"];

#[derive(Clone, Debug)]
pub struct StoredChannel {
    pub name: String,
    pub config: String,
}

#[derive(Debug)]
pub struct Server {
    pub channels: HashMap<Uuid, StoredChannel>,
    pub running: bool,
}

pub type Db = Arc<RwLock<Server>>;

pub fn app() -> Router {
    let guid = Uuid::try_parse(SEED_CHANNEL_GUID).unwrap_or_else(|_| Uuid::new_v4());
    let mut channels = HashMap::new();
    channels.insert(
        guid,
        StoredChannel {
            name: SEED_CHANNEL_NAME.to_string(),
            config: channel_template(SEED_CHANNEL_NAME, &guid_string(guid), "LLP Listener", "To Database"),
        },
    );
    let db: Db = Arc::new(RwLock::new(Server { channels, running: true }));

    Router::new()
        .route("/current_version", post(current_version))
        .route("/monitor_query", post(monitor_query))
        .route("/api_query", post(api_query))
        .route("/get_server_config", post(server_config))
        .route("/get_default_config", post(default_config))
        .route("/status", post(status))
        .route("/get_channel_config", post(channel_config))
        .route("/update_channel", post(update_channel))
        .layer(middleware::from_fn(require_basic_auth))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

fn guid_string(guid: Uuid) -> String {
    format!("{:X}", guid.simple())
}

fn error_envelope(status: StatusCode, code: i64, description: impl Into<String>) -> Response {
    let body = json!({ "error": { "return_code": code, "description": description.into() } });
    (status, Json(body)).into_response()
}

fn xml(body: String) -> Response {
    ([(header::CONTENT_TYPE, "text/xml")], body).into_response()
}

fn form<T: for<'de> Deserialize<'de>>(body: &str) -> Result<T, Response> {
    serde_urlencoded::from_str(body)
        .map_err(|e| error_envelope(StatusCode::BAD_REQUEST, code::MISSING_PARAMETER, e.to_string()))
}

async fn require_basic_auth(headers: HeaderMap, request: Request, next: Next) -> Response {
    let expected = format!("Basic {}", BASE64.encode(format!("{USERNAME}:{PASSWORD}")));
    let authorized = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == expected);
    if !authorized {
        tracing::debug!(uri = %request.uri(), "rejecting unauthenticated request");
        return (
            StatusCode::UNAUTHORIZED,
            [(header::WWW_AUTHENTICATE, "Basic realm=\"Iguana\"")],
            "Unauthorized",
        )
            .into_response();
    }
    next.run(request).await
}

async fn current_version() -> Response {
    let (major, minor, build) = VERSION;
    Json(json!({ "Major": major, "Minor": minor, "Build": build, "BuildExt": "" })).into_response()
}

async fn monitor_query(State(db): State<Db>) -> Response {
    let server = db.read().await;
    let mut out = format!(
        "<IguanaStatus Version=\"{}.{}.{}\" ServiceState=\"{}\">\n",
        VERSION.0,
        VERSION.1,
        VERSION.2,
        if server.running { "running" } else { "stopped" }
    );
    let mut channels: Vec<_> = server.channels.iter().collect();
    channels.sort_by(|a, b| a.1.name.cmp(&b.1.name));
    for (guid, channel) in channels {
        out.push_str(&format!(
            "  <Channel Guid=\"{}\" Name=\"{}\" Status=\"{}\"/>\n",
            guid_string(*guid),
            escape_attr(&channel.name),
            if server.running { "on" } else { "off" }
        ));
    }
    out.push_str("</IguanaStatus>\n");
    xml(out)
}

async fn api_query() -> Response {
    xml("<export>\n  <message type=\"info\" channel=\"ADT In\">Channel started</message>\n</export>\n".to_string())
}

async fn server_config() -> Response {
    xml("<iguana_config web_port=\"6543\" log_directory=\"logs\" log_retention_days=\"7\"/>\n".to_string())
}

#[derive(Deserialize)]
struct DefaultConfigForm {
    source: Option<String>,
    destination: Option<String>,
}

async fn default_config(body: String) -> Response {
    let input: DefaultConfigForm = match form(&body) {
        Ok(input) => input,
        Err(resp) => return resp,
    };
    let (Some(source), Some(destination)) = (input.source, input.destination) else {
        return error_envelope(StatusCode::BAD_REQUEST, code::MISSING_PARAMETER, "source and destination are required");
    };
    if !SOURCES.contains(&source.as_str()) {
        return error_envelope(StatusCode::BAD_REQUEST, code::UNKNOWN_COMPONENT, format!("unknown source: {source}"));
    }
    if !DESTINATIONS.contains(&destination.as_str()) {
        return error_envelope(
            StatusCode::BAD_REQUEST,
            code::UNKNOWN_COMPONENT,
            format!("unknown destination: {destination}"),
        );
    }
    xml(channel_template("Channel 1", "", &source, &destination))
}

#[derive(Deserialize)]
struct StatusForm {
    action: Option<String>,
}

async fn status(State(db): State<Db>, body: String) -> Response {
    let input: StatusForm = match form(&body) {
        Ok(input) => input,
        Err(resp) => return resp,
    };
    let mut server = db.write().await;
    match input.action.as_deref() {
        None => {}
        Some("stopall") => server.running = false,
        Some("startall") => server.running = true,
        Some(other) => {
            return error_envelope(StatusCode::BAD_REQUEST, code::INVALID_ACTION, format!("unknown action: {other}"));
        }
    }
    xml(format!(
        "<IguanaStatus ChannelsRunning=\"{}\" ChannelCount=\"{}\"/>\n",
        server.running,
        server.channels.len()
    ))
}

#[derive(Deserialize)]
struct ChannelConfigForm {
    guid: Option<String>,
    name: Option<String>,
}

async fn channel_config(State(db): State<Db>, body: String) -> Response {
    let input: ChannelConfigForm = match form(&body) {
        Ok(input) => input,
        Err(resp) => return resp,
    };
    let server = db.read().await;
    let found = match (input.guid, input.name) {
        (Some(guid), _) => Uuid::try_parse(&guid).ok().and_then(|g| server.channels.get(&g)),
        (None, Some(name)) => server.channels.values().find(|c| c.name == name),
        (None, None) => {
            return error_envelope(StatusCode::BAD_REQUEST, code::MISSING_PARAMETER, "guid or name is required");
        }
    };
    match found {
        Some(channel) => xml(channel.config.clone()),
        None => error_envelope(StatusCode::BAD_REQUEST, code::UNKNOWN_CHANNEL, "no such channel"),
    }
}

#[derive(Deserialize)]
struct UpdateChannelForm {
    config: Option<String>,
}

async fn update_channel(State(db): State<Db>, body: String) -> Response {
    let input: UpdateChannelForm = match form(&body) {
        Ok(input) => input,
        Err(resp) => return resp,
    };
    let Some(config) = input.config else {
        return error_envelope(StatusCode::BAD_REQUEST, code::MISSING_PARAMETER, "config is required");
    };
    let Some(attrs) = channel_attributes(&config) else {
        return error_envelope(StatusCode::BAD_REQUEST, code::INVALID_CONFIG, "config has no <channel> element");
    };
    let Some(guid) = attrs.get("guid").and_then(|g| Uuid::try_parse(g).ok()) else {
        return error_envelope(StatusCode::BAD_REQUEST, code::UNKNOWN_CHANNEL, "config has no known guid");
    };

    let mut server = db.write().await;
    let Some(stored) = server.channels.get_mut(&guid) else {
        return error_envelope(StatusCode::BAD_REQUEST, code::UNKNOWN_CHANNEL, "no such channel");
    };
    if let Some(name) = attrs.get("name") {
        stored.name = name.clone();
    }
    stored.config = config;
    tracing::info!(guid = %guid_string(guid), name = %stored.name, "channel updated");
    xml(format!("<update_channel guid=\"{}\" result=\"ok\"/>\n", guid_string(guid)))
}

/// Attributes of the first `<channel>` start tag, or `None` if there is none.
fn channel_attributes(config: &str) -> Option<HashMap<String, String>> {
    let mut reader = Reader::from_str(config);
    loop {
        match reader.read_event() {
            Ok(Event::Start(start)) | Ok(Event::Empty(start)) if start.name().as_ref() == b"channel" => {
                let attrs = start
                    .attributes()
                    .filter_map(Result::ok)
                    .filter_map(|a| {
                        let key = String::from_utf8(a.key.as_ref().to_vec()).ok()?;
                        let value = a.unescape_value().ok()?.into_owned();
                        Some((key, value))
                    })
                    .collect();
                return Some(attrs);
            }
            Ok(Event::Eof) | Err(_) => return None,
            Ok(_) => {}
        }
    }
}

fn escape_attr(value: &str) -> String {
    quick_xml::escape::escape(value).into_owned()
}

/// Component element name, e.g. "LLP Listener" -> "from_llp_listener".
fn component_element(prefix: &str, component: &str) -> String {
    let snake = component.to_ascii_lowercase().replace(' ', "_");
    if snake.starts_with(prefix) {
        snake
    } else {
        format!("{prefix}_{snake}")
    }
}

/// Config document in the shape `get_default_config` produces.
pub fn channel_template(name: &str, guid: &str, source: &str, destination: &str) -> String {
    let source_element = component_element("from", source);
    let source_attrs = if source_element == "from_llp_listener" {
        " port=\"5145\" ack_style=\"fast\""
    } else {
        ""
    };
    format!(
        r#"<channel
   name="{name}"
   guid="{guid}"
   description=""
   start_automatically="false"
   logging_level="1"
   database_reconnection_interval="60000"
   maximum_database_reconnections="-1"
   database_timeout_seconds="30"
   action_on_parse_error="skip"
   action_on_db_error="skip">
   <{source_element}{source_attrs}/>
   <{destination_element} vmd_path=""/>
</channel>
"#,
        name = escape_attr(name),
        destination_element = component_element("to", destination),
    )
}
