//! Live accessor over a channel configuration document.
//!
//! # Design
//! The document is parsed once into a flat list of owned `quick-xml`
//! events. Accessors locate the root `<channel>` element (or its
//! `<from_llp_listener>` descendant) and read or rewrite a single attribute
//! on that start tag. Every other event, including whitespace, comments and
//! the raw bytes of untouched attributes, is written back exactly as read.
//!
//! The parse is lenient: end tags are not checked against their start tags,
//! attribute values may be unquoted and element/attribute names are matched
//! ASCII case-insensitively, so HTML-ish renderings of a config are accepted.
//!
//! ```no_run
//! # use iguana_core::{Channel, Iguana};
//! # fn main() -> Result<(), iguana_core::ApiError> {
//! let iguana = Iguana::new(Default::default());
//! let template = iguana.default_config("LLP Listener", "To Database")?.into_result()?;
//! let mut channel = Channel::parse(&template)?;
//! channel.set_name("channeltest")?;
//! channel.set_port(12345)?;
//! iguana.channel_update(&channel)?;
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::ops::Range;
use std::str::FromStr;

use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use quick_xml::writer::Writer;

use crate::error::ChannelError;

const CHANNEL: &str = "channel";
const LLP_LISTENER: &str = "from_llp_listener";

/// A named, editable field of a channel configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelField {
    Name,
    StartAutomatically,
    /// Listening port of an LLP Listener source, stored on `<from_llp_listener>`.
    Port,
    DatabaseReconnectionInterval,
    MaximumDatabaseReconnections,
    DatabaseTimeoutSeconds,
    /// `skip` ignores parse errors and keeps processing.
    ActionOnParseError,
    /// `skip` ignores database errors and keeps sending the remaining data.
    ActionOnDbError,
}

impl ChannelField {
    pub const ALL: [ChannelField; 8] = [
        ChannelField::Name,
        ChannelField::StartAutomatically,
        ChannelField::Port,
        ChannelField::DatabaseReconnectionInterval,
        ChannelField::MaximumDatabaseReconnections,
        ChannelField::DatabaseTimeoutSeconds,
        ChannelField::ActionOnParseError,
        ChannelField::ActionOnDbError,
    ];

    /// Attribute name in the XML document.
    pub fn attribute(self) -> &'static str {
        match self {
            ChannelField::Name => "name",
            ChannelField::StartAutomatically => "start_automatically",
            ChannelField::Port => "port",
            ChannelField::DatabaseReconnectionInterval => "database_reconnection_interval",
            ChannelField::MaximumDatabaseReconnections => "maximum_database_reconnections",
            ChannelField::DatabaseTimeoutSeconds => "database_timeout_seconds",
            ChannelField::ActionOnParseError => "action_on_parse_error",
            ChannelField::ActionOnDbError => "action_on_db_error",
        }
    }

    /// Element that carries the attribute.
    pub fn element(self) -> &'static str {
        match self {
            ChannelField::Port => LLP_LISTENER,
            _ => CHANNEL,
        }
    }
}

/// A channel configuration document with typed access to its common fields.
///
/// All values are strings; numeric and boolean meaning is up to the caller.
#[derive(Debug, Clone)]
pub struct Channel {
    events: Vec<Event<'static>>,
    channel_idx: usize,
}

impl Channel {
    /// Parse a configuration as returned by `get_default_config` or
    /// `get_channel_config`. Fails if there is no `<channel>` element.
    pub fn parse(config: &str) -> Result<Self, ChannelError> {
        let mut reader = Reader::from_str(config);
        reader.config_mut().check_end_names = false;

        let mut events = Vec::new();
        loop {
            match reader.read_event() {
                Ok(Event::Eof) => break,
                Ok(event) => events.push(event.into_owned()),
                Err(e) => return Err(ChannelError::Parse(e.to_string())),
            }
        }

        let channel_idx = events
            .iter()
            .position(|event| start_named(event, CHANNEL).is_some())
            .ok_or(ChannelError::MissingElement(CHANNEL))?;

        Ok(Self { events, channel_idx })
    }

    /// Current value of `field`.
    pub fn get(&self, field: ChannelField) -> Result<String, ChannelError> {
        let idx = self.element_idx(field.element())?;
        let start = start_at(&self.events[idx]).ok_or(ChannelError::MissingElement(field.element()))?;
        find_attribute(start, field.attribute())?.ok_or(ChannelError::MissingAttribute {
            element: field.element(),
            attribute: field.attribute(),
        })
    }

    /// Store `value` for `field`, adding the attribute if the element lacks it.
    pub fn set(&mut self, field: ChannelField, value: &str) -> Result<(), ChannelError> {
        let idx = self.element_idx(field.element())?;
        let start = start_at(&self.events[idx]).ok_or(ChannelError::MissingElement(field.element()))?;
        let rebuilt = with_attribute(start, field.attribute(), value)?;
        match &mut self.events[idx] {
            Event::Start(slot) | Event::Empty(slot) => *slot = rebuilt,
            _ => return Err(ChannelError::MissingElement(field.element())),
        }
        Ok(())
    }

    pub fn name(&self) -> Result<String, ChannelError> {
        self.get(ChannelField::Name)
    }

    pub fn set_name(&mut self, name: impl fmt::Display) -> Result<(), ChannelError> {
        self.set(ChannelField::Name, &name.to_string())
    }

    /// `"True"`/`"False"` when written by this accessor; templates from the
    /// server may use other spellings.
    pub fn start_automatically(&self) -> Result<String, ChannelError> {
        self.get(ChannelField::StartAutomatically)
    }

    pub fn set_start_automatically(&mut self, start: bool) -> Result<(), ChannelError> {
        let value = if start { "True" } else { "False" };
        self.set(ChannelField::StartAutomatically, value)
    }

    pub fn port(&self) -> Result<String, ChannelError> {
        self.get(ChannelField::Port)
    }

    pub fn set_port(&mut self, port: impl fmt::Display) -> Result<(), ChannelError> {
        self.set(ChannelField::Port, &port.to_string())
    }

    /// Time between database reconnection attempts.
    pub fn database_reconnection_interval(&self) -> Result<String, ChannelError> {
        self.get(ChannelField::DatabaseReconnectionInterval)
    }

    pub fn set_database_reconnection_interval(&mut self, interval: impl fmt::Display) -> Result<(), ChannelError> {
        self.set(ChannelField::DatabaseReconnectionInterval, &interval.to_string())
    }

    /// Number of database reconnection attempts.
    pub fn maximum_database_reconnections(&self) -> Result<String, ChannelError> {
        self.get(ChannelField::MaximumDatabaseReconnections)
    }

    pub fn set_maximum_database_reconnections(&mut self, attempts: impl fmt::Display) -> Result<(), ChannelError> {
        self.set(ChannelField::MaximumDatabaseReconnections, &attempts.to_string())
    }

    pub fn database_timeout_seconds(&self) -> Result<String, ChannelError> {
        self.get(ChannelField::DatabaseTimeoutSeconds)
    }

    pub fn set_database_timeout_seconds(&mut self, seconds: impl fmt::Display) -> Result<(), ChannelError> {
        self.set(ChannelField::DatabaseTimeoutSeconds, &seconds.to_string())
    }

    pub fn action_on_parse_error(&self) -> Result<String, ChannelError> {
        self.get(ChannelField::ActionOnParseError)
    }

    pub fn set_action_on_parse_error(&mut self, action: impl fmt::Display) -> Result<(), ChannelError> {
        self.set(ChannelField::ActionOnParseError, &action.to_string())
    }

    pub fn action_on_db_error(&self) -> Result<String, ChannelError> {
        self.get(ChannelField::ActionOnDbError)
    }

    pub fn set_action_on_db_error(&mut self, action: impl fmt::Display) -> Result<(), ChannelError> {
        self.set(ChannelField::ActionOnDbError, &action.to_string())
    }

    /// Serialize the whole document, ready to send back to the server.
    pub fn to_xml(&self) -> Result<String, ChannelError> {
        let mut writer = Writer::new(Vec::new());
        for event in &self.events {
            writer
                .write_event(event.clone())
                .map_err(|e| ChannelError::Parse(e.to_string()))?;
        }
        String::from_utf8(writer.into_inner()).map_err(|e| ChannelError::Parse(e.to_string()))
    }

    /// Index of the event that opens `element`: the root `<channel>` itself,
    /// or the first matching element inside it.
    fn element_idx(&self, element: &'static str) -> Result<usize, ChannelError> {
        if element == CHANNEL {
            return Ok(self.channel_idx);
        }
        if matches!(self.events[self.channel_idx], Event::Empty(_)) {
            return Err(ChannelError::MissingElement(element));
        }

        let mut depth = 1usize;
        for (offset, event) in self.events[self.channel_idx + 1..].iter().enumerate() {
            if start_named(event, element).is_some() {
                return Ok(self.channel_idx + 1 + offset);
            }
            match event {
                Event::Start(_) => depth += 1,
                Event::End(_) => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                }
                _ => {}
            }
        }
        Err(ChannelError::MissingElement(element))
    }
}

impl FromStr for Channel {
    type Err = ChannelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Channel::parse(s)
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let xml = self.to_xml().map_err(|_| fmt::Error)?;
        f.write_str(&xml)
    }
}

fn start_at<'a>(event: &'a Event<'static>) -> Option<&'a BytesStart<'static>> {
    match event {
        Event::Start(start) | Event::Empty(start) => Some(start),
        _ => None,
    }
}

fn start_named<'a>(event: &'a Event<'static>, name: &str) -> Option<&'a BytesStart<'static>> {
    start_at(event).filter(|start| start.name().as_ref().eq_ignore_ascii_case(name.as_bytes()))
}

fn find_attribute(start: &BytesStart<'_>, name: &str) -> Result<Option<String>, ChannelError> {
    for attr in start.html_attributes().with_checks(false) {
        let attr = attr.map_err(|e| ChannelError::Parse(e.to_string()))?;
        if attr.key.as_ref().eq_ignore_ascii_case(name.as_bytes()) {
            let value = attr.unescape_value().map_err(|e| ChannelError::Parse(e.to_string()))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

/// Where an attribute's value sits in the raw start tag.
enum ValueSpan {
    Quoted(Range<usize>),
    Unquoted(Range<usize>),
    /// Bare `key` with no `=value`; holds the offset just past the key.
    Bare(usize),
}

/// Byte span of the value of `name` inside the raw content of `start`.
fn value_span(start: &BytesStart<'_>, name: &str) -> Result<Option<ValueSpan>, ChannelError> {
    let raw: &[u8] = start;
    for attr in start.html_attributes().with_checks(false) {
        let attr = attr.map_err(|e| ChannelError::Parse(e.to_string()))?;
        let key = attr.key.as_ref();
        if !key.eq_ignore_ascii_case(name.as_bytes()) {
            continue;
        }
        let key_start = (key.as_ptr() as usize)
            .checked_sub(raw.as_ptr() as usize)
            .filter(|offset| offset + key.len() <= raw.len())
            .ok_or_else(|| ChannelError::Parse(format!("attribute {name} is outside its tag")))?;
        return Ok(Some(scan_value(raw, key_start + key.len())));
    }
    Ok(None)
}

fn scan_value(raw: &[u8], key_end: usize) -> ValueSpan {
    let skip_ws = |mut pos: usize| {
        while pos < raw.len() && raw[pos].is_ascii_whitespace() {
            pos += 1;
        }
        pos
    };

    let eq = skip_ws(key_end);
    if raw.get(eq) != Some(&b'=') {
        return ValueSpan::Bare(key_end);
    }
    let value_start = skip_ws(eq + 1);
    match raw.get(value_start) {
        Some(&quote) if quote == b'"' || quote == b'\'' => {
            let open = value_start + 1;
            let close = raw[open..]
                .iter()
                .position(|&b| b == quote)
                .map_or(raw.len(), |len| open + len);
            ValueSpan::Quoted(open..close)
        }
        _ => {
            let end = raw[value_start..]
                .iter()
                .position(u8::is_ascii_whitespace)
                .map_or(raw.len(), |len| value_start + len);
            ValueSpan::Unquoted(value_start..end)
        }
    }
}

/// Copy of `start` with `name` set to `value`. Only the bytes of that one
/// value change; a missing attribute is appended after the last one.
fn with_attribute(start: &BytesStart<'_>, name: &str, value: &str) -> Result<BytesStart<'static>, ChannelError> {
    let raw: &[u8] = start;
    let escaped = escape(value);
    let mut edited = Vec::with_capacity(raw.len() + name.len() + escaped.len() + 4);

    match value_span(start, name)? {
        Some(ValueSpan::Quoted(span)) => {
            edited.extend_from_slice(&raw[..span.start]);
            edited.extend_from_slice(escaped.as_bytes());
            edited.extend_from_slice(&raw[span.end..]);
        }
        Some(ValueSpan::Unquoted(span)) => {
            edited.extend_from_slice(&raw[..span.start]);
            edited.extend_from_slice(format!("\"{escaped}\"").as_bytes());
            edited.extend_from_slice(&raw[span.end..]);
        }
        Some(ValueSpan::Bare(key_end)) => {
            edited.extend_from_slice(&raw[..key_end]);
            edited.extend_from_slice(format!("=\"{escaped}\"").as_bytes());
            edited.extend_from_slice(&raw[key_end..]);
        }
        None => {
            let end = raw
                .iter()
                .rposition(|b| !b.is_ascii_whitespace())
                .map_or(0, |last| last + 1);
            edited.extend_from_slice(&raw[..end]);
            edited.extend_from_slice(format!(" {name}=\"{escaped}\"").as_bytes());
            edited.extend_from_slice(&raw[end..]);
        }
    }

    let content = String::from_utf8(edited).map_err(|e| ChannelError::Parse(e.to_string()))?;
    Ok(BytesStart::from_content(content, start.name().as_ref().len()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEMPLATE: &str = r#"<?xml version="1.0"?>
<channel
   name="Channel 1"
   description=""
   start_automatically="false"
   logging_level="1"
   database_reconnection_interval="60000"
   maximum_database_reconnections="-1"
   database_timeout_seconds="30"
   action_on_parse_error="skip"
   action_on_db_error="skip">
   <!-- source -->
   <from_llp_listener port="5145" ack_style="fast"/>
   <to_database vmd_path="" database_api="1"/>
</channel>
"#;

    fn channel() -> Channel {
        Channel::parse(TEMPLATE).unwrap()
    }

    #[test]
    fn reads_all_fields() {
        let c = channel();
        assert_eq!(c.name().unwrap(), "Channel 1");
        assert_eq!(c.start_automatically().unwrap(), "false");
        assert_eq!(c.port().unwrap(), "5145");
        assert_eq!(c.database_reconnection_interval().unwrap(), "60000");
        assert_eq!(c.maximum_database_reconnections().unwrap(), "-1");
        assert_eq!(c.database_timeout_seconds().unwrap(), "30");
        assert_eq!(c.action_on_parse_error().unwrap(), "skip");
        assert_eq!(c.action_on_db_error().unwrap(), "skip");
    }

    #[test]
    fn untouched_document_reserializes_verbatim() {
        assert_eq!(channel().to_string(), TEMPLATE);
    }

    #[test]
    fn set_then_get_returns_coerced_string() {
        let mut c = channel();
        c.set_name("channeltest").unwrap();
        c.set_port(12345).unwrap();
        c.set_start_automatically(true).unwrap();
        c.set_database_reconnection_interval(5000).unwrap();
        c.set_maximum_database_reconnections(3).unwrap();
        c.set_database_timeout_seconds(10).unwrap();
        c.set_action_on_parse_error("error").unwrap();
        c.set_action_on_db_error("stop").unwrap();

        assert_eq!(c.name().unwrap(), "channeltest");
        assert_eq!(c.port().unwrap(), "12345");
        assert_eq!(c.start_automatically().unwrap(), "True");
        assert_eq!(c.database_reconnection_interval().unwrap(), "5000");
        assert_eq!(c.maximum_database_reconnections().unwrap(), "3");
        assert_eq!(c.database_timeout_seconds().unwrap(), "10");
        assert_eq!(c.action_on_parse_error().unwrap(), "error");
        assert_eq!(c.action_on_db_error().unwrap(), "stop");

        c.set_start_automatically(false).unwrap();
        assert_eq!(c.start_automatically().unwrap(), "False");
    }

    #[test]
    fn untouched_parts_survive_edits() {
        let mut c = channel();
        c.set_name("renamed").unwrap();
        let out = c.to_string();

        assert!(out.contains(r#"name="renamed""#));
        assert!(out.contains(r#"logging_level="1""#));
        assert!(out.contains(r#"<from_llp_listener port="5145" ack_style="fast"/>"#));
        assert!(out.contains(r#"<to_database vmd_path="" database_api="1"/>"#));
        assert!(out.contains("<!-- source -->"));
        assert!(out.starts_with(r#"<?xml version="1.0"?>"#));

        let reparsed = Channel::parse(&out).unwrap();
        assert_eq!(reparsed.name().unwrap(), "renamed");
        assert_eq!(reparsed.port().unwrap(), "5145");
    }

    #[test]
    fn edit_changes_only_the_value_bytes() {
        let mut c = channel();
        c.set_name("renamed").unwrap();
        assert_eq!(c.to_string(), TEMPLATE.replacen(r#"name="Channel 1""#, r#"name="renamed""#, 1));
    }

    #[test]
    fn layout_and_quote_style_survive_edits() {
        let mut c = Channel::parse("<channel\n   name=\"x\"\n   logging_level=\"1\"/>").unwrap();
        c.set_name("y").unwrap();
        assert_eq!(c.to_string(), "<channel\n   name=\"y\"\n   logging_level=\"1\"/>");

        let mut c = Channel::parse(r#"<channel name='x' description='say "hi"' ></channel>"#).unwrap();
        c.set_name("it's").unwrap();
        assert_eq!(c.to_string(), r#"<channel name='it&apos;s' description='say "hi"' ></channel>"#);
        assert_eq!(c.name().unwrap(), "it's");
        c.set_action_on_db_error("skip").unwrap();
        assert_eq!(
            c.to_string(),
            r#"<channel name='it&apos;s' description='say "hi"' action_on_db_error="skip" ></channel>"#
        );
    }

    #[test]
    fn unquoted_values_are_read_and_replaced() {
        let config = "<channel name=x><from_llp_listener port=5145></from_llp_listener></channel>";
        let mut c = Channel::parse(config).unwrap();
        assert_eq!(c.name().unwrap(), "x");
        assert_eq!(c.port().unwrap(), "5145");

        c.set_port(6000).unwrap();
        c.set_name("two words").unwrap();
        assert_eq!(
            c.to_string(),
            r#"<channel name="two words"><from_llp_listener port="6000"></from_llp_listener></channel>"#
        );
        assert_eq!(c.name().unwrap(), "two words");
    }

    #[test]
    fn bare_attribute_gets_a_value() {
        let mut c = Channel::parse("<channel start_automatically name=\"x\"/>").unwrap();
        c.set_start_automatically(true).unwrap();
        assert_eq!(c.to_string(), r#"<channel start_automatically="True" name="x"/>"#);
    }

    #[test]
    fn editing_port_leaves_channel_tag_alone() {
        let mut c = channel();
        c.set_port(6000).unwrap();
        let out = c.to_string();
        let channel_tag_end = TEMPLATE.find("<!--").unwrap();
        assert_eq!(&out[..channel_tag_end], &TEMPLATE[..channel_tag_end]);
        assert!(out.contains(r#"<from_llp_listener port="6000" ack_style="fast"/>"#));
    }

    #[test]
    fn values_are_escaped_and_unescaped() {
        let mut c = channel();
        c.set_name(r#"a < b & "c""#).unwrap();
        assert_eq!(c.name().unwrap(), r#"a < b & "c""#);
        let out = c.to_string();
        assert!(!out.contains(r#"a < b"#));
        assert_eq!(Channel::parse(&out).unwrap().name().unwrap(), r#"a < b & "c""#);
    }

    #[test]
    fn set_adds_missing_attribute() {
        let mut c = Channel::parse(r#"<channel name="x"></channel>"#).unwrap();
        assert_eq!(
            c.action_on_db_error().unwrap_err(),
            ChannelError::MissingAttribute {
                element: "channel",
                attribute: "action_on_db_error"
            }
        );
        c.set_action_on_db_error("skip").unwrap();
        assert_eq!(c.to_string(), r#"<channel name="x" action_on_db_error="skip"></channel>"#);
    }

    #[test]
    fn missing_listener_is_reported() {
        let mut c = Channel::parse(r#"<channel name="x"><to_database/></channel>"#).unwrap();
        assert_eq!(c.port().unwrap_err(), ChannelError::MissingElement("from_llp_listener"));
        assert_eq!(c.set_port(1).unwrap_err(), ChannelError::MissingElement("from_llp_listener"));

        let empty = Channel::parse(r#"<channel name="x"/>"#).unwrap();
        assert!(matches!(empty.port(), Err(ChannelError::MissingElement(_))));
    }

    #[test]
    fn listener_outside_channel_is_ignored() {
        let c = Channel::parse(r#"<root><channel name="x"></channel><from_llp_listener port="1"/></root>"#).unwrap();
        assert!(c.port().is_err());
    }

    #[test]
    fn missing_channel_element_fails_parse() {
        let err = Channel::parse("<html><body>Login required</body></html>").unwrap_err();
        assert_eq!(err, ChannelError::MissingElement("channel"));
    }

    #[test]
    fn html_style_input_is_tolerated() {
        let c: Channel = r#"<CHANNEL NAME="Upper"><FROM_LLP_LISTENER PORT="7"></from_llp_listener></CHANNEL>"#
            .parse()
            .unwrap();
        assert_eq!(c.name().unwrap(), "Upper");
        assert_eq!(c.port().unwrap(), "7");
    }

    #[test]
    fn generic_field_access() {
        let mut c = channel();
        for field in ChannelField::ALL {
            c.set(field, "1").unwrap();
            assert_eq!(c.get(field).unwrap(), "1", "{field:?}");
        }
        assert_eq!(ChannelField::Port.element(), "from_llp_listener");
        assert_eq!(ChannelField::Name.element(), "channel");
    }
}
