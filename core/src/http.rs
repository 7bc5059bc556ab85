//! HTTP transport types for the host-does-IO pattern.
//!
//! # Design
//! These types describe HTTP requests and responses as plain data. The
//! client builds `HttpRequest` values and parses `HttpResponse` values
//! without touching the network; a `Transport` (or a foreign host through
//! the FFI crate) performs the round-trip.
//!
//! Every Iguana control endpoint is a form POST, so the request carries no
//! method field. All fields use owned types so values can cross FFI
//! boundaries without lifetime concerns.

/// Content type sent with every request body.
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// A POST request described as plain data.
///
/// Built by `IguanaClient::build_*` methods. `body` is the form-encoded
/// payload and is empty when the endpoint takes no arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpRequest {
    /// Look up a header by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// An HTTP response described as plain data.
///
/// Constructed by the transport after executing an `HttpRequest`, then
/// passed to `IguanaClient::parse_*` methods.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    /// Shorthand for a 200 response with no headers.
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_lookup_ignores_case() {
        let req = HttpRequest {
            url: "http://localhost:6543/status".to_string(),
            headers: vec![("Content-Type".to_string(), FORM_CONTENT_TYPE.to_string())],
            body: String::new(),
        };
        assert_eq!(req.header("content-type"), Some(FORM_CONTENT_TYPE));
        assert!(req.header("authorization").is_none());
    }

    #[test]
    fn success_range() {
        assert!(HttpResponse::ok("").is_success());
        let mut resp = HttpResponse::ok("");
        resp.status = 401;
        assert!(!resp.is_success());
        resp.status = 204;
        assert!(resp.is_success());
    }
}
