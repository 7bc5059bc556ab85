//! Server version as reported by `current_version`.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::error::ApiError;

/// `major.minor.build[.ext]`.
///
/// Ordering compares the numeric parts first; a version without a build
/// extension sorts before the same version with one. Extensions that are
/// both integers compare numerically, anything else as text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
pub struct Version {
    #[serde(rename = "Major")]
    pub major: u32,
    #[serde(rename = "Minor")]
    pub minor: u32,
    #[serde(rename = "Build")]
    pub build: u32,
    #[serde(rename = "BuildExt", default, deserialize_with = "build_ext")]
    pub build_ext: Option<String>,
}

/// Empty strings, null and numeric zero all mean "no extension".
fn build_ext<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) if !s.is_empty() => Some(s),
        Some(Value::Number(n)) if n.as_u64() != Some(0) => Some(n.to_string()),
        _ => None,
    })
}

impl Version {
    pub fn new(major: u32, minor: u32, build: u32, build_ext: Option<&str>) -> Self {
        Self {
            major,
            minor,
            build,
            build_ext: build_ext.filter(|ext| !ext.is_empty()).map(str::to_string),
        }
    }

    /// Decode the `current_version` JSON payload.
    pub fn from_json(body: &str) -> Result<Self, ApiError> {
        serde_json::from_str(body).map_err(|e| ApiError::Deserialization(e.to_string()))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.build)
            .cmp(&(other.major, other.minor, other.build))
            .then_with(|| compare_ext(self.build_ext.as_deref(), other.build_ext.as_deref()))
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Ties between numerically equal extensions (`"01"` and `"1"`) fall back
/// to text so the order stays consistent with `Eq`.
fn compare_ext(a: Option<&str>, b: Option<&str>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => match (a.parse::<u64>(), b.parse::<u64>()) {
            (Ok(x), Ok(y)) => x.cmp(&y).then_with(|| a.cmp(b)),
            _ => a.cmp(b),
        },
        _ => a.cmp(&b),
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.build)?;
        if let Some(ext) = &self.build_ext {
            write!(f, ".{ext}")?;
        }
        Ok(())
    }
}

impl FromStr for Version {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || ApiError::Deserialization(format!("invalid version string: {s:?}"));
        let mut parts = s.splitn(4, '.');
        let mut number = || -> Result<u32, ApiError> {
            parts.next().and_then(|p| p.parse().ok()).ok_or_else(bad)
        };
        let major = number()?;
        let minor = number()?;
        let build = number()?;
        let ext = parts.next();
        if ext == Some("") {
            return Err(bad());
        }
        Ok(Version::new(major, minor, build, ext))
    }
}
