//! Client configuration.
//!
//! Defaults match the trial install of the Iguana server, which is rarely
//! what a real deployment uses; every field can be overridden in code or
//! from a TOML file.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ApiError;

pub const DEFAULT_BASE_URL: &str = "http://localhost:6543/";
pub const DEFAULT_USERNAME: &str = "admin";
pub const DEFAULT_PASSWORD: &str = "password";

/// Connection settings for an Iguana server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_username")]
    pub username: String,

    #[serde(default = "default_password")]
    pub password: String,

    /// Overall per-request timeout in seconds. `None` or `0` leaves it to
    /// the HTTP stack's default.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_username() -> String {
    DEFAULT_USERNAME.to_string()
}

fn default_password() -> String {
    DEFAULT_PASSWORD.to_string()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            username: default_username(),
            password: default_password(),
            timeout_secs: None,
        }
    }
}

impl ClientConfig {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    /// Sub-second parts round up to the next whole second.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        let secs = timeout.as_secs() + u64::from(timeout.subsec_nanos() > 0);
        self.timeout_secs = Some(secs).filter(|&secs| secs > 0);
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.filter(|&secs| secs > 0).map(Duration::from_secs)
    }

    /// Parse a config from TOML. Missing keys fall back to the defaults.
    pub fn from_toml_str(content: &str) -> Result<Self, ApiError> {
        toml::from_str(content).map_err(|e| ApiError::Config(format!("failed to parse config: {e}")))
    }

    /// Load a config from a TOML file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ApiError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| ApiError::Config(format!("failed to read {}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }
}
