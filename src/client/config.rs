//! Client configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{HttpError, Result};
use crate::net::TlsOptions;

/// Configuration for an [`HttpClient`](crate::HttpClient).
///
/// # Examples
///
/// ```
/// use strand_http::ClientConfig;
///
/// let config = ClientConfig::from_json_str(r#"{ "async_mode": true }"#).unwrap();
/// assert!(config.async_mode);
/// assert!(!config.force_body);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Start a worker thread so requests can be queued with `submit`.
    pub async_mode: bool,
    /// Send body headers and the body for every verb, not only POST/PUT/PATCH.
    pub force_body: bool,
    /// TLS settings for `https` and `wss` URLs.
    pub tls: TlsOptions,
    /// `User-Agent` sent when a request does not set one.
    /// Defaults to [`protocol::user_agent`](crate::protocol::user_agent).
    pub user_agent: Option<String>,
}

impl ClientConfig {
    /// Synchronous-mode configuration.
    pub fn synchronous() -> Self {
        Self::default()
    }

    /// Asynchronous-mode configuration.
    pub fn asynchronous() -> Self {
        ClientConfig {
            async_mode: true,
            ..Self::default()
        }
    }

    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| HttpError::Config(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_json_str(&text)
    }

    pub(crate) fn effective_user_agent(&self) -> String {
        self.user_agent
            .clone()
            .unwrap_or_else(crate::protocol::user_agent)
    }
}
