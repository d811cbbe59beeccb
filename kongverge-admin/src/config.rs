//! Admin API connection settings.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_ADMIN_URI: &str = "http://localhost:8001";

#[derive(Debug, Error)]
pub enum AdminConfigError {
    #[error("invalid admin uri {uri}: {reason}")]
    InvalidUri { uri: String, reason: String },

    #[error("invalid value for header {name}")]
    InvalidHeader { name: &'static str },

    #[error("failed to build http client: {0}")]
    Build(#[from] reqwest::Error),
}

/// How to reach and authenticate against the Admin API.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminConfig {
    pub admin_uri: String,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Sent as the `apikey` header.
    pub api_key: Option<String>,
    /// Sent as the `kong-admin-token` header.
    pub admin_token: Option<String>,
    pub tls_skip_verify: bool,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            admin_uri: DEFAULT_ADMIN_URI.to_string(),
            username: None,
            password: None,
            api_key: None,
            admin_token: None,
            tls_skip_verify: false,
        }
    }
}

// Credentials stay out of logs.
impl std::fmt::Debug for AdminConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "<redacted>");
        f.debug_struct("AdminConfig")
            .field("admin_uri", &self.admin_uri)
            .field("username", &self.username)
            .field("password", &redact(&self.password))
            .field("api_key", &redact(&self.api_key))
            .field("admin_token", &redact(&self.admin_token))
            .field("tls_skip_verify", &self.tls_skip_verify)
            .finish()
    }
}
