use http::HeaderName;
use serde::Deserialize;
use std::fmt;
use thiserror::Error;

/// Environment variable consulted when no explicit target URL is configured.
pub const TARGET_URL_ENV: &str = "GRANITE_RETRY_URL";
pub const DEFAULT_TARGET_URL: &str = "http://host.docker.internal:3000";
pub const STATUS_API_URL_ENV: &str = "BITBUCKET_URL";
pub const STATUS_API_TOKEN_ENV: &str = "ACCESS_TOKEN";

#[derive(Error, Debug, PartialEq)]
pub enum ValidationError {
    #[error("Port cannot be 0")]
    InvalidPort,

    #[error("Invalid remote user header name: {0}")]
    InvalidHeaderName(String),
}

/// Retry proxy configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Config {
    /// Listener for retry trigger requests
    #[serde(default = "default_listener")]
    pub listener: Listener,
    /// Admin listener for health and readiness checks
    #[serde(default = "default_admin_listener")]
    pub admin_listener: Listener,
    /// Explicit downstream target. Takes precedence over `GRANITE_RETRY_URL`.
    pub target_url: Option<String>,
    /// Header carrying the user authenticated by the fronting server.
    /// Only used for logging.
    #[serde(default = "default_remote_user_header")]
    pub remote_user_header: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            listener: default_listener(),
            admin_listener: default_admin_listener(),
            target_url: None,
            remote_user_header: default_remote_user_header(),
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.listener.validate()?;
        self.admin_listener.validate()?;
        self.remote_user_header_name()?;
        Ok(())
    }

    pub fn remote_user_header_name(&self) -> Result<HeaderName, ValidationError> {
        HeaderName::from_bytes(self.remote_user_header.as_bytes())
            .map_err(|_| ValidationError::InvalidHeaderName(self.remote_user_header.clone()))
    }

    /// Resolves the settings that stay fixed for the lifetime of the process.
    ///
    /// `env` looks up an environment variable by name. Empty values are
    /// treated the same as unset ones.
    pub fn resolve<F>(&self, env: F) -> RelayConfig
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = |name: &str| env(name).filter(|v| !v.is_empty());

        let target_url = self
            .target_url
            .clone()
            .filter(|url| !url.is_empty())
            .or_else(|| env(TARGET_URL_ENV))
            .unwrap_or_else(|| DEFAULT_TARGET_URL.to_string());

        RelayConfig {
            target_url,
            status_api: StatusApiConfig {
                base_url: env(STATUS_API_URL_ENV),
                access_token: env(STATUS_API_TOKEN_ENV),
            },
        }
    }
}

/// Reads a variable from the process environment.
pub fn process_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

/// Network listener configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Listener {
    /// Host address to bind to (e.g., "0.0.0.0" or "127.0.0.1")
    pub host: String,
    /// Port number to listen on
    pub port: u16,
}

impl Listener {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.port == 0 {
            return Err(ValidationError::InvalidPort);
        }
        Ok(())
    }
}

fn default_listener() -> Listener {
    Listener {
        host: "0.0.0.0".into(),
        port: 8080,
    }
}

fn default_admin_listener() -> Listener {
    Listener {
        host: "127.0.0.1".into(),
        port: 8081,
    }
}

fn default_remote_user_header() -> String {
    "x-remote-user".into()
}

/// Settings resolved once at startup and shared read-only by every request.
#[derive(Clone, Debug, PartialEq)]
pub struct RelayConfig {
    pub target_url: String,
    pub status_api: StatusApiConfig,
}

#[derive(Clone, Default, PartialEq)]
pub struct StatusApiConfig {
    pub base_url: Option<String>,
    pub access_token: Option<String>,
}

impl StatusApiConfig {
    /// Returns the base URL and token when both are set.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        Some((self.base_url.as_deref()?, self.access_token.as_deref()?))
    }
}

impl fmt::Debug for StatusApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatusApiConfig")
            .field("base_url", &self.base_url)
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}
