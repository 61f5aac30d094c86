//! Client configuration (code > env > defaults).

pub mod managed;

pub use managed::{LoginHintSource, ManagedConfig, WatchedManagedConfig};

use std::path::PathBuf;

use bon::Builder;
use reqwest::Url;

use crate::error::TaskLeaseError;

pub const DEFAULT_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
pub const DEFAULT_TOKEN_URL: &str = "https://www.googleapis.com/oauth2/v4/token";
pub const DEFAULT_CLIENT_ID: &str =
    "511828570984-fuprh0cm7665emlne3rnf9pk34kkn86s.apps.googleusercontent.com";
pub const DEFAULT_REDIRECT_URI: &str = "com.google.codelabs.appauth:/oauth2callback";
pub const DEFAULT_SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/taskqueue",
    "https://www.googleapis.com/auth/taskqueue.consumer",
];

/// OAuth client configuration for the single authorization server.
///
/// # Example
/// ```
/// use tasklease::config::ClientConfig;
///
/// let config = ClientConfig::builder()
///     .client_id("my-client")
///     .token_url("http://127.0.0.1:8080/token")
///     .build();
/// assert_eq!(config.client_id, "my-client");
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Builder)]
pub struct ClientConfig {
    #[builder(into, default = DEFAULT_AUTH_URL.to_string())]
    pub auth_url: String,
    #[builder(into, default = DEFAULT_TOKEN_URL.to_string())]
    pub token_url: String,
    #[builder(into, default = DEFAULT_CLIENT_ID.to_string())]
    pub client_id: String,
    #[builder(into, default = DEFAULT_REDIRECT_URI.to_string())]
    pub redirect_uri: String,
    #[builder(default = default_scopes())]
    pub scopes: Vec<String>,
    /// Directory holding the persisted session; `None` means `~/.tasklease`.
    pub store_dir: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl ClientConfig {
    /// Load overrides from environment variables (and `.env` if present).
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        let mut config = Self::default();
        if let Ok(value) = std::env::var("TASKLEASE_AUTH_URL") {
            config.auth_url = value;
        }
        if let Ok(value) = std::env::var("TASKLEASE_TOKEN_URL") {
            config.token_url = value;
        }
        if let Ok(value) = std::env::var("TASKLEASE_CLIENT_ID") {
            config.client_id = value;
        }
        if let Ok(value) = std::env::var("TASKLEASE_REDIRECT_URI") {
            config.redirect_uri = value;
        }
        if let Ok(value) = std::env::var("TASKLEASE_SCOPES") {
            config.scopes = value.split_whitespace().map(str::to_string).collect();
        }
        if let Some(value) = std::env::var_os("TASKLEASE_STORE_DIR") {
            config.store_dir = Some(PathBuf::from(value));
        }
        config
    }

    pub fn with_auth_url(mut self, url: impl Into<String>) -> Self {
        self.auth_url = url.into();
        self
    }

    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }

    pub fn with_store_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.store_dir = Some(dir.into());
        self
    }

    /// Space-joined scope parameter.
    pub fn scope_param(&self) -> String {
        self.scopes.join(" ")
    }

    /// Check that every endpoint parses as a URL.
    pub fn validate(&self) -> Result<(), TaskLeaseError> {
        for (name, value) in [
            ("auth_url", &self.auth_url),
            ("token_url", &self.token_url),
            ("redirect_uri", &self.redirect_uri),
        ] {
            Url::parse(value).map_err(|err| {
                TaskLeaseError::Configuration(format!("invalid {name} {value:?}: {err}"))
            })?;
        }
        if self.client_id.trim().is_empty() {
            return Err(TaskLeaseError::Configuration(
                "client_id must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_scopes() -> Vec<String> {
    DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect()
}
