use thiserror::Error;

use crate::error::TaskLeaseError;

/// Errors raised by the session lifecycle.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Not logged in")]
    NotLoggedIn,
    #[error("Token endpoint rejected request: {error} ({})", .description.as_deref().unwrap_or("no description"))]
    TokenEndpoint {
        error: String,
        description: Option<String>,
    },
    #[error("Access token expired and no refresh token is available")]
    RefreshUnavailable,
    #[error("Managed configuration restrictions are still pending")]
    RestrictionsPending,
    #[error("Session was signed out while the request was in flight")]
    StaleSession,
    #[error("Invalid configuration: {0}")]
    Configuration(String),
    #[error("Runtime unavailable: {0}")]
    Runtime(String),
    #[error("User agent error: {0}")]
    UserAgent(String),
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<reqwest::Error> for AuthError {
    fn from(error: reqwest::Error) -> Self {
        Self::Network(error.to_string())
    }
}

impl From<std::io::Error> for AuthError {
    fn from(error: std::io::Error) -> Self {
        Self::Io(error.to_string())
    }
}

impl From<serde_json::Error> for AuthError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}

impl From<AuthError> for TaskLeaseError {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::NotLoggedIn
            | AuthError::RefreshUnavailable
            | AuthError::StaleSession => TaskLeaseError::NotAuthorized(error.to_string()),
            AuthError::Configuration(msg) => TaskLeaseError::Configuration(msg),
            other => TaskLeaseError::Authentication(other.to_string()),
        }
    }
}
