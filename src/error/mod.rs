//! Error types for tasklease.

use thiserror::Error;

/// Crate-level error returned by the host-facing facades.
///
/// Session-lifecycle failures convert into it from [`AuthError`](crate::auth::AuthError).
#[derive(Error, Debug)]
pub enum TaskLeaseError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Not authorized: {0}")]
    NotAuthorized(String),
}

impl TaskLeaseError {
    /// Whether the user has to go through authorization again to recover.
    pub fn requires_authorization(&self) -> bool {
        matches!(self, Self::NotAuthorized(_) | Self::Authentication(_))
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, TaskLeaseError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthError;

    #[test]
    fn stale_session_maps_to_not_authorized() {
        let err: TaskLeaseError = AuthError::StaleSession.into();
        assert!(matches!(err, TaskLeaseError::NotAuthorized(_)));
        assert!(err.requires_authorization());
    }

    #[test]
    fn token_endpoint_error_maps_to_authentication() {
        let err: TaskLeaseError = AuthError::TokenEndpoint {
            error: "invalid_grant".to_string(),
            description: Some("token expired".to_string()),
        }
        .into();
        match err {
            TaskLeaseError::Authentication(msg) => {
                assert!(msg.contains("invalid_grant"));
                assert!(msg.contains("token expired"));
            }
            other => panic!("expected Authentication, got {other:?}"),
        }
    }

    #[test]
    fn configuration_error_does_not_require_authorization() {
        let err = TaskLeaseError::Configuration("bad url".to_string());
        assert!(!err.requires_authorization());
    }
}
