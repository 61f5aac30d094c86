use std::future::Future;
use std::sync::Arc;

use chrono::Utc;

use super::error::AuthError;
use super::session::Session;
use super::state::SessionState;
use super::token_endpoint::TokenEndpoint;

/// Tokens handed to a guarded action. The access token is never expired.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FreshTokens {
    pub access_token: String,
    pub id_token: Option<String>,
}

/// Gatekeeper every protected call goes through.
///
/// # Example
/// ```no_run
/// # async fn example(guard: &tasklease::auth::SessionGuard) {
/// let status = guard
///     .with_fresh_token(|tokens| async move {
///         match tokens {
///             Ok(tokens) => format!("token of {} bytes", tokens.access_token.len()),
///             Err(err) => format!("not authorized: {err}"),
///         }
///     })
///     .await;
/// # }
/// ```
#[derive(Clone)]
pub struct SessionGuard {
    state: Arc<SessionState>,
    endpoint: TokenEndpoint,
}

impl SessionGuard {
    pub fn new(state: Arc<SessionState>, endpoint: TokenEndpoint) -> Self {
        Self { state, endpoint }
    }

    /// Run `action` with a non-expired access token, refreshing first if needed.
    ///
    /// The refresh (and its persistence) completes before `action` starts; on
    /// failure `action` receives the error instead of a token.
    pub async fn with_fresh_token<F, Fut, T>(&self, action: F) -> T
    where
        F: FnOnce(Result<FreshTokens, AuthError>) -> Fut,
        Fut: Future<Output = T>,
    {
        let tokens = self.fresh_tokens().await;
        action(tokens).await
    }

    /// Resolve a usable access token for the current session.
    pub async fn fresh_tokens(&self) -> Result<FreshTokens, AuthError> {
        let epoch = self.state.epoch();
        let session = self.state.current().ok_or(AuthError::NotLoggedIn)?;

        if !session.needs_token_refresh(Utc::now()) {
            if let Some(tokens) = tokens_of(&session) {
                return Ok(tokens);
            }
        }

        let Some(refresh_token) = session.refresh_token.as_deref() else {
            if session.access_token.is_none() {
                return Err(AuthError::NotLoggedIn);
            }
            tracing::warn!("access token expired and no refresh token is stored");
            return Err(AuthError::RefreshUnavailable);
        };

        tracing::debug!(expires_at = ?session.expires_at, "refreshing access token");
        let response = match self.endpoint.refresh(refresh_token).await {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(error = %err, "token refresh failed");
                return Err(err);
            }
        };
        let refreshed = session.updated_with(&response, Utc::now());
        match self.state.commit_refresh(epoch, &session, refreshed.clone()) {
            Ok(()) => {}
            Err(AuthError::StaleSession) if self.state.epoch() == epoch => {
                // Replaced by a newer session while refreshing; use that one.
                return self
                    .state
                    .current()
                    .filter(|current| !current.needs_token_refresh(Utc::now()))
                    .as_ref()
                    .and_then(tokens_of)
                    .ok_or(AuthError::StaleSession);
            }
            Err(err) => return Err(err),
        }
        tracing::info!(expires_at = ?refreshed.expires_at, "access token refreshed");

        tokens_of(&refreshed)
            .ok_or_else(|| AuthError::InvalidResponse("refresh returned no access token".to_string()))
    }
}

fn tokens_of(session: &Session) -> Option<FreshTokens> {
    Some(FreshTokens {
        access_token: session.access_token.clone()?,
        id_token: session.id_token.clone(),
    })
}
