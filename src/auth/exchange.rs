use std::sync::{Arc, OnceLock};

use chrono::Utc;
use tokio::runtime::{Builder, Handle, Runtime};
use tokio::task::JoinHandle;

use super::error::AuthError;
use super::session::Session;
use super::state::{Epoch, SessionState};
use super::token_endpoint::{TokenEndpoint, TokenRequest};

static BACKGROUND_RUNTIME: OnceLock<Option<Runtime>> = OnceLock::new();

/// Runtime used when neither the caller nor the constructor had one.
fn background_runtime() -> Option<Handle> {
    BACKGROUND_RUNTIME
        .get_or_init(|| {
            match Builder::new_multi_thread()
                .worker_threads(1)
                .thread_name("tasklease-exchange")
                .enable_all()
                .build()
            {
                Ok(runtime) => Some(runtime),
                Err(err) => {
                    tracing::error!(error = %err, "failed to start background runtime");
                    None
                }
            }
        })
        .as_ref()
        .map(|runtime| runtime.handle().clone())
}

/// Performs the code-for-token exchange off the caller's flow of control.
///
/// The exchange runs on the caller's tokio runtime when there is one, else
/// on the runtime active when the exchanger was built, else on a small
/// background runtime owned by this crate.
#[derive(Clone)]
pub struct TokenExchanger {
    endpoint: TokenEndpoint,
    state: Arc<SessionState>,
    runtime: Option<Handle>,
}

impl TokenExchanger {
    pub fn new(endpoint: TokenEndpoint, state: Arc<SessionState>) -> Self {
        Self {
            endpoint,
            state,
            runtime: Handle::try_current().ok(),
        }
    }

    fn spawn_handle(&self) -> Result<Handle, AuthError> {
        if let Ok(current) = Handle::try_current() {
            return Ok(current);
        }
        if let Some(runtime) = &self.runtime {
            return Ok(runtime.clone());
        }
        tracing::debug!("no tokio runtime in scope, using background runtime");
        background_runtime()
            .ok_or_else(|| AuthError::Runtime("no tokio runtime available".to_string()))
    }

    /// Start the exchange and return its completion handle.
    ///
    /// On success the merged session has already been persisted and observers
    /// notified by the time the handle resolves. Callable with or without a
    /// tokio runtime in scope.
    pub fn exchange(
        &self,
        provisional: Session,
        request: TokenRequest,
    ) -> Result<JoinHandle<Result<Session, AuthError>>, AuthError> {
        let runtime = self.spawn_handle()?;
        let endpoint = self.endpoint.clone();
        let state = self.state.clone();
        let epoch = state.epoch();
        Ok(runtime.spawn(run_exchange(endpoint, state, epoch, provisional, request)))
    }
}

async fn run_exchange(
    endpoint: TokenEndpoint,
    state: Arc<SessionState>,
    epoch: Epoch,
    provisional: Session,
    request: TokenRequest,
) -> Result<Session, AuthError> {
    let response = match endpoint.exchange_code(&request).await {
        Ok(response) => response,
        Err(err) => {
            tracing::warn!(error = %err, "token exchange failed");
            return Err(err);
        }
    };
    let session = provisional.updated_with(&response, Utc::now());
    state.commit(epoch, session.clone())?;
    tracing::info!(
        has_refresh_token = session.refresh_token.is_some(),
        has_id_token = session.id_token.is_some(),
        expires_at = ?session.expires_at,
        "token exchange completed"
    );
    Ok(session)
}
