use std::sync::Arc;

use tokio::sync::watch;

use super::error::AuthError;
use super::exchange::TokenExchanger;
use super::guard::SessionGuard;
use super::redirect::{RedirectEvent, RedirectHandler, RedirectOutcome, RedirectStatus};
use super::request::{AuthorizationRequest, PendingAuthorization, UserAgent};
use super::session::Session;
use super::state::{Capabilities, SessionState};
use super::store::{FileSessionStore, SessionStore, SessionStoreConfig};
use super::token_endpoint::TokenEndpoint;
use crate::config::{ClientConfig, LoginHintSource};
use crate::error;

/// Facade wiring the session lifecycle for a host application.
///
/// All presentation decisions belong to the caller. `AuthService` only
/// returns typed results and publishes capability changes.
///
/// # Example
/// ```no_run
/// use std::sync::Arc;
/// use tasklease::auth::{AuthError, AuthService, FileSessionStore, SessionStoreConfig, UserAgent};
/// use tasklease::config::{ClientConfig, WatchedManagedConfig};
///
/// struct Browser;
///
/// #[async_trait::async_trait]
/// impl UserAgent for Browser {
///     async fn launch(&self, url: &reqwest::Url) -> Result<(), AuthError> {
///         println!("open {url}");
///         Ok(())
///     }
/// }
///
/// let store = Arc::new(FileSessionStore::new(SessionStoreConfig::new("/tmp/tasklease".into())));
/// let svc = AuthService::new(
///     ClientConfig::default(),
///     store,
///     Arc::new(Browser),
///     Arc::new(WatchedManagedConfig::default()),
/// )?;
/// assert!(!svc.is_authorized());
/// # Ok::<(), tasklease::error::TaskLeaseError>(())
/// ```
pub struct AuthService {
    config: ClientConfig,
    state: Arc<SessionState>,
    user_agent: Arc<dyn UserAgent>,
    managed: Arc<dyn LoginHintSource>,
    redirects: RedirectHandler,
    guard: SessionGuard,
}

impl AuthService {
    /// Build the service and restore whatever session the store holds.
    ///
    /// Fails with `TaskLeaseError::Configuration` when an endpoint or the
    /// redirect target does not parse, or the client id is blank.
    pub fn new(
        config: ClientConfig,
        store: Arc<dyn SessionStore>,
        user_agent: Arc<dyn UserAgent>,
        managed: Arc<dyn LoginHintSource>,
    ) -> error::Result<Self> {
        config.validate()?;
        let state = Arc::new(SessionState::restore(store));
        let endpoint = TokenEndpoint::new(&config);
        let exchanger = TokenExchanger::new(endpoint.clone(), state.clone());
        let redirects = RedirectHandler::new(config.redirect_uri.clone(), exchanger);
        let guard = SessionGuard::new(state.clone(), endpoint);
        Ok(Self {
            config,
            state,
            user_agent,
            managed,
            redirects,
            guard,
        })
    }

    /// Build the service with a file store under `config.store_dir` (or `~/.tasklease`).
    pub fn with_file_store(
        config: ClientConfig,
        user_agent: Arc<dyn UserAgent>,
        managed: Arc<dyn LoginHintSource>,
    ) -> error::Result<Self> {
        let dir = config
            .store_dir
            .clone()
            .unwrap_or_else(SessionStoreConfig::default_dir);
        let store = Arc::new(FileSessionStore::new(SessionStoreConfig::new(dir)));
        Self::new(config, store, user_agent, managed)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Start a new authorization attempt in the external user agent.
    ///
    /// The login hint is read from the managed configuration at this moment.
    pub async fn begin_authorization(&self) -> Result<PendingAuthorization, AuthError> {
        let managed = self.managed.current();
        if managed.restrictions_pending {
            tracing::warn!("managed restrictions pending, refusing to start authorization");
            return Err(AuthError::RestrictionsPending);
        }
        let request = AuthorizationRequest::new(&self.config, managed.login_hint);
        self.redirects.expect(request.pending());
        match request.launch(self.user_agent.as_ref()).await {
            Ok(pending) => Ok(pending),
            Err(err) => {
                self.redirects.reset();
                Err(err)
            }
        }
    }

    /// Re-arm the redirect handler for an attempt launched by an earlier
    /// instance of the host.
    ///
    /// Replaces any attempt this service is currently waiting on.
    pub fn resume_authorization(&self, pending: PendingAuthorization) {
        tracing::info!(request_id = %pending.request_id, "resuming pending authorization");
        self.redirects.expect(pending);
    }

    /// Feed an inbound redirect to the handler.
    pub fn handle_redirect(&self, event: &RedirectEvent) -> RedirectOutcome {
        self.redirects.handle(event)
    }

    pub fn redirect_status(&self) -> RedirectStatus {
        self.redirects.status()
    }

    pub fn session(&self) -> Option<Session> {
        self.state.current()
    }

    pub fn is_authorized(&self) -> bool {
        self.state.is_authorized()
    }

    pub fn capabilities(&self) -> Capabilities {
        self.state.capabilities()
    }

    /// Notifications for re-evaluating post-authorization capabilities.
    pub fn subscribe(&self) -> watch::Receiver<Capabilities> {
        self.state.subscribe()
    }

    pub fn guard(&self) -> &SessionGuard {
        &self.guard
    }

    /// Forget the session. In-flight exchanges and refreshes are discarded.
    pub fn sign_out(&self) {
        self.state.sign_out();
    }
}
