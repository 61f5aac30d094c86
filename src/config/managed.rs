//! Administrator-managed configuration supplied by the host platform.

use tokio::sync::watch;

/// Snapshot of the managed configuration relevant to authorization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManagedConfig {
    pub login_hint: Option<String>,
    /// The host has not finished applying restrictions; sign-in must wait.
    pub restrictions_pending: bool,
}

/// External source of the login hint.
///
/// The host re-reads its managed configuration on change notifications and
/// publishes the result; the core only reads [`LoginHintSource::current`]
/// when an authorization attempt starts.
pub trait LoginHintSource: Send + Sync {
    fn current(&self) -> ManagedConfig;
    fn subscribe(&self) -> watch::Receiver<ManagedConfig>;
}

/// [`LoginHintSource`] backed by a watch channel the host writes to.
///
/// # Example
/// ```
/// use tasklease::config::{LoginHintSource, ManagedConfig, WatchedManagedConfig};
///
/// let source = WatchedManagedConfig::new(ManagedConfig::default());
/// source.publish(ManagedConfig {
///     login_hint: Some("user@example.com".to_string()),
///     restrictions_pending: false,
/// });
/// assert_eq!(source.current().login_hint.as_deref(), Some("user@example.com"));
/// ```
#[derive(Debug)]
pub struct WatchedManagedConfig {
    tx: watch::Sender<ManagedConfig>,
}

impl WatchedManagedConfig {
    pub fn new(initial: ManagedConfig) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    pub fn with_login_hint(hint: impl Into<String>) -> Self {
        Self::new(ManagedConfig {
            login_hint: Some(hint.into()),
            restrictions_pending: false,
        })
    }

    /// Replace the current configuration, notifying subscribers if it changed.
    pub fn publish(&self, config: ManagedConfig) {
        self.tx.send_if_modified(|current| {
            if *current == config {
                return false;
            }
            tracing::debug!(
                has_login_hint = config.login_hint.is_some(),
                restrictions_pending = config.restrictions_pending,
                "managed configuration changed"
            );
            *current = config;
            true
        });
    }
}

impl Default for WatchedManagedConfig {
    fn default() -> Self {
        Self::new(ManagedConfig::default())
    }
}

impl LoginHintSource for WatchedManagedConfig {
    fn current(&self) -> ManagedConfig {
        self.tx.borrow().clone()
    }

    fn subscribe(&self) -> watch::Receiver<ManagedConfig> {
        self.tx.subscribe()
    }
}
