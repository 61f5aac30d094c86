use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::watch;

use super::error::AuthError;
use super::session::Session;
use super::store::SessionStore;

/// What the host may offer the user given the current session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub can_call_api: bool,
    pub can_sign_out: bool,
}

impl Capabilities {
    fn for_session(session: Option<&Session>) -> Self {
        let authorized = session.is_some_and(Session::is_authorized);
        Self {
            can_call_api: authorized,
            can_sign_out: authorized,
        }
    }
}

/// Marker captured before an asynchronous operation starts.
///
/// A result is only applied if no sign-out happened in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Epoch(u64);

struct Inner {
    session: Option<Session>,
    epoch: u64,
}

/// In-memory owner of the single session, kept in sync with the store.
pub struct SessionState {
    inner: Mutex<Inner>,
    store: Arc<dyn SessionStore>,
    capabilities: watch::Sender<Capabilities>,
}

impl SessionState {
    /// Build the state from whatever the store currently holds.
    pub fn restore(store: Arc<dyn SessionStore>) -> Self {
        let session = store.load();
        let (capabilities, _rx) = watch::channel(Capabilities::for_session(session.as_ref()));
        tracing::debug!(restored = session.is_some(), "session state initialized");
        Self {
            inner: Mutex::new(Inner { session, epoch: 0 }),
            store,
            capabilities,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn current(&self) -> Option<Session> {
        self.lock().session.clone()
    }

    pub fn epoch(&self) -> Epoch {
        Epoch(self.lock().epoch)
    }

    pub fn is_authorized(&self) -> bool {
        self.lock().session.as_ref().is_some_and(Session::is_authorized)
    }

    pub fn capabilities(&self) -> Capabilities {
        *self.capabilities.borrow()
    }

    /// Receive a notification whenever the capabilities change.
    pub fn subscribe(&self) -> watch::Receiver<Capabilities> {
        self.capabilities.subscribe()
    }

    /// Replace and persist the session, unless a sign-out happened since `epoch`.
    pub fn commit(&self, epoch: Epoch, session: Session) -> Result<(), AuthError> {
        let inner = self.lock();
        if inner.epoch != epoch.0 {
            tracing::info!("discarding session update that completed after sign-out");
            return Err(AuthError::StaleSession);
        }
        self.apply(inner, session);
        Ok(())
    }

    /// Like [`commit`](Self::commit), but only if the current session is
    /// still `base`.
    ///
    /// A refresh that raced with a newer exchange or refresh is dropped so it
    /// cannot overwrite the newer tokens.
    pub fn commit_refresh(
        &self,
        epoch: Epoch,
        base: &Session,
        session: Session,
    ) -> Result<(), AuthError> {
        let inner = self.lock();
        if inner.epoch != epoch.0 {
            tracing::info!("discarding refresh that completed after sign-out");
            return Err(AuthError::StaleSession);
        }
        if inner.session.as_ref() != Some(base) {
            tracing::info!("discarding refresh for a session that was replaced meanwhile");
            return Err(AuthError::StaleSession);
        }
        self.apply(inner, session);
        Ok(())
    }

    fn apply(&self, mut inner: MutexGuard<'_, Inner>, session: Session) {
        if let Err(err) = self.store.save(&session) {
            tracing::warn!(error = %err, "failed to persist session");
        }
        let capabilities = Capabilities::for_session(Some(&session));
        inner.session = Some(session);
        drop(inner);
        self.publish(capabilities);
    }

    /// Forget the session and invalidate every in-flight completion.
    pub fn sign_out(&self) {
        let mut inner = self.lock();
        inner.epoch += 1;
        inner.session = None;
        if let Err(err) = self.store.clear() {
            tracing::warn!(error = %err, "failed to clear stored session");
        }
        drop(inner);
        tracing::info!("signed out");
        self.publish(Capabilities::default());
    }

    fn publish(&self, capabilities: Capabilities) {
        self.capabilities.send_if_modified(|current| {
            if *current == capabilities {
                return false;
            }
            *current = capabilities;
            true
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::store::{FileSessionStore, SessionStoreConfig};
    use chrono::{Duration, Utc};
    use tempfile::TempDir;

    fn temp_state() -> (TempDir, Arc<FileSessionStore>, SessionState) {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(FileSessionStore::new(SessionStoreConfig::new(
            dir.path().to_path_buf(),
        )));
        let state = SessionState::restore(store.clone());
        (dir, store, state)
    }

    fn authorized_session(token: &str) -> Session {
        Session::default()
            .with_access_token(token, Some(Utc::now() + Duration::hours(1)))
            .with_refresh_token("refresh")
    }

    #[test]
    fn restore_picks_up_stored_session() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(FileSessionStore::new(SessionStoreConfig::new(
            dir.path().to_path_buf(),
        )));
        store.save(&authorized_session("stored")).unwrap();

        let state = SessionState::restore(store);
        assert!(state.is_authorized());
        assert!(state.capabilities().can_call_api);
    }

    #[test]
    fn commit_persists_and_updates_capabilities() {
        let (_dir, store, state) = temp_state();
        assert!(!state.capabilities().can_call_api);

        state.commit(state.epoch(), authorized_session("a")).unwrap();

        assert_eq!(store.load().unwrap().access_token.as_deref(), Some("a"));
        assert_eq!(
            state.capabilities(),
            Capabilities {
                can_call_api: true,
                can_sign_out: true
            }
        );
    }

    #[test]
    fn commit_after_sign_out_is_rejected() {
        let (_dir, store, state) = temp_state();
        let epoch = state.epoch();
        state.sign_out();

        let result = state.commit(epoch, authorized_session("late"));

        assert!(matches!(result, Err(AuthError::StaleSession)));
        assert!(state.current().is_none());
        assert!(store.load().is_none());
    }

    #[test]
    fn refresh_of_replaced_session_is_rejected() {
        let (_dir, store, state) = temp_state();
        let base = authorized_session("old");
        state.commit(state.epoch(), base.clone()).unwrap();
        let epoch = state.epoch();

        state.commit(epoch, authorized_session("reauthorized")).unwrap();
        let result = state.commit_refresh(epoch, &base, authorized_session("refreshed-old"));

        assert!(matches!(result, Err(AuthError::StaleSession)));
        assert_eq!(
            store.load().unwrap().access_token.as_deref(),
            Some("reauthorized")
        );
    }

    #[test]
    fn refresh_of_current_session_is_applied() {
        let (_dir, store, state) = temp_state();
        let base = authorized_session("old");
        state.commit(state.epoch(), base.clone()).unwrap();

        state
            .commit_refresh(state.epoch(), &base, authorized_session("refreshed"))
            .unwrap();

        assert_eq!(store.load().unwrap().access_token.as_deref(), Some("refreshed"));
    }

    #[test]
    fn sign_out_clears_store_and_notifies() {
        let (_dir, store, state) = temp_state();
        state.commit(state.epoch(), authorized_session("a")).unwrap();
        let rx = state.subscribe();

        state.sign_out();

        assert!(store.load().is_none());
        assert!(rx.has_changed().unwrap());
        assert!(!state.capabilities().can_sign_out);
    }
}
