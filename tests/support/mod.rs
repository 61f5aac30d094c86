#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use reqwest::Url;
use tasklease::auth::{AuthError, AuthService, Session, SessionStore, UserAgent};
use tasklease::config::{ClientConfig, WatchedManagedConfig};

pub const REDIRECT_URI: &str = "com.example.tasklease:/oauth2callback";

#[derive(Default)]
pub struct InMemorySessionStore {
    session: Mutex<Option<Session>>,
    saves: AtomicUsize,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seeded(session: Session) -> Self {
        let store = Self::default();
        *store.session.lock().expect("store lock poisoned") = Some(session);
        store
    }

    pub fn get(&self) -> Option<Session> {
        self.session.lock().expect("store lock poisoned").clone()
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

impl SessionStore for InMemorySessionStore {
    fn load(&self) -> Option<Session> {
        self.get()
    }

    fn save(&self, session: &Session) -> Result<(), AuthError> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        *self.session.lock().expect("store lock poisoned") = Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), AuthError> {
        *self.session.lock().expect("store lock poisoned") = None;
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingUserAgent {
    urls: Mutex<Vec<Url>>,
}

impl RecordingUserAgent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn launched(&self) -> Vec<Url> {
        self.urls.lock().expect("agent lock poisoned").clone()
    }

    pub fn last_param(&self, name: &str) -> Option<String> {
        let urls = self.launched();
        let url = urls.last()?;
        url.query_pairs()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.into_owned())
    }
}

#[async_trait]
impl UserAgent for RecordingUserAgent {
    async fn launch(&self, authorize_url: &Url) -> Result<(), AuthError> {
        self.urls
            .lock()
            .expect("agent lock poisoned")
            .push(authorize_url.clone());
        Ok(())
    }
}

pub struct Harness {
    pub service: AuthService,
    pub store: Arc<InMemorySessionStore>,
    pub agent: Arc<RecordingUserAgent>,
    pub managed: Arc<WatchedManagedConfig>,
}

pub fn client_config(token_base: &str) -> ClientConfig {
    ClientConfig::builder()
        .client_id("test-client")
        .redirect_uri(REDIRECT_URI)
        .token_url(format!("{token_base}/token"))
        .build()
}

pub fn harness(token_base: &str, store: InMemorySessionStore) -> Harness {
    harness_sharing(token_base, Arc::new(store))
}

/// Build a fresh service over an existing store, as a restarted host would.
pub fn harness_sharing(token_base: &str, store: Arc<InMemorySessionStore>) -> Harness {
    let agent = Arc::new(RecordingUserAgent::new());
    let managed = Arc::new(WatchedManagedConfig::default());
    let service = AuthService::new(
        client_config(token_base),
        store.clone(),
        agent.clone(),
        managed.clone(),
    )
    .expect("valid client config");
    Harness {
        service,
        store,
        agent,
        managed,
    }
}

pub fn valid_session(access_token: &str) -> Session {
    Session::default()
        .with_access_token(access_token, Some(Utc::now() + Duration::hours(1)))
        .with_refresh_token("refresh-token")
        .with_id_token("id-token")
}

pub fn expired_session(access_token: &str) -> Session {
    Session::default()
        .with_access_token(access_token, Some(Utc::now() - Duration::minutes(10)))
        .with_refresh_token("refresh-token")
        .with_id_token("id-token")
}
