use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use reqwest::Url;
use strum::{Display, EnumString};
use tokio::task::JoinHandle;

use super::error::AuthError;
use super::exchange::TokenExchanger;
use super::request::PendingAuthorization;
use super::session::{parse_scopes, AuthorizationFailure, Session};
use super::token_endpoint::TokenRequest;

/// Classification of a failed authorization redirect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum AuthorizationErrorKind {
    AccessDenied,
    InvalidRequest,
    InvalidScope,
    ServerError,
    TemporarilyUnavailable,
    StateMismatch,
    InvalidResponse,
}

/// An inbound redirect notification delivered by the host.
///
/// Clones share the "used" marker, so a re-delivered event is recognised.
#[derive(Debug, Clone)]
pub struct RedirectEvent {
    uri: String,
    used: Arc<AtomicBool>,
}

impl RedirectEvent {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            used: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn is_used(&self) -> bool {
        self.used.load(Ordering::SeqCst)
    }

    /// Mark the event used; returns `false` if it already was.
    fn claim(&self) -> bool {
        !self.used.swap(true, Ordering::SeqCst)
    }
}

/// Parsed content of an authorization redirect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationResult {
    Granted {
        code: String,
        scopes: Vec<String>,
        state: Option<String>,
    },
    Failed(AuthorizationFailure),
}

impl AuthorizationResult {
    pub fn parse(uri: &Url) -> Self {
        let params: HashMap<String, String> = uri
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        if let Some(error) = params.get("error") {
            let kind = match error.parse::<AuthorizationErrorKind>() {
                Ok(kind) => kind.to_string(),
                Err(_) => error.clone(),
            };
            let message = params
                .get("error_description")
                .cloned()
                .unwrap_or_else(|| error.clone());
            return Self::Failed(AuthorizationFailure {
                kind,
                message,
            });
        }

        match params.get("code") {
            Some(code) if !code.is_empty() => Self::Granted {
                code: code.clone(),
                scopes: params
                    .get("scope")
                    .map(|s| parse_scopes(s).into_iter().collect())
                    .unwrap_or_default(),
                state: params.get("state").cloned(),
            },
            _ => Self::Failed(AuthorizationFailure {
                kind: AuthorizationErrorKind::InvalidResponse.to_string(),
                message: "redirect carried neither code nor error".to_string(),
            }),
        }
    }
}

/// Where the handler is in the current authorization attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedirectStatus {
    Idle,
    Pending(PendingAuthorization),
    Handled,
}

/// Result of handling one redirect event.
#[derive(Debug)]
pub enum RedirectOutcome {
    /// Already used, not addressed to us, or no attempt is pending.
    Ignored,
    /// Authorization failed; the unauthorized session is not persisted.
    Failed(Session),
    /// The code exchange is running; the handle resolves to the stored session.
    Exchanging {
        provisional: Session,
        completion: JoinHandle<Result<Session, AuthError>>,
    },
}

/// Receives the redirect exactly once per authorization attempt.
pub struct RedirectHandler {
    redirect_uri: String,
    status: Mutex<RedirectStatus>,
    exchanger: TokenExchanger,
}

impl RedirectHandler {
    pub fn new(redirect_uri: impl Into<String>, exchanger: TokenExchanger) -> Self {
        Self {
            redirect_uri: redirect_uri.into(),
            status: Mutex::new(RedirectStatus::Idle),
            exchanger,
        }
    }

    pub fn status(&self) -> RedirectStatus {
        self.lock_status().clone()
    }

    /// Arm the handler for a freshly launched request.
    pub fn expect(&self, pending: PendingAuthorization) {
        *self.lock_status() = RedirectStatus::Pending(pending);
    }

    /// Drop a pending attempt that never reached the user agent.
    pub fn reset(&self) {
        *self.lock_status() = RedirectStatus::Idle;
    }

    fn lock_status(&self) -> std::sync::MutexGuard<'_, RedirectStatus> {
        self.status.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Handle one inbound redirect. Does not require a tokio runtime in scope.
    pub fn handle(&self, event: &RedirectEvent) -> RedirectOutcome {
        let Ok(uri) = Url::parse(event.uri()) else {
            tracing::debug!(uri = %event.uri(), "ignoring unparseable redirect");
            return RedirectOutcome::Ignored;
        };
        if !self.is_addressed_to_us(&uri) {
            tracing::debug!(uri = %event.uri(), "ignoring redirect for another target");
            return RedirectOutcome::Ignored;
        }
        if event.is_used() {
            tracing::debug!("ignoring already handled redirect");
            return RedirectOutcome::Ignored;
        }

        let mut status = self.lock_status();
        let RedirectStatus::Pending(pending) = status.clone() else {
            tracing::debug!(status = ?*status, "ignoring redirect with no pending authorization");
            return RedirectOutcome::Ignored;
        };
        if !event.claim() {
            return RedirectOutcome::Ignored;
        }
        *status = RedirectStatus::Handled;
        drop(status);

        match AuthorizationResult::parse(&uri) {
            AuthorizationResult::Granted {
                state: Some(state), ..
            } if state != pending.request_id => {
                tracing::warn!("authorization redirect state does not match the pending request");
                RedirectOutcome::Failed(Session::from_failure(AuthorizationFailure {
                    kind: AuthorizationErrorKind::StateMismatch.to_string(),
                    message: "redirect state does not match the pending request".to_string(),
                }))
            }
            AuthorizationResult::Granted { code, scopes, .. } => {
                let provisional = Session::from_authorization(scopes);
                tracing::info!(scopes = ?provisional.scopes, "handled authorization response");
                let request = TokenRequest {
                    code,
                    redirect_uri: pending.redirect_uri,
                };
                match self.exchanger.exchange(provisional.clone(), request) {
                    Ok(completion) => RedirectOutcome::Exchanging {
                        provisional,
                        completion,
                    },
                    Err(err) => {
                        tracing::error!(error = %err, "could not start token exchange");
                        RedirectOutcome::Failed(Session::from_failure(AuthorizationFailure {
                            kind: AuthorizationErrorKind::ServerError.to_string(),
                            message: err.to_string(),
                        }))
                    }
                }
            }
            AuthorizationResult::Failed(failure) => {
                tracing::warn!(kind = %failure.kind, message = %failure.message, "authorization failed");
                RedirectOutcome::Failed(Session::from_failure(failure))
            }
        }
    }

    fn is_addressed_to_us(&self, uri: &Url) -> bool {
        let Ok(expected) = Url::parse(&self.redirect_uri) else {
            return false;
        };
        uri.scheme() == expected.scheme()
            && uri.host_str() == expected.host_str()
            && uri.port() == expected.port()
            && uri.path() == expected.path()
    }
}
