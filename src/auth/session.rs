use std::collections::BTreeSet;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::token_endpoint::TokenResponse;

/// Tokens whose expiry falls inside this window are treated as expired.
pub const EXPIRY_TOLERANCE_SECS: i64 = 60;

/// Error recorded on a session built from a failed authorization redirect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationFailure {
    pub kind: String,
    pub message: String,
}

/// The single persisted OAuth session.
///
/// A session is replaced wholesale on every change; callers never patch a
/// shared instance in place.
///
/// # Example
/// ```
/// use tasklease::auth::Session;
/// use chrono::{Duration, Utc};
///
/// let session = Session::default()
///     .with_access_token("access", Some(Utc::now() + Duration::hours(1)))
///     .with_refresh_token("refresh");
/// assert!(session.is_authorized());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    #[serde(default)]
    pub scopes: BTreeSet<String>,
    pub access_token: Option<String>,
    pub token_type: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub refresh_token: Option<String>,
    pub id_token: Option<String>,
    pub last_refresh: Option<DateTime<Utc>>,
    pub last_error: Option<AuthorizationFailure>,
}

impl Session {
    /// Provisional session for a successful redirect, before the code is exchanged.
    pub fn from_authorization(scopes: impl IntoIterator<Item = String>) -> Self {
        Self {
            scopes: scopes.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Unauthorized session carrying the redirect error.
    pub fn from_failure(failure: AuthorizationFailure) -> Self {
        Self {
            last_error: Some(failure),
            ..Self::default()
        }
    }

    pub fn with_access_token(
        mut self,
        access_token: impl Into<String>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Self {
        self.access_token = Some(access_token.into());
        self.expires_at = expires_at;
        self
    }

    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }

    pub fn with_id_token(mut self, id_token: impl Into<String>) -> Self {
        self.id_token = Some(id_token.into());
        self
    }

    /// Merge a token endpoint response, returning the replacement session.
    ///
    /// A refresh response that omits the refresh token keeps the previous
    /// one, and likewise for the id token and scopes.
    pub fn updated_with(&self, response: &TokenResponse, now: DateTime<Utc>) -> Self {
        let scopes = match response.scope.as_deref() {
            Some(scope) => parse_scopes(scope),
            None => self.scopes.clone(),
        };
        Self {
            scopes,
            access_token: Some(response.access_token.clone()),
            token_type: response.token_type.clone().or_else(|| self.token_type.clone()),
            expires_at: response.expires_in.map(|secs| now + Duration::seconds(secs)),
            refresh_token: response
                .refresh_token
                .clone()
                .or_else(|| self.refresh_token.clone()),
            id_token: response.id_token.clone().or_else(|| self.id_token.clone()),
            last_refresh: Some(now),
            last_error: None,
        }
    }

    /// Whether the access token is missing or expires within the tolerance window.
    pub fn needs_token_refresh(&self, now: DateTime<Utc>) -> bool {
        if self.access_token.is_none() {
            return true;
        }
        match self.expires_at {
            Some(expires_at) => now >= expires_at - Duration::seconds(EXPIRY_TOLERANCE_SECS),
            None => false,
        }
    }

    /// Non-expired or refreshable access token present.
    pub fn is_authorized(&self) -> bool {
        if self.last_error.is_some() {
            return false;
        }
        self.access_token.is_some()
            && (self.refresh_token.is_some() || !self.needs_token_refresh(Utc::now()))
    }
}

/// Split a space- (or comma-) separated OAuth scope string.
pub fn parse_scopes(raw: &str) -> BTreeSet<String> {
    raw.split(|c: char| c == ' ' || c == ',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
