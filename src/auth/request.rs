use async_trait::async_trait;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::AuthError;
use crate::config::ClientConfig;

const LOGIN_HINT_PARAM: &str = "login_hint";

/// One authorization attempt. Built fresh per initiation and never reused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationRequest {
    /// Correlation token sent as the OAuth `state` parameter.
    pub request_id: String,
    pub auth_url: String,
    pub token_url: String,
    pub client_id: String,
    pub redirect_uri: String,
    pub scopes: Vec<String>,
    pub login_hint: Option<String>,
}

impl AuthorizationRequest {
    pub fn new(config: &ClientConfig, login_hint: Option<String>) -> Self {
        Self {
            request_id: Uuid::new_v4().simple().to_string(),
            auth_url: config.auth_url.clone(),
            token_url: config.token_url.clone(),
            client_id: config.client_id.clone(),
            redirect_uri: config.redirect_uri.clone(),
            scopes: config.scopes.clone(),
            login_hint: login_hint.filter(|hint| !hint.trim().is_empty()),
        }
    }

    /// Full authorization URL the user agent should open.
    pub fn to_url(&self) -> Result<Url, AuthError> {
        let mut url = Url::parse(&self.auth_url)
            .map_err(|err| AuthError::Configuration(format!("invalid auth url: {err}")))?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("response_type", "code")
                .append_pair("client_id", &self.client_id)
                .append_pair("redirect_uri", &self.redirect_uri)
                .append_pair("scope", &self.scopes.join(" "))
                .append_pair("state", &self.request_id);
            if let Some(hint) = &self.login_hint {
                query.append_pair(LOGIN_HINT_PARAM, hint);
            }
        }
        Ok(url)
    }
}

/// External browsing surface that performs the interactive part of the flow.
#[async_trait]
pub trait UserAgent: Send + Sync {
    async fn launch(&self, authorize_url: &Url) -> Result<(), AuthError>;
}

/// Capability handed to the redirect handler for the launched request.
///
/// Serializable so a host that is torn down while the browser is open can
/// keep it and re-arm a new service with [`AuthService::resume_authorization`].
///
/// [`AuthService::resume_authorization`]: super::AuthService::resume_authorization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingAuthorization {
    pub request_id: String,
    pub redirect_uri: String,
}

impl AuthorizationRequest {
    /// Capability the redirect handler uses to recognise this attempt.
    pub fn pending(&self) -> PendingAuthorization {
        PendingAuthorization {
            request_id: self.request_id.clone(),
            redirect_uri: self.redirect_uri.clone(),
        }
    }

    /// Hand the request to the user agent. No network call is made here.
    pub async fn launch(&self, user_agent: &dyn UserAgent) -> Result<PendingAuthorization, AuthError> {
        if let Some(hint) = &self.login_hint {
            tracing::info!(login_hint = %hint, "attaching login hint");
        }
        let url = self.to_url()?;
        tracing::debug!(request_id = %self.request_id, "launching authorization request");
        user_agent.launch(&url).await?;
        Ok(self.pending())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingAgent {
        urls: Mutex<Vec<Url>>,
    }

    #[async_trait]
    impl UserAgent for RecordingAgent {
        async fn launch(&self, authorize_url: &Url) -> Result<(), AuthError> {
            self.urls.lock().unwrap().push(authorize_url.clone());
            Ok(())
        }
    }

    struct FailingAgent;

    #[async_trait]
    impl UserAgent for FailingAgent {
        async fn launch(&self, _authorize_url: &Url) -> Result<(), AuthError> {
            Err(AuthError::UserAgent("no browser".to_string()))
        }
    }

    fn params(url: &Url) -> HashMap<String, String> {
        url.query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }

    #[test]
    fn url_contains_required_params() {
        let config = ClientConfig::default();
        let request = AuthorizationRequest::new(&config, None);
        let url = request.to_url().unwrap();
        let params = params(&url);

        assert_eq!(params.get("response_type").map(String::as_str), Some("code"));
        assert_eq!(params.get("client_id"), Some(&config.client_id));
        assert_eq!(params.get("redirect_uri"), Some(&config.redirect_uri));
        assert_eq!(params.get("scope"), Some(&config.scope_param()));
        assert_eq!(params.get("state"), Some(&request.request_id));
        assert!(!params.contains_key("login_hint"));
    }

    #[test]
    fn login_hint_is_attached_when_present() {
        let request =
            AuthorizationRequest::new(&ClientConfig::default(), Some("user@example.com".into()));
        let params = params(&request.to_url().unwrap());
        assert_eq!(
            params.get("login_hint").map(String::as_str),
            Some("user@example.com")
        );
    }

    #[test]
    fn blank_login_hint_is_dropped() {
        let request = AuthorizationRequest::new(&ClientConfig::default(), Some("  ".into()));
        assert!(request.login_hint.is_none());
    }

    #[test]
    fn each_request_gets_a_fresh_id() {
        let config = ClientConfig::default();
        let a = AuthorizationRequest::new(&config, None);
        let b = AuthorizationRequest::new(&config, None);
        assert_ne!(a.request_id, b.request_id);
    }

    #[tokio::test]
    async fn launch_opens_user_agent_with_state() {
        let agent = RecordingAgent::default();
        let request = AuthorizationRequest::new(&ClientConfig::default(), None);
        let pending = request.launch(&agent).await.unwrap();

        let urls = agent.urls.lock().unwrap();
        assert_eq!(urls.len(), 1);
        assert_eq!(params(&urls[0]).get("state"), Some(&pending.request_id));
    }

    #[tokio::test]
    async fn launch_propagates_user_agent_failure() {
        let request = AuthorizationRequest::new(&ClientConfig::default(), None);
        let result = request.launch(&FailingAgent).await;
        assert!(matches!(result, Err(AuthError::UserAgent(_))));
    }
}
