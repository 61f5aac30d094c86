//! HTTP client for the authorization server's token endpoint.

use std::sync::OnceLock;
use std::time::Duration;

use serde::Deserialize;

use super::error::AuthError;
use crate::config::ClientConfig;

static SHARED_CLIENT: OnceLock<reqwest::Client> = OnceLock::new();

/// Get (or create) the shared reqwest client.
pub fn shared_client() -> reqwest::Client {
    SHARED_CLIENT
        .get_or_init(|| {
            reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new())
        })
        .clone()
}

/// Authorization-code exchange request derived from a redirect response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenRequest {
    pub code: String,
    pub redirect_uri: String,
}

/// Successful token endpoint response.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub id_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenErrorBody {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Token endpoint client shared by the exchanger and the session guard.
#[derive(Debug, Clone)]
pub struct TokenEndpoint {
    client: reqwest::Client,
    token_url: String,
    client_id: String,
}

impl TokenEndpoint {
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            client: shared_client(),
            token_url: config.token_url.clone(),
            client_id: config.client_id.clone(),
        }
    }

    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    /// Exchange an authorization code for tokens.
    pub async fn exchange_code(&self, request: &TokenRequest) -> Result<TokenResponse, AuthError> {
        self.post(
            &[
                ("grant_type", "authorization_code"),
                ("client_id", self.client_id.as_str()),
                ("code", request.code.as_str()),
                ("redirect_uri", request.redirect_uri.as_str()),
            ],
            "token exchange",
        )
        .await
    }

    /// Obtain a new access token with a refresh token.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse, AuthError> {
        self.post(
            &[
                ("grant_type", "refresh_token"),
                ("client_id", self.client_id.as_str()),
                ("refresh_token", refresh_token),
            ],
            "token refresh",
        )
        .await
    }

    async fn post(
        &self,
        form: &[(&str, &str)],
        operation: &'static str,
    ) -> Result<TokenResponse, AuthError> {
        let resp = self
            .client
            .post(&self.token_url)
            .header("Accept", "application/json")
            .form(form)
            .send()
            .await?;
        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            if let Ok(err) = serde_json::from_str::<TokenErrorBody>(&body) {
                return Err(AuthError::TokenEndpoint {
                    error: err.error,
                    description: err.error_description,
                });
            }
            return Err(AuthError::InvalidResponse(format!(
                "{operation} failed with status {status}"
            )));
        }

        serde_json::from_str::<TokenResponse>(&body).map_err(|err| {
            AuthError::InvalidResponse(format!("{operation} returned malformed body: {err}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_response_accepts_minimal_body() {
        let resp: TokenResponse = serde_json::from_str(r#"{"access_token":"a"}"#).unwrap();
        assert_eq!(resp.access_token, "a");
        assert!(resp.expires_in.is_none());
        assert!(resp.refresh_token.is_none());
    }

    #[test]
    fn token_response_reads_all_fields() {
        let resp: TokenResponse = serde_json::from_str(
            r#"{"access_token":"a","token_type":"Bearer","expires_in":3599,
                "refresh_token":"r","id_token":"i","scope":"x y"}"#,
        )
        .unwrap();
        assert_eq!(resp.expires_in, Some(3599));
        assert_eq!(resp.id_token.as_deref(), Some("i"));
        assert_eq!(resp.scope.as_deref(), Some("x y"));
    }
}
