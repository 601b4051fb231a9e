//! Authorization Code flow against the identity provider
//!
//! This module owns the provider-facing half of the flow: building the
//! authorization and end-session URLs and exchanging the returned code for
//! tokens. Cookies and redirects are the HTTP layer's business, which keeps
//! everything here testable against a mock provider.

use std::time::Duration;

use serde::Deserialize;
use url::Url;

use crate::{AuthError, OidcConfig};

/// Scopes requested on every login
const SCOPES: &str = "openid profile email";

/// Token endpoint response
#[derive(Debug, Clone, Deserialize)]
pub struct TokenSet {
    pub access_token: String,
    #[serde(default)]
    pub id_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

/// Provider-facing half of the Authorization Code flow
#[derive(Clone, Debug)]
pub struct OAuthFlow {
    config: OidcConfig,
    http_client: reqwest::Client,
}

impl OAuthFlow {
    /// Create a flow manager with a fail-fast HTTP client
    pub fn new(config: OidcConfig) -> Self {
        let http_client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self::with_client(config, http_client)
    }

    /// Create a flow manager with a custom HTTP client
    pub fn with_client(config: OidcConfig, http_client: reqwest::Client) -> Self {
        Self {
            config,
            http_client,
        }
    }

    /// Build the provider authorization URL for a login attempt
    pub fn authorization_url(&self, state: &str) -> Result<Url, AuthError> {
        let mut url = Url::parse(&self.config.authorization_endpoint())
            .map_err(|e| AuthError::Configuration(format!("authorization endpoint: {e}")))?;

        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.config.client_id)
            .append_pair("redirect_uri", &self.config.redirect_uri())
            .append_pair("scope", SCOPES)
            .append_pair("state", state);

        Ok(url)
    }

    /// Exchange an authorization code for tokens
    pub async fn exchange_code(&self, code: &str) -> Result<TokenSet, AuthError> {
        let redirect_uri = self.config.redirect_uri();
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", redirect_uri.as_str()),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
        ];

        let response = self
            .http_client
            .post(self.config.token_endpoint())
            .form(&params)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("token endpoint unreachable: {}", e);
                AuthError::TokenExchangeFailed {
                    status: None,
                    detail: e.to_string(),
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, "token exchange rejected: {}", detail);
            return Err(AuthError::TokenExchangeFailed {
                status: Some(status.as_u16()),
                detail,
            });
        }

        response
            .json::<TokenSet>()
            .await
            .map_err(|e| AuthError::TokenExchangeFailed {
                status: Some(status.as_u16()),
                detail: format!("malformed token response: {e}"),
            })
    }

    /// Build the provider end-session URL for logout
    ///
    /// The id_token_hint lets the provider end the session without prompting;
    /// the post-logout redirect brings the browser back to our login page.
    pub fn logout_url(&self, id_token_hint: &str) -> Result<Url, AuthError> {
        let mut url = Url::parse(&self.config.end_session_endpoint())
            .map_err(|e| AuthError::Configuration(format!("end session endpoint: {e}")))?;

        url.query_pairs_mut()
            .append_pair("id_token_hint", id_token_hint)
            .append_pair(
                "post_logout_redirect_uri",
                &self.config.post_logout_redirect_uri(),
            );

        Ok(url)
    }
}
