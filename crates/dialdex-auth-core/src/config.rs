//! Configuration for the OIDC components

use std::time::Duration;

use crate::AuthError;

/// Minimum length for the login-state signing secret
const MIN_STATE_SECRET_LENGTH: usize = 32;

/// OIDC provider and client configuration shared by the auth components
///
/// Constructed once at startup and threaded through every component that
/// needs it; nothing here lives in process globals.
#[derive(Debug, Clone)]
pub struct OidcConfig {
    /// Identity provider base URL, no trailing slash (e.g. `https://sso.example.com`)
    pub provider_base_url: String,
    /// Realm name
    pub realm: String,
    /// OAuth client ID
    pub client_id: String,
    /// OAuth client secret
    pub client_secret: String,
    /// Public base URL of this application, no trailing slash
    pub app_base_url: String,
    /// HMAC secret for signing the login-state cookie
    pub state_secret: String,
    /// Login-state cookie lifetime
    pub state_ttl: Duration,
    /// Decoding-key cache lifetime, keyed by kid
    pub jwks_cache_ttl: Duration,
    /// How long an unknown kid is rejected without re-fetching the key set
    pub jwks_negative_ttl: Duration,
}

impl OidcConfig {
    /// Create a validated config
    ///
    /// Trailing slashes on the provider and app URLs are stripped so the URL
    /// builders below always produce single-slash paths.
    pub fn try_new(
        provider_base_url: impl Into<String>,
        realm: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        app_base_url: impl Into<String>,
        state_secret: impl Into<String>,
    ) -> Result<Self, AuthError> {
        let provider_base_url = provider_base_url.into().trim_end_matches('/').to_string();
        let realm = realm.into();
        let client_id = client_id.into();
        let client_secret = client_secret.into();
        let app_base_url = app_base_url.into().trim_end_matches('/').to_string();
        let state_secret = state_secret.into();

        if provider_base_url.is_empty() {
            return Err(AuthError::Configuration("provider base URL is empty".into()));
        }
        if realm.is_empty() {
            return Err(AuthError::Configuration("realm is empty".into()));
        }
        if client_id.is_empty() {
            return Err(AuthError::Configuration("client ID is empty".into()));
        }
        if client_secret.is_empty() {
            return Err(AuthError::Configuration("client secret is empty".into()));
        }
        if app_base_url.is_empty() {
            return Err(AuthError::Configuration("app base URL is empty".into()));
        }
        if state_secret.len() < MIN_STATE_SECRET_LENGTH {
            return Err(AuthError::Configuration(format!(
                "state secret must be at least {MIN_STATE_SECRET_LENGTH} bytes"
            )));
        }

        Ok(Self {
            provider_base_url,
            realm,
            client_id,
            client_secret,
            app_base_url,
            state_secret,
            state_ttl: Duration::from_secs(5 * 60),
            jwks_cache_ttl: Duration::from_secs(60 * 60),
            jwks_negative_ttl: Duration::from_secs(30),
        })
    }

    /// Realm base URL, which is also the token issuer
    pub fn issuer(&self) -> String {
        format!("{}/auth/realms/{}", self.provider_base_url, self.realm)
    }

    /// JWKS endpoint publishing the realm's signing keys
    pub fn jwks_url(&self) -> String {
        format!("{}/protocol/openid-connect/certs", self.issuer())
    }

    /// Authorization endpoint the browser is redirected to
    pub fn authorization_endpoint(&self) -> String {
        format!("{}/protocol/openid-connect/auth", self.issuer())
    }

    /// Token endpoint for the code exchange
    pub fn token_endpoint(&self) -> String {
        format!("{}/protocol/openid-connect/token", self.issuer())
    }

    /// End-session endpoint for provider-side logout
    pub fn end_session_endpoint(&self) -> String {
        format!("{}/protocol/openid-connect/logout", self.issuer())
    }

    /// Redirect URI registered for this client
    pub fn redirect_uri(&self) -> String {
        format!("{}/callback", self.app_base_url)
    }

    /// Where the provider sends the browser after logout
    pub fn post_logout_redirect_uri(&self) -> String {
        format!("{}/login", self.app_base_url)
    }

    /// Whether cookies should carry the Secure attribute
    pub fn secure_cookies(&self) -> bool {
        self.app_base_url.starts_with("https://")
    }

    /// Set the login-state cookie lifetime
    pub fn with_state_ttl(mut self, ttl: Duration) -> Self {
        self.state_ttl = ttl;
        self
    }

    /// Set the decoding-key cache lifetime
    pub fn with_jwks_cache_ttl(mut self, ttl: Duration) -> Self {
        self.jwks_cache_ttl = ttl;
        self
    }

    /// Set the unknown-kid rejection window
    pub fn with_jwks_negative_ttl(mut self, ttl: Duration) -> Self {
        self.jwks_negative_ttl = ttl;
        self
    }
}
