//! Configuration for the portal API service.

use dialdex_auth_core::OidcConfig;
use std::time::Duration;

/// Portal API configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub http_port: u16,

    /// Database URL
    pub database_url: String,

    /// OIDC provider and client configuration
    pub oidc: OidcConfig,

    /// Request timeout
    pub request_timeout: Duration,

    /// Metrics enabled
    pub metrics_enabled: bool,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Database
        let database_url =
            std::env::var("DATABASE_URL").map_err(|_| ConfigError::Missing("DATABASE_URL"))?;

        // Server port
        let http_port = std::env::var("HTTP_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .map_err(|_| ConfigError::Invalid("HTTP_PORT"))?;

        // Public base URL of this app; redirect URIs derive from it
        let portal_host =
            std::env::var("PORTAL_HOST").map_err(|_| ConfigError::Missing("PORTAL_HOST"))?;

        // Identity provider
        let keycloak_url =
            std::env::var("KEYCLOAK_URL").map_err(|_| ConfigError::Missing("KEYCLOAK_URL"))?;

        let keycloak_realm =
            std::env::var("KEYCLOAK_REALM").map_err(|_| ConfigError::Missing("KEYCLOAK_REALM"))?;

        let client_id =
            std::env::var("OIDC_CLIENT_ID").map_err(|_| ConfigError::Missing("OIDC_CLIENT_ID"))?;

        let client_secret = std::env::var("OIDC_CLIENT_SECRET")
            .map_err(|_| ConfigError::Missing("OIDC_CLIENT_SECRET"))?;

        // Login-state signing secret (minimum 32 bytes)
        let session_secret =
            std::env::var("SESSION_SECRET").map_err(|_| ConfigError::Missing("SESSION_SECRET"))?;

        if session_secret.len() < 32 {
            return Err(ConfigError::Invalid(
                "SESSION_SECRET must be at least 32 characters",
            ));
        }

        // Signing-key cache (default 1 hour)
        let jwks_cache_ttl_secs: u64 = std::env::var("JWKS_CACHE_TTL_SECS")
            .unwrap_or_else(|_| "3600".to_string())
            .parse()
            .map_err(|_| ConfigError::Invalid("JWKS_CACHE_TTL_SECS"))?;

        // Unknown-kid rejection window (default 30 seconds)
        let jwks_negative_ttl_secs: u64 = std::env::var("JWKS_NEGATIVE_TTL_SECS")
            .unwrap_or_else(|_| "30".to_string())
            .parse()
            .map_err(|_| ConfigError::Invalid("JWKS_NEGATIVE_TTL_SECS"))?;

        // Request timeout (default 30 seconds)
        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".to_string())
            .parse()
            .map_err(|_| ConfigError::Invalid("REQUEST_TIMEOUT_SECS"))?;

        // Metrics
        let metrics_enabled = std::env::var("METRICS_ENABLED")
            .unwrap_or_else(|_| "true".to_string())
            .parse()
            .unwrap_or(true);

        // Build OIDC config
        let oidc = OidcConfig::try_new(
            &keycloak_url,
            &keycloak_realm,
            &client_id,
            &client_secret,
            &portal_host,
            &session_secret,
        )
        .map_err(|e| ConfigError::Oidc(e.to_string()))?
        .with_jwks_cache_ttl(Duration::from_secs(jwks_cache_ttl_secs))
        .with_jwks_negative_ttl(Duration::from_secs(jwks_negative_ttl_secs));

        Ok(Self {
            http_port,
            database_url,
            oidc,
            request_timeout: Duration::from_secs(request_timeout_secs),
            metrics_enabled,
        })
    }
}

/// Configuration error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),

    #[error("OIDC config error: {0}")]
    Oidc(String),
}
