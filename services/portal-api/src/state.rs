//! Application state

use std::ops::Deref;
use std::sync::Arc;

use axum::extract::FromRef;
use dialdex_auth_core::{KeyStore, LoginStateSigner, OAuthFlow, OidcConfig, TokenVerifier};
use dialdex_db::pg::Repositories;
use dialdex_db::DbPool;

use crate::config::Config;

/// Shared database pool wrapper for health checks
#[derive(Clone)]
pub struct SharedPool(Arc<DbPool>);

impl Deref for SharedPool {
    type Target = DbPool;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// OIDC components shared by the auth handlers and the session gate
///
/// Kept separate from [`AppState`] so the login flow and the gate can be
/// exercised without a database.
#[derive(Clone)]
pub struct AuthState {
    /// OIDC configuration (cookie security flag, endpoint URLs)
    pub oidc: OidcConfig,
    /// Provider-facing half of the Authorization Code flow
    pub flow: Arc<OAuthFlow>,
    /// Access-token verifier backed by the cached realm keys
    pub verifier: Arc<TokenVerifier>,
    /// Login-state cookie signer
    pub state_signer: Arc<LoginStateSigner>,
}

impl AuthState {
    /// Create the auth state from a config and an already-prefetched key store
    pub fn new(oidc: OidcConfig, keys: KeyStore) -> Self {
        let state_signer = Arc::new(LoginStateSigner::new(&oidc));
        let flow = Arc::new(OAuthFlow::new(oidc.clone()));
        let verifier = Arc::new(TokenVerifier::new(oidc.clone(), keys));

        Self {
            oidc,
            flow,
            verifier,
            state_signer,
        }
    }
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// OIDC components
    pub auth: AuthState,
    /// Database repositories
    pub repos: Repositories,
    /// Database connection pool (shared reference for health checks)
    pub pool: SharedPool,
    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Create new application state
    pub fn new(auth: AuthState, repos: Repositories, pool: DbPool, config: Config) -> Self {
        Self {
            auth,
            repos,
            pool: SharedPool(Arc::new(pool)),
            config: Arc::new(config),
        }
    }

    /// Get request timeout from config
    pub fn request_timeout(&self) -> std::time::Duration {
        self.config.request_timeout
    }
}

impl FromRef<AppState> for AuthState {
    fn from_ref(app: &AppState) -> AuthState {
        app.auth.clone()
    }
}
