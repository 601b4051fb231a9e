//! Dialdex Auth Core
//!
//! OIDC building blocks for the portal: provider configuration, the JWKS
//! signing-key store, RS256 token verification, the Authorization Code flow,
//! and signed login-state (CSRF) cookies.
//!
//! # Example
//!
//! ```rust,ignore
//! use dialdex_auth_core::{KeyStore, OidcConfig, TokenVerifier};
//!
//! let config = OidcConfig::try_new(
//!     "https://sso.example.com",
//!     "internal",
//!     "portal-web",
//!     client_secret,
//!     "https://portal.example.com",
//!     session_secret,
//! )?;
//!
//! let keys = KeyStore::new(config.clone());
//! keys.prefetch().await?; // fail fast before serving
//!
//! let verifier = TokenVerifier::new(config, keys);
//! let claims = verifier.verify(&access_token).await?;
//! ```

pub mod config;
pub mod error;
pub mod jwks;
pub mod oauth;
pub mod state;
pub mod verifier;

pub use config::OidcConfig;
pub use error::AuthError;
pub use jwks::{Jwk, Jwks, KeyStore};
pub use oauth::{OAuthFlow, TokenSet};
pub use state::{LoginState, LoginStateSigner};
pub use verifier::{TokenClaims, TokenVerifier};
