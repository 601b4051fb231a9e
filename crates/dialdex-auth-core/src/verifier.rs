//! JWT verification against the realm's published keys

use chrono::Utc;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, decode_header, Algorithm, Validation};
use serde::{Deserialize, Serialize};

use crate::jwks::KeyStore;
use crate::{AuthError, OidcConfig};

/// Claims extracted from a realm access token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject (provider user id)
    pub sub: String,
    /// Expiration timestamp
    pub exp: i64,
    /// Issued-at timestamp
    pub iat: i64,
    /// Issuer
    pub iss: String,
    /// Email, when the email scope was granted
    pub email: Option<String>,
    /// Preferred username
    pub preferred_username: Option<String>,
}

impl TokenClaims {
    /// Check if the token is expired
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() > self.exp
    }

    /// Best human-readable identity for logs and responses
    pub fn display_identity(&self) -> &str {
        self.preferred_username
            .as_deref()
            .or(self.email.as_deref())
            .unwrap_or(&self.sub)
    }
}

/// Verifies RS256 access tokens using the shared key store
#[derive(Clone, Debug)]
pub struct TokenVerifier {
    config: OidcConfig,
    keys: KeyStore,
}

impl TokenVerifier {
    /// Create a verifier over an already-constructed key store
    pub fn new(config: OidcConfig, keys: KeyStore) -> Self {
        Self { config, keys }
    }

    /// Access the underlying key store
    pub fn key_store(&self) -> &KeyStore {
        &self.keys
    }

    /// Verify a compact JWS access token and return its claims
    ///
    /// The header's algorithm is checked against the RSA family before any
    /// key material is touched: a token claiming HS256 must never reach the
    /// public key, or the key becomes an HMAC secret an attacker knows.
    pub async fn verify(&self, token: &str) -> Result<TokenClaims, AuthError> {
        let header = decode_header(token).map_err(|e| {
            tracing::debug!("failed to decode token header: {}", e);
            AuthError::MalformedToken
        })?;

        if !matches!(
            header.alg,
            Algorithm::RS256 | Algorithm::RS384 | Algorithm::RS512
        ) {
            tracing::debug!(alg = ?header.alg, "rejecting non-RSA signing algorithm");
            return Err(AuthError::UnexpectedAlgorithm(format!("{:?}", header.alg)));
        }

        let decoding_key = self.keys.decoding_key(header.kid.as_deref()).await?;

        let mut validation = Validation::new(header.alg);
        validation.set_issuer(&[self.config.issuer()]);
        validation.set_required_spec_claims(&["exp", "iss"]);
        // Keycloak access tokens put audiences like "account" in aud; the
        // client is not named there, so aud stays unchecked.
        validation.validate_aud = false;

        let data = decode::<TokenClaims>(token, &decoding_key, &validation).map_err(|e| {
            tracing::debug!("token verification failed: {}", e);
            match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::ExpiredToken,
                ErrorKind::InvalidSignature => AuthError::InvalidSignature,
                ErrorKind::InvalidIssuer => AuthError::InvalidIssuer,
                ErrorKind::InvalidAlgorithm => {
                    AuthError::UnexpectedAlgorithm(format!("{:?}", header.alg))
                }
                ErrorKind::InvalidToken
                | ErrorKind::MissingRequiredClaim(_)
                | ErrorKind::Base64(_)
                | ErrorKind::Json(_)
                | ErrorKind::Utf8(_) => AuthError::MalformedToken,
                _ => AuthError::InvalidSignature,
            }
        })?;

        Ok(data.claims)
    }
}
