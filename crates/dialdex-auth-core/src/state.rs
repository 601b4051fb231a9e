//! Per-login CSRF state bound to a signed cookie
//!
//! Every login attempt gets a fresh random `state` value. The value rides to
//! the provider in the authorization URL and comes back on the callback; an
//! HMAC-signed, expiring cookie binds it to the browser that started the
//! flow. A callback whose state does not match the cookie is rejected before
//! any token exchange happens.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use hmac::{Hmac, Mac};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::{AuthError, OidcConfig};

type HmacSha256 = Hmac<Sha256>;

/// Length of the random state token
const STATE_TOKEN_LENGTH: usize = 32;

/// Payload bound into the state cookie
#[derive(Debug, Serialize, Deserialize)]
struct StatePayload {
    state: String,
    exp: i64,
}

/// A freshly issued login state
#[derive(Debug, Clone)]
pub struct LoginState {
    /// Value sent to the provider as the `state` query parameter
    pub state: String,
    /// Signed cookie value that must accompany the callback
    pub cookie_value: String,
}

/// Issues and validates signed login-state cookies
///
/// Cookie format: `base64url(json payload) . base64url(hmac-sha256)`.
#[derive(Clone)]
pub struct LoginStateSigner {
    secret: Vec<u8>,
    ttl_secs: i64,
}

impl LoginStateSigner {
    /// Create a signer from the shared OIDC config
    pub fn new(config: &OidcConfig) -> Self {
        Self {
            secret: config.state_secret.as_bytes().to_vec(),
            ttl_secs: config.state_ttl.as_secs() as i64,
        }
    }

    /// Issue a fresh random state and the signed cookie binding it
    pub fn issue(&self) -> Result<LoginState, AuthError> {
        let state: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(STATE_TOKEN_LENGTH)
            .map(char::from)
            .collect();

        let payload = StatePayload {
            state: state.clone(),
            exp: Utc::now().timestamp() + self.ttl_secs,
        };
        let payload_json = serde_json::to_vec(&payload)
            .map_err(|e| AuthError::Configuration(format!("state payload: {e}")))?;
        let payload_b64 = URL_SAFE_NO_PAD.encode(payload_json);
        let signature = self.sign(payload_b64.as_bytes())?;

        Ok(LoginState {
            state,
            cookie_value: format!("{payload_b64}.{signature}"),
        })
    }

    /// Validate a callback's state against the cookie issued at login
    ///
    /// Checks run in fixed order: cookie structure, MAC, payload decoding,
    /// expiry, and finally the state comparison. MAC and state comparisons
    /// are constant-time.
    pub fn validate(&self, cookie_value: &str, presented_state: &str) -> Result<(), AuthError> {
        let (payload_b64, signature) = cookie_value
            .rsplit_once('.')
            .ok_or(AuthError::InvalidState("missing signature"))?;

        let expected = self.sign(payload_b64.as_bytes())?;
        if !bool::from(signature.as_bytes().ct_eq(expected.as_bytes())) {
            return Err(AuthError::InvalidState("signature mismatch"));
        }

        let payload_json = URL_SAFE_NO_PAD
            .decode(payload_b64)
            .map_err(|_| AuthError::InvalidState("malformed payload"))?;
        let payload: StatePayload = serde_json::from_slice(&payload_json)
            .map_err(|_| AuthError::InvalidState("malformed payload"))?;

        if Utc::now().timestamp() > payload.exp {
            return Err(AuthError::InvalidState("expired"));
        }

        if !bool::from(payload.state.as_bytes().ct_eq(presented_state.as_bytes())) {
            return Err(AuthError::InvalidState("state mismatch"));
        }

        Ok(())
    }

    fn sign(&self, data: &[u8]) -> Result<String, AuthError> {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| AuthError::Configuration(format!("state secret: {e}")))?;
        mac.update(data);
        Ok(URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes()))
    }
}

impl std::fmt::Debug for LoginStateSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginStateSigner")
            .field("ttl_secs", &self.ttl_secs)
            .finish_non_exhaustive()
    }
}
