//! Auth errors

use thiserror::Error;

/// Authentication errors
///
/// Startup treats the key-set variants as fatal; everything else is
/// per-request and resolves to a redirect or a structured error response.
#[derive(Error, Debug)]
pub enum AuthError {
    /// JWKS endpoint unreachable or returned a non-success status
    #[error("key fetch failed: {0}")]
    KeyFetchFailed(String),

    /// JWKS document contained no keys
    #[error("key set is empty")]
    KeySetEmpty,

    /// JWKS document contained no RS256 key
    #[error("no RS256 key in key set")]
    NoMatchingKey,

    /// Key components were not valid base64url
    #[error("malformed key encoding: {0}")]
    MalformedKeyEncoding(String),

    /// Token header references a kid the provider does not publish
    #[error("unknown key id: {0}")]
    UnknownKeyId(String),

    /// Token could not be parsed
    #[error("malformed token")]
    MalformedToken,

    /// Token header declares a non-RSA signing algorithm
    #[error("unexpected signing algorithm: {0}")]
    UnexpectedAlgorithm(String),

    /// Signature did not verify against the realm key
    #[error("invalid signature")]
    InvalidSignature,

    /// Token has expired
    #[error("token expired")]
    ExpiredToken,

    /// Token issuer does not match the configured realm
    #[error("invalid issuer")]
    InvalidIssuer,

    /// Login-state cookie failed validation
    #[error("invalid login state: {0}")]
    InvalidState(&'static str),

    /// Authorization code could not be exchanged for tokens
    #[error("token exchange failed: {detail}")]
    TokenExchangeFailed {
        /// Provider HTTP status, absent on transport failures
        status: Option<u16>,
        detail: String,
    },

    /// Configuration error
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl AuthError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Self::MalformedToken
            | Self::UnexpectedAlgorithm(_)
            | Self::InvalidSignature
            | Self::ExpiredToken
            | Self::InvalidIssuer
            | Self::UnknownKeyId(_) => 401,
            Self::InvalidState(_) => 400,
            Self::KeyFetchFailed(_)
            | Self::KeySetEmpty
            | Self::NoMatchingKey
            | Self::MalformedKeyEncoding(_)
            | Self::TokenExchangeFailed { .. } => 502,
            Self::Configuration(_) => 500,
        }
    }

    /// Get error code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::KeyFetchFailed(_) => "KEY_FETCH_FAILED",
            Self::KeySetEmpty => "KEY_SET_EMPTY",
            Self::NoMatchingKey => "NO_MATCHING_KEY",
            Self::MalformedKeyEncoding(_) => "MALFORMED_KEY_ENCODING",
            Self::UnknownKeyId(_) => "UNKNOWN_KEY_ID",
            Self::MalformedToken => "MALFORMED_TOKEN",
            Self::UnexpectedAlgorithm(_) => "UNEXPECTED_ALGORITHM",
            Self::InvalidSignature => "INVALID_SIGNATURE",
            Self::ExpiredToken => "TOKEN_EXPIRED",
            Self::InvalidIssuer => "INVALID_ISSUER",
            Self::InvalidState(_) => "INVALID_STATE",
            Self::TokenExchangeFailed { .. } => "TOKEN_EXCHANGE_FAILED",
            Self::Configuration(_) => "CONFIGURATION_ERROR",
        }
    }
}
