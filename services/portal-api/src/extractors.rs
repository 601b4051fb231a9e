//! Axum extractors for the session gate

use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};

use dialdex_auth_core::TokenClaims;

use crate::cookies;
use crate::state::AuthState;

/// Verified browser session extracted from the `jwt` cookie
#[derive(Debug, Clone)]
pub struct AuthSession {
    /// Verified access-token claims
    pub claims: TokenClaims,
}

/// Gate rejection
///
/// A missing credential starts the login flow; a bad one is cleared by
/// bouncing through logout, which also ends the provider session.
#[derive(Debug)]
pub struct AuthRedirect {
    location: &'static str,
}

impl AuthRedirect {
    fn to_login() -> Self {
        Self { location: "/login" }
    }

    fn to_logout() -> Self {
        Self {
            location: "/logout",
        }
    }
}

impl IntoResponse for AuthRedirect {
    fn into_response(self) -> Response {
        (StatusCode::FOUND, [(header::LOCATION, self.location)]).into_response()
    }
}

impl<S> FromRequestParts<S> for AuthSession
where
    AuthState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthRedirect;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth = AuthState::from_ref(state);

        let Some(token) = cookies::cookie_value(&parts.headers, cookies::JWT_COOKIE) else {
            tracing::debug!("no session cookie, redirecting to login");
            return Err(AuthRedirect::to_login());
        };

        match auth.verifier.verify(&token).await {
            Ok(claims) => Ok(AuthSession { claims }),
            Err(e) => {
                tracing::debug!(error = %e, "session token rejected, redirecting to logout");
                Err(AuthRedirect::to_logout())
            }
        }
    }
}
