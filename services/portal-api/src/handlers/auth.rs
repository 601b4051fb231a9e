//! Browser-facing authentication flow (login, callback, logout)
//!
//! These handlers only need the OIDC components, so they run against
//! [`AuthState`] rather than the full application state.

use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{AppendHeaders, IntoResponse, Response};
use serde::Deserialize;

use dialdex_auth_core::AuthError;

use crate::cookies;
use crate::error::{ApiError, ApiResult};
use crate::state::AuthState;

// ============================================================================
// Request Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /login
///
/// Issue a fresh signed login state and send the browser to the provider's
/// authorization endpoint.
pub async fn login(State(auth): State<AuthState>) -> ApiResult<Response> {
    let login_state = auth.state_signer.issue()?;
    let authorize_url = auth.flow.authorization_url(&login_state.state)?;

    metrics::counter!("portal_logins_total").increment(1);
    tracing::debug!("redirecting to provider authorization endpoint");

    let state_cookie = cookies::build(
        cookies::STATE_COOKIE,
        &login_state.cookie_value,
        auth.oidc.state_ttl.as_secs(),
        auth.oidc.secure_cookies(),
    );

    Ok((
        StatusCode::FOUND,
        AppendHeaders([(header::SET_COOKIE, state_cookie)]),
        [(header::LOCATION, authorize_url.to_string())],
    )
        .into_response())
}

/// GET /callback
///
/// Finish the Authorization Code flow: check the returned `state` against the
/// signed cookie, exchange the code, and install the token cookies.
pub async fn callback(
    State(auth): State<AuthState>,
    Query(params): Query<CallbackParams>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    // The CSRF check happens before anything touches the provider
    let state_cookie = cookies::cookie_value(&headers, cookies::STATE_COOKIE)
        .ok_or(AuthError::InvalidState("missing state cookie"))?;
    let presented_state = params.state.as_deref().unwrap_or_default();
    auth.state_signer.validate(&state_cookie, presented_state)?;

    let code = params
        .code
        .as_deref()
        .filter(|c| !c.is_empty())
        .ok_or_else(|| ApiError::BadRequest("missing authorization code".into()))?;

    let tokens = match auth.flow.exchange_code(code).await {
        Ok(tokens) => {
            metrics::counter!("portal_token_exchanges_total", "result" => "ok").increment(1);
            tokens
        }
        Err(e) => {
            metrics::counter!("portal_token_exchanges_total", "result" => "err").increment(1);
            return Err(e.into());
        }
    };

    let secure = auth.oidc.secure_cookies();
    let mut set_cookies = vec![
        (
            header::SET_COOKIE,
            cookies::build(
                cookies::JWT_COOKIE,
                &tokens.access_token,
                cookies::TOKEN_COOKIE_MAX_AGE_SECS,
                secure,
            ),
        ),
        (
            header::SET_COOKIE,
            cookies::clear(cookies::STATE_COOKIE, secure),
        ),
    ];
    if let Some(id_token) = &tokens.id_token {
        set_cookies.push((
            header::SET_COOKIE,
            cookies::build(
                cookies::ID_TOKEN_COOKIE,
                id_token,
                cookies::TOKEN_COOKIE_MAX_AGE_SECS,
                secure,
            ),
        ));
    }

    tracing::debug!("code exchange complete, session established");

    Ok((
        StatusCode::FOUND,
        AppendHeaders(set_cookies),
        [(header::LOCATION, "/list")],
    )
        .into_response())
}

/// GET /logout
///
/// Clear the access-token cookie and end the provider session. Without an ID
/// token to hint with, fall back to the local login page.
pub async fn logout(State(auth): State<AuthState>, headers: HeaderMap) -> ApiResult<Response> {
    let cleared = cookies::clear(cookies::JWT_COOKIE, auth.oidc.secure_cookies());

    let location = match cookies::cookie_value(&headers, cookies::ID_TOKEN_COOKIE) {
        Some(id_token) => auth.flow.logout_url(&id_token)?.to_string(),
        None => "/login".to_string(),
    };

    tracing::debug!("session cleared");

    Ok((
        StatusCode::FOUND,
        AppendHeaders([(header::SET_COOKIE, cleared)]),
        [(header::LOCATION, location)],
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use axum::routing::get;
    use axum::Router;
    use dialdex_auth_core::LoginStateSigner;
    use http_body_util::BodyExt;
    use tower::ServiceExt;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::test_support::{self, token_path};

    fn auth_app(auth: AuthState) -> Router {
        Router::new()
            .route("/login", get(login))
            .route("/callback", get(callback))
            .route("/logout", get(logout))
            .with_state(auth)
    }

    async fn mount_token_endpoint(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path(token_path()))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "access-token-value",
                "id_token": "id-token-value",
                "token_type": "Bearer",
                "expires_in": 300
            })))
            .mount(server)
            .await;
    }

    fn get_request(uri: &str, cookie: Option<String>) -> Request<Body> {
        let builder = Request::builder().uri(uri);
        let builder = match cookie {
            Some(value) => builder.header(header::COOKIE, value),
            None => builder,
        };
        builder.body(Body::empty()).unwrap()
    }

    fn set_cookies(response: &axum::response::Response) -> Vec<String> {
        response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect()
    }

    #[tokio::test]
    async fn test_login_redirects_to_provider_with_state_cookie() {
        let provider = test_support::start_provider().await;
        let config = test_support::test_oidc_config(&provider.uri());
        let app = auth_app(test_support::auth_state(&provider.uri()));

        let response = app.oneshot(get_request("/login", None)).await.unwrap();

        assert_eq!(response.status(), StatusCode::FOUND);

        let location = response
            .headers()
            .get(header::LOCATION)
            .unwrap()
            .to_str()
            .unwrap();
        assert!(location.starts_with(&config.authorization_endpoint()));
        assert!(location.contains("response_type=code"));
        assert!(location.contains("client_id=portal-web"));
        assert!(location.contains("scope=openid+profile+email"));
        assert!(location.contains("state="));

        let cookies = set_cookies(&response);
        let state_cookie = cookies
            .iter()
            .find(|c| c.starts_with("oauth_state="))
            .expect("state cookie should be set");
        assert!(state_cookie.contains("HttpOnly"));
        assert!(state_cookie.contains("SameSite=Lax"));
        assert!(state_cookie.contains("Max-Age=300"));
    }

    #[tokio::test]
    async fn test_callback_exchanges_code_and_sets_cookies() {
        let provider = test_support::start_provider().await;
        mount_token_endpoint(&provider).await;

        let config = test_support::test_oidc_config(&provider.uri());
        let signer = LoginStateSigner::new(&config);
        let login_state = signer.issue().expect("issue state");

        let app = auth_app(test_support::auth_state(&provider.uri()));
        let uri = format!("/callback?code=test-code&state={}", login_state.state);
        let cookie = format!("oauth_state={}", login_state.cookie_value);

        let response = app.oneshot(get_request(&uri, Some(cookie))).await.unwrap();

        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/list");

        let cookies = set_cookies(&response);
        assert!(cookies
            .iter()
            .any(|c| c.starts_with("jwt=access-token-value") && c.contains("Max-Age=86400")));
        assert!(cookies
            .iter()
            .any(|c| c.starts_with("id_token=id-token-value")));
        assert!(cookies
            .iter()
            .any(|c| c.starts_with("oauth_state=;") && c.contains("Max-Age=0")));
    }

    #[tokio::test]
    async fn test_callback_rejects_state_mismatch_before_exchange() {
        let provider = test_support::start_provider().await;

        // The exchange must never fire on a failed CSRF check
        let guard = Mock::given(method("POST"))
            .and(path(token_path()))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount_as_scoped(&provider)
            .await;

        let config = test_support::test_oidc_config(&provider.uri());
        let signer = LoginStateSigner::new(&config);
        let login_state = signer.issue().expect("issue state");

        let app = auth_app(test_support::auth_state(&provider.uri()));
        let cookie = format!("oauth_state={}", login_state.cookie_value);

        let response = app
            .oneshot(get_request(
                "/callback?code=test-code&state=attacker-chosen",
                Some(cookie),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"]["code"], "INVALID_STATE");

        drop(guard);
    }

    #[tokio::test]
    async fn test_callback_without_state_cookie_is_rejected() {
        let provider = test_support::start_provider().await;
        let app = auth_app(test_support::auth_state(&provider.uri()));

        let response = app
            .oneshot(get_request("/callback?code=test-code&state=abc", None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_callback_without_code_is_rejected() {
        let provider = test_support::start_provider().await;

        let config = test_support::test_oidc_config(&provider.uri());
        let signer = LoginStateSigner::new(&config);
        let login_state = signer.issue().expect("issue state");

        let app = auth_app(test_support::auth_state(&provider.uri()));
        let uri = format!("/callback?state={}", login_state.state);
        let cookie = format!("oauth_state={}", login_state.cookie_value);

        let response = app.oneshot(get_request(&uri, Some(cookie))).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"]["code"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn test_callback_surfaces_exchange_failure() {
        let provider = test_support::start_provider().await;

        Mock::given(method("POST"))
            .and(path(token_path()))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": "invalid_grant"
            })))
            .mount(&provider)
            .await;

        let config = test_support::test_oidc_config(&provider.uri());
        let signer = LoginStateSigner::new(&config);
        let login_state = signer.issue().expect("issue state");

        let app = auth_app(test_support::auth_state(&provider.uri()));
        let uri = format!("/callback?code=stale-code&state={}", login_state.state);
        let cookie = format!("oauth_state={}", login_state.cookie_value);

        let response = app.oneshot(get_request(&uri, Some(cookie))).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"]["code"], "TOKEN_EXCHANGE_FAILED");
    }

    #[tokio::test]
    async fn test_logout_redirects_to_end_session_with_hint() {
        let provider = test_support::start_provider().await;
        let config = test_support::test_oidc_config(&provider.uri());
        let app = auth_app(test_support::auth_state(&provider.uri()));

        let response = app
            .oneshot(get_request(
                "/logout",
                Some("jwt=whatever; id_token=the-id-token".to_string()),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FOUND);

        let location = response
            .headers()
            .get(header::LOCATION)
            .unwrap()
            .to_str()
            .unwrap();
        assert!(location.starts_with(&config.end_session_endpoint()));
        assert!(location.contains("id_token_hint=the-id-token"));
        assert!(location.contains("post_logout_redirect_uri=http%3A%2F%2Flocalhost%3A3000%2Flogin"));

        let cookies = set_cookies(&response);
        assert!(cookies
            .iter()
            .any(|c| c.starts_with("jwt=;") && c.contains("Max-Age=0")));
    }

    #[tokio::test]
    async fn test_logout_without_id_token_goes_to_login() {
        let provider = test_support::start_provider().await;
        let app = auth_app(test_support::auth_state(&provider.uri()));

        let response = app.oneshot(get_request("/logout", None)).await.unwrap();

        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/login");

        let cookies = set_cookies(&response);
        assert!(cookies
            .iter()
            .any(|c| c.starts_with("jwt=;") && c.contains("Max-Age=0")));
    }
}
