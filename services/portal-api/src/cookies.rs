//! Cookie read/write helpers
//!
//! The browser session is three cookies: the access token, the ID token kept
//! around for the end-session hint, and the short-lived signed login state.
//! All are HttpOnly and SameSite=Lax; Lax is required because the provider
//! sends the browser back with a top-level redirect.

use axum::http::{header, HeaderMap};

/// Access token cookie
pub const JWT_COOKIE: &str = "jwt";

/// ID token cookie, held for the logout hint
pub const ID_TOKEN_COOKIE: &str = "id_token";

/// Signed login-state cookie
pub const STATE_COOKIE: &str = "oauth_state";

/// Token cookie lifetime
pub const TOKEN_COOKIE_MAX_AGE_SECS: u64 = 24 * 3600;

/// Build a Set-Cookie value
pub fn build(name: &str, value: &str, max_age_secs: u64, secure: bool) -> String {
    let mut cookie =
        format!("{name}={value}; Path=/; Max-Age={max_age_secs}; HttpOnly; SameSite=Lax");
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Build a Set-Cookie value that removes the cookie
pub fn clear(name: &str, secure: bool) -> String {
    build(name, "", 0, secure)
}

/// Find a cookie value in the request headers; first match wins
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    let cookie_header = headers.get(header::COOKIE)?.to_str().ok()?;

    for cookie in cookie_header.split(';') {
        if let Some((key, value)) = cookie.trim().split_once('=') {
            if key == name {
                return Some(value.to_string());
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_build_sets_attributes() {
        let cookie = build(JWT_COOKIE, "token-value", TOKEN_COOKIE_MAX_AGE_SECS, false);
        assert!(cookie.starts_with("jwt=token-value"));
        assert!(cookie.contains("Path=/"));
        assert!(cookie.contains("Max-Age=86400"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(!cookie.contains("Secure"));
    }

    #[test]
    fn test_build_appends_secure_for_https_hosts() {
        let cookie = build(ID_TOKEN_COOKIE, "v", 60, true);
        assert!(cookie.ends_with("; Secure"));
    }

    #[test]
    fn test_clear_expires_immediately() {
        let cookie = clear(JWT_COOKIE, false);
        assert!(cookie.starts_with("jwt=;"));
        assert!(cookie.contains("Max-Age=0"));
    }

    #[test]
    fn test_cookie_value_parses_multiple_cookies() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("jwt=abc.def.ghi; id_token=xyz; oauth_state=p.s"),
        );

        assert_eq!(cookie_value(&headers, "jwt").as_deref(), Some("abc.def.ghi"));
        assert_eq!(cookie_value(&headers, "id_token").as_deref(), Some("xyz"));
        assert_eq!(cookie_value(&headers, "oauth_state").as_deref(), Some("p.s"));
        assert_eq!(cookie_value(&headers, "session"), None);
    }

    #[test]
    fn test_cookie_value_requires_exact_name() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("jwt2=nope"));
        assert_eq!(cookie_value(&headers, "jwt"), None);
    }

    #[test]
    fn test_cookie_value_without_header() {
        let headers = HeaderMap::new();
        assert_eq!(cookie_value(&headers, "jwt"), None);
    }
}
