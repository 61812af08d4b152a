//! Session transport
//!
//! Locates the raw session token on an inbound request and builds the
//! `Set-Cookie` values used to deliver or clear it.
//!
//! Precedence: with `SessionTransport::Both`, an `Authorization: Bearer`
//! header is used when present and the cookie is only consulted when the
//! header is absent. The single-transport modes ignore the other channel.

use hyper::header::{AUTHORIZATION, COOKIE};
use hyper::HeaderMap;
use std::time::Duration;

use crate::config::SessionTransport;

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "jwt";

/// Extract token from an Authorization header value.
/// Only the "Bearer <token>" form is accepted.
pub fn extract_bearer(auth_header: Option<&str>) -> Option<&str> {
    let token = auth_header?.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

/// Extract a named cookie from a Cookie header value
pub fn extract_cookie<'a>(cookie_header: Option<&'a str>, name: &str) -> Option<&'a str> {
    cookie_header?
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim())
        .filter(|value| !value.is_empty())
}

/// Extract the session token according to the configured transport
pub fn extract_session_token(headers: &HeaderMap, transport: SessionTransport) -> Option<String> {
    let from_header = || {
        let header = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok());
        extract_bearer(header).map(str::to_string)
    };
    let from_cookie = || {
        headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find_map(|v| extract_cookie(Some(v), SESSION_COOKIE))
            .map(str::to_string)
    };

    match transport {
        SessionTransport::Bearer => from_header(),
        SessionTransport::Cookie => from_cookie(),
        SessionTransport::Both => from_header().or_else(from_cookie),
    }
}

/// `Set-Cookie` value delivering a session token
pub fn session_cookie(token: &str, ttl: Duration, secure: bool) -> String {
    let mut cookie = format!(
        "{}={}; HttpOnly; SameSite=Strict; Path=/; Max-Age={}",
        SESSION_COOKIE,
        token,
        ttl.as_secs()
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// `Set-Cookie` value that removes the session cookie
pub fn clear_session_cookie() -> String {
    format!(
        "{}=; HttpOnly; SameSite=Strict; Path=/; Max-Age=0",
        SESSION_COOKIE
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::header::HeaderValue;

    fn headers(auth: Option<&'static str>, cookie: Option<&'static str>) -> HeaderMap {
        let mut map = HeaderMap::new();
        if let Some(a) = auth {
            map.insert(AUTHORIZATION, HeaderValue::from_static(a));
        }
        if let Some(c) = cookie {
            map.insert(COOKIE, HeaderValue::from_static(c));
        }
        map
    }

    #[test]
    fn test_extract_bearer() {
        assert_eq!(extract_bearer(Some("Bearer abc123")), Some("abc123"));
        assert_eq!(extract_bearer(Some("Bearer ")), None);
        assert_eq!(extract_bearer(Some("Basic abc123")), None);
        assert_eq!(extract_bearer(Some("abc123")), None);
        assert_eq!(extract_bearer(None), None);
    }

    #[test]
    fn test_extract_cookie() {
        assert_eq!(extract_cookie(Some("jwt=abc"), "jwt"), Some("abc"));
        assert_eq!(
            extract_cookie(Some("theme=dark; jwt=abc; lang=en"), "jwt"),
            Some("abc")
        );
        assert_eq!(extract_cookie(Some("xjwt=abc"), "jwt"), None);
        assert_eq!(extract_cookie(Some("jwt="), "jwt"), None);
        assert_eq!(extract_cookie(None, "jwt"), None);
    }

    #[test]
    fn test_transport_precedence() {
        let both = headers(Some("Bearer from-header"), Some("jwt=from-cookie"));

        assert_eq!(
            extract_session_token(&both, SessionTransport::Both).as_deref(),
            Some("from-header")
        );
        assert_eq!(
            extract_session_token(&both, SessionTransport::Cookie).as_deref(),
            Some("from-cookie")
        );
        assert_eq!(
            extract_session_token(&both, SessionTransport::Bearer).as_deref(),
            Some("from-header")
        );

        let cookie_only = headers(None, Some("jwt=from-cookie"));
        assert_eq!(
            extract_session_token(&cookie_only, SessionTransport::Both).as_deref(),
            Some("from-cookie")
        );
        assert_eq!(extract_session_token(&cookie_only, SessionTransport::Bearer), None);
    }

    #[test]
    fn test_cookie_values() {
        let set = session_cookie("tok", Duration::from_secs(60), true);
        assert!(set.starts_with("jwt=tok;"));
        assert!(set.contains("HttpOnly"));
        assert!(set.contains("Max-Age=60"));
        assert!(set.ends_with("; Secure"));

        assert!(clear_session_cookie().contains("Max-Age=0"));
    }
}
