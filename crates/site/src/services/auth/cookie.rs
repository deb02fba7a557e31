//! The auth session cookie.
//!
//! One cookie, `opal-auth-token`, holds the whole session as
//! base64url-encoded JSON. It is `HttpOnly`, `SameSite=Lax`, scoped to `/`,
//! and `Secure` whenever the site is served over https.

use axum::http::{HeaderMap, HeaderValue, header::COOKIE};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use tower_sessions::cookie::time::Duration;
use tower_sessions::cookie::{Cookie, SameSite};

use super::AuthError;
use crate::models::Session;

/// Name of the auth session cookie.
pub const AUTH_COOKIE: &str = "opal-auth-token";

/// Cookie lifetime. The refresh token outlives the access token by far.
const COOKIE_MAX_AGE_DAYS: i64 = 30;

/// Encode a session as a cookie value.
#[must_use]
pub fn encode_session(session: &Session) -> String {
    // Serializing plain strings and a timestamp cannot fail.
    let json = serde_json::to_vec(session).unwrap_or_default();
    URL_SAFE_NO_PAD.encode(json)
}

/// Decode a cookie value back into a session.
///
/// # Errors
///
/// Returns `AuthError::InvalidSession` if the value is not base64url JSON of a session.
pub fn decode_session(value: &str) -> Result<Session, AuthError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(value.trim())
        .map_err(|e| AuthError::InvalidSession(format!("cookie is not base64url: {e}")))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| AuthError::InvalidSession(format!("cookie is not a session: {e}")))
}

/// The `Set-Cookie` for a session.
#[must_use]
pub fn session_cookie(session: &Session, secure: bool) -> Cookie<'static> {
    Cookie::build((AUTH_COOKIE, encode_session(session)))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(Duration::days(COOKIE_MAX_AGE_DAYS))
        .build()
}

/// The `Set-Cookie` that clears the session.
#[must_use]
pub fn removal_cookie(secure: bool) -> Cookie<'static> {
    Cookie::build((AUTH_COOKIE, ""))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(Duration::ZERO)
        .build()
}

/// Value of the named cookie across all `Cookie` headers.
#[must_use]
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .find(|cookie| cookie.name() == name)
        .map(|cookie| cookie.value().to_owned())
}

/// Replace (or add) the auth cookie on a request's `Cookie` header, keeping the others.
pub fn replace_request_cookie(headers: &mut HeaderMap, session: &Session) {
    let mut pairs: Vec<String> = headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .filter(|cookie| cookie.name() != AUTH_COOKIE)
        .map(|cookie| format!("{}={}", cookie.name(), cookie.value()))
        .collect();
    pairs.push(format!("{AUTH_COOKIE}={}", encode_session(session)));

    headers.remove(COOKIE);
    if let Ok(value) = HeaderValue::from_str(&pairs.join("; ")) {
        headers.insert(COOKIE, value);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use opal_core::UserId;

    use super::*;
    use crate::models::AuthUser;

    fn session() -> Session {
        Session {
            access_token: "access".to_string(),
            refresh_token: "refresh".to_string(),
            expires_at: Utc::now(),
            user: AuthUser {
                id: UserId::generate(),
                email: Some("ada@opal.studio".to_string()),
            },
        }
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode_session("not base64 !!").is_err());
        assert!(decode_session(&URL_SAFE_NO_PAD.encode("{}")).is_err());
    }

    #[test]
    fn test_session_cookie_attributes() {
        let cookie = session_cookie(&session(), true);
        assert_eq!(cookie.name(), AUTH_COOKIE);
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.path(), Some("/"));
    }

    #[test]
    fn test_read_cookie_among_others() {
        let session = session();
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_str(&format!(
                "theme=dark; {AUTH_COOKIE}={}; other=1",
                encode_session(&session)
            ))
            .unwrap(),
        );

        let value = read_cookie(&headers, AUTH_COOKIE).unwrap();
        assert_eq!(decode_session(&value).unwrap(), session);
        assert_eq!(read_cookie(&headers, "missing"), None);
    }

    #[test]
    fn test_replace_request_cookie_keeps_other_cookies() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("theme=dark; opal-auth-token=stale"),
        );

        let fresh = session();
        replace_request_cookie(&mut headers, &fresh);

        assert_eq!(read_cookie(&headers, "theme").as_deref(), Some("dark"));
        let value = read_cookie(&headers, AUTH_COOKIE).unwrap();
        assert_eq!(decode_session(&value).unwrap(), fresh);
    }
}
