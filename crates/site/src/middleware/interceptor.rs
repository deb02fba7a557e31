//! Edge interceptor: runs before routing on every non-asset request.
//!
//! 1. Strips any client-supplied identity header.
//! 2. Reads the session cookie passively; an expired (or nearly expired)
//!    session is refreshed through the [`RefreshCoordinator`]. This is the
//!    only place in the site that refreshes.
//! 3. Redirects signed-out `GET`s under `/admin` to the login page.
//! 4. Stamps a signed identity header and a fresh [`AuthContext`] onto the
//!    forwarded request.
//! 5. After a refresh, rewrites the forwarded request's cookie and sends the
//!    new session back in `Set-Cookie`.
//!
//! Auth failures here never fail the request. A refresh that loses a race
//! with another process is treated as "no session"; the protected layout
//! decides what that means for the page.
//!
//! [`RefreshCoordinator`]: crate::services::auth::RefreshCoordinator

use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderValue, Method, header::SET_COOKIE},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use chrono::{Duration, Utc};

use super::identity::IDENTITY_HEADER;
use super::resolver::AuthContext;
use crate::models::Session;
use crate::services::auth::{
    AUTH_COOKIE, AuthError, SessionRead,
    cookie::{read_cookie, replace_request_cookie, session_cookie},
};
use crate::state::AppState;

/// Refresh sessions this close to expiry so the page does not expire mid-render.
const REFRESH_MARGIN_SECS: i64 = 60;

/// File extensions served without any session work.
const ASSET_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "svg", "webp", "ico", "css", "js", "woff", "woff2", "map", "txt",
];

/// Login page path; the one admin path open to signed-out visitors.
pub const LOGIN_PATH: &str = "/admin/login";

/// Whether `path` is a static asset.
#[must_use]
pub fn is_static_asset(path: &str) -> bool {
    if path.starts_with("/static/") {
        return true;
    }
    path.rsplit('/')
        .next()
        .and_then(|segment| segment.rsplit_once('.'))
        .is_some_and(|(_, ext)| {
            ASSET_EXTENSIONS
                .iter()
                .any(|candidate| candidate.eq_ignore_ascii_case(ext))
        })
}

/// Whether a signed-out request to `path` with `method` must go to the login page.
#[must_use]
pub fn requires_login(path: &str, method: &Method) -> bool {
    let is_admin = path == "/admin" || path.starts_with("/admin/");
    let is_login = path
        .strip_prefix(LOGIN_PATH)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'));
    is_admin && !is_login && method == Method::GET
}

/// What the interceptor learned about the caller.
struct Established {
    session: Option<Session>,
    refreshed: bool,
}

impl Established {
    const fn none() -> Self {
        Self {
            session: None,
            refreshed: false,
        }
    }
}

async fn establish_session(state: &AppState, headers: &HeaderMap) -> Established {
    let Some(cookie) = read_cookie(headers, AUTH_COOKIE) else {
        return Established::none();
    };

    match state.sessions().read_session(&cookie) {
        SessionRead::Valid(session)
            if !session.expires_within(Utc::now(), Duration::seconds(REFRESH_MARGIN_SECS)) =>
        {
            Established {
                session: Some(session),
                refreshed: false,
            }
        }
        SessionRead::Valid(session) => match refresh(state, &session.refresh_token).await {
            Some(fresh) => Established {
                session: Some(fresh),
                refreshed: true,
            },
            // Still valid for a little while; keep it.
            None => Established {
                session: Some(session),
                refreshed: false,
            },
        },
        SessionRead::Expired { refresh_token } => match refresh(state, &refresh_token).await {
            Some(fresh) => Established {
                session: Some(fresh),
                refreshed: true,
            },
            None => Established::none(),
        },
        SessionRead::Absent => Established::none(),
    }
}

async fn refresh(state: &AppState, refresh_token: &str) -> Option<Session> {
    match state
        .refresher()
        .refresh(state.sessions(), refresh_token)
        .await
    {
        Ok(session) => {
            tracing::debug!(user_id = %session.user.id, "Session refreshed");
            Some(session)
        }
        Err(AuthError::RefreshTokenAlreadyUsed) => {
            tracing::info!("Refresh token already used elsewhere; continuing without a session");
            None
        }
        Err(e) => {
            tracing::warn!(error = %e, "Session refresh failed; continuing without a session");
            None
        }
    }
}

/// The edge interceptor middleware.
pub async fn edge_interceptor(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_owned();
    if is_static_asset(&path) {
        return next.run(request).await;
    }

    request.headers_mut().remove(IDENTITY_HEADER);

    let Established { session, refreshed } = establish_session(&state, request.headers()).await;

    if session.is_none() && requires_login(&path, request.method()) {
        tracing::debug!(path = %path, "Signed-out request to admin; redirecting to login");
        return Redirect::to(LOGIN_PATH).into_response();
    }

    if let Some(session) = &session {
        let capability = state.signer().sign(&session.identity());
        if let Ok(value) = HeaderValue::from_str(&capability) {
            request.headers_mut().insert(IDENTITY_HEADER, value);
        }
        if refreshed {
            replace_request_cookie(request.headers_mut(), session);
        }
    }
    request.extensions_mut().insert(AuthContext::new());

    let mut response = next.run(request).await;

    if let Some(session) = session.filter(|_| refreshed) {
        let cookie = session_cookie(&session, state.config().is_secure());
        if let Ok(value) = HeaderValue::from_str(&cookie.to_string()) {
            response.headers_mut().append(SET_COOKIE, value);
        }
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_static_asset() {
        assert!(is_static_asset("/static/css/site.css"));
        assert!(is_static_asset("/favicon.ico"));
        assert!(is_static_asset("/images/hero.WEBP"));
        assert!(is_static_asset("/robots.txt"));
        assert!(!is_static_asset("/admin/dashboard"));
        assert!(!is_static_asset("/blog/why-rust.matters"));
        assert!(!is_static_asset("/"));
    }

    #[test]
    fn test_requires_login() {
        assert!(requires_login("/admin", &Method::GET));
        assert!(requires_login("/admin/dashboard", &Method::GET));
        assert!(!requires_login("/admin/login", &Method::GET));
        assert!(requires_login("/admin/loginx", &Method::GET));
        assert!(requires_login("/admin/login-help", &Method::GET));
        assert!(!requires_login("/admin/dashboard", &Method::POST));
        assert!(!requires_login("/administrator", &Method::GET));
        assert!(!requires_login("/work", &Method::GET));
    }
}
