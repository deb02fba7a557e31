//! Admin sign-in and sign-out.
//!
//! Signing in is the one place a session is minted: the hosted auth service
//! issues it, we promote any pending invitation for the email, confirm the
//! account is an admin, and write the session cookie.

use askama::Template;
use axum::{
    Form,
    extract::State,
    http::{HeaderMap, HeaderValue, StatusCode, header::SET_COOKIE},
    response::{Html, IntoResponse, Redirect, Response},
};
use secrecy::SecretString;
use serde::Deserialize;
use tracing::instrument;

use opal_core::Email;

use crate::actions::DASHBOARD_PATH;
use crate::error::clear_sentry_user;
use crate::filters;
use crate::middleware::evaluate;
use crate::models::Session;
use crate::services::auth::{
    AUTH_COOKIE, AuthError, MIN_PASSWORD_LENGTH, SessionRead,
    cookie::{read_cookie, removal_cookie, session_cookie},
};
use crate::state::AppState;

/// Login page template.
#[derive(Template, Default)]
#[template(path = "admin/login.html")]
pub struct LoginTemplate {
    pub email: String,
    pub error: Option<String>,
    pub email_error: Option<String>,
    pub password_error: Option<String>,
}

impl LoginTemplate {
    fn failed(email: String, error: impl Into<String>) -> Self {
        Self {
            email,
            error: Some(error.into()),
            ..Self::default()
        }
    }

    fn respond(&self, status: StatusCode) -> Response {
        match self.render() {
            Ok(html) => (status, Html(html)).into_response(),
            Err(e) => {
                tracing::error!("Template render error: {e}");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Field-level checks, mirroring what the form shows next to each input.
fn validate(form: &LoginForm) -> Result<Email, LoginTemplate> {
    let email_error = if form.email.trim().is_empty() {
        Some("Email is required".to_string())
    } else if Email::parse(&form.email).is_err() {
        Some("Please enter a valid email address".to_string())
    } else {
        None
    };

    let password_error = if form.password.is_empty() {
        Some("Password is required".to_string())
    } else if form.password.chars().count() < MIN_PASSWORD_LENGTH {
        Some(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters"
        ))
    } else {
        None
    };

    match (Email::parse(&form.email), &email_error, &password_error) {
        (Ok(email), None, None) => Ok(email),
        _ => Err(LoginTemplate {
            email: form.email.trim().to_string(),
            error: None,
            email_error,
            password_error,
        }),
    }
}

/// `GET /admin/login`
///
/// An admin who is already signed in goes straight to the dashboard. The
/// session is checked with the auth service, since the cookie alone may
/// belong to a revoked session.
#[instrument(skip(state, headers))]
pub async fn login_page(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Some(cookie) = read_cookie(&headers, AUTH_COOKIE)
        && let SessionRead::Valid(session) = state.sessions().read_session(&cookie)
    {
        match state.sessions().get_user(&session.access_token).await {
            Ok(user) => {
                if let Ok(Some(_)) = state.admins().get_admin(user.id).await {
                    return Redirect::to(DASHBOARD_PATH).into_response();
                }
            }
            Err(e) => tracing::debug!(error = %e, "Existing session rejected by auth service"),
        }
    }

    LoginTemplate::default().respond(StatusCode::OK)
}

/// `POST /admin/login`
#[instrument(skip(state, form), fields(email = %form.email.trim()))]
pub async fn login(State(state): State<AppState>, Form(form): Form<LoginForm>) -> Response {
    let email = match validate(&form) {
        Ok(email) => email,
        Err(template) => return template.respond(StatusCode::BAD_REQUEST),
    };
    let password = SecretString::from(form.password);

    let session = match state.sessions().sign_in_with_password(&email, &password).await {
        Ok(session) => session,
        Err(AuthError::InvalidCredentials) => {
            tracing::info!("Sign-in rejected");
            return LoginTemplate::failed(email.to_string(), "Invalid email or password")
                .respond(StatusCode::UNAUTHORIZED);
        }
        Err(e) => {
            tracing::error!(error = %e, "Sign-in failed");
            return LoginTemplate::failed(
                email.to_string(),
                "Failed to connect to the authentication service. Please try again.",
            )
            .respond(StatusCode::BAD_GATEWAY);
        }
    };

    match state.admins().promote_pending(session.user.id, &email).await {
        Ok(true) => tracing::info!(user_id = %session.user.id, "Pending admin promoted"),
        Ok(false) => {}
        Err(e) => tracing::warn!(user_id = %session.user.id, error = %e, "Pending admin promotion failed"),
    }

    let identity = session.identity();
    let lookup = state.admins().get_admin(identity.user_id).await;
    if evaluate(&identity, lookup, state.config().admin_lookup_policy)
        .view()
        .is_none()
    {
        tracing::info!(user_id = %identity.user_id, "Signed-in account is not an admin");
        if let Err(e) = state.sessions().sign_out(&session.access_token).await {
            tracing::debug!(error = %e, "Sign-out of non-admin session failed");
        }
        return LoginTemplate::failed(email.to_string(), "You do not have admin access")
            .respond(StatusCode::FORBIDDEN);
    }

    tracing::info!(user_id = %identity.user_id, "Admin signed in");
    with_session_cookie(&state, &session, Redirect::to(DASHBOARD_PATH).into_response())
}

fn with_session_cookie(state: &AppState, session: &Session, mut response: Response) -> Response {
    let cookie = session_cookie(session, state.config().is_secure());
    if let Ok(value) = HeaderValue::from_str(&cookie.to_string()) {
        response.headers_mut().append(SET_COOKIE, value);
    }
    response
}

/// `POST /admin/logout`
///
/// Revokes the session with the auth service when there is one, and always
/// clears the cookie.
#[instrument(skip(state, headers))]
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Some(cookie) = read_cookie(&headers, AUTH_COOKIE)
        && let SessionRead::Valid(session) = state.sessions().read_session(&cookie)
    {
        if let Err(e) = state.sessions().sign_out(&session.access_token).await {
            tracing::warn!(error = %e, "Sign-out failed; clearing cookie anyway");
        }
        tracing::info!(user_id = %session.user.id, "Admin signed out");
    }
    clear_sentry_user();

    let mut response = Redirect::to(crate::middleware::interceptor::LOGIN_PATH).into_response();
    let cookie = removal_cookie(state.config().is_secure());
    if let Ok(value) = HeaderValue::from_str(&cookie.to_string()) {
        response.headers_mut().append(SET_COOKIE, value);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(email: &str, password: &str) -> LoginForm {
        LoginForm {
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[test]
    fn test_validate_accepts_good_input() {
        assert!(validate(&form("ada@opal.studio", "long-enough")).is_ok());
    }

    #[test]
    fn test_validate_reports_each_field() {
        let Err(template) = validate(&form("nope", "short")) else {
            panic!("expected validation failure");
        };
        assert_eq!(
            template.email_error.as_deref(),
            Some("Please enter a valid email address")
        );
        assert_eq!(
            template.password_error.as_deref(),
            Some("Password must be at least 8 characters")
        );

        let Err(template) = validate(&form("", "")) else {
            panic!("expected validation failure");
        };
        assert_eq!(template.email_error.as_deref(), Some("Email is required"));
        assert_eq!(template.password_error.as_deref(), Some("Password is required"));
    }
}
