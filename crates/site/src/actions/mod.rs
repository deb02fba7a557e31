//! Content actions: every admin mutation goes through here.
//!
//! An action runs the repository call in the caller's RLS scope, so the
//! database decides who may write; there are no role checks in this layer.
//! On success it drops the cached pages that show the content. On failure it
//! logs and returns an [`ActionError`], which renders as an alert page.

pub mod admins;
pub mod blog;
pub mod bookings;
pub mod projects;
pub mod services;
pub mod settings;
pub mod testimonials;

use askama::Template;
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;

use opal_core::ContentKind;

use crate::db::{Actor, RepositoryError};
use crate::error::add_breadcrumb;
use crate::models::Identity;
use crate::services::auth::AuthError;
use crate::state::AppState;

/// Admin dashboard path; its counts change with almost every action.
pub const DASHBOARD_PATH: &str = "/admin/dashboard";

/// Why an action failed.
#[derive(Debug, Error)]
pub enum Failure {
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    /// The input was rejected before reaching the database.
    #[error("{0}")]
    Invalid(String),
}

/// A failed content action.
#[derive(Debug, Error)]
#[error("failed to {verb} {kind}: {failure}")]
pub struct ActionError {
    pub kind: ContentKind,
    pub verb: &'static str,
    #[source]
    pub failure: Failure,
}

impl ActionError {
    /// Build and log an action error.
    pub fn new(kind: ContentKind, verb: &'static str, failure: impl Into<Failure>) -> Self {
        let err = Self {
            kind,
            verb,
            failure: failure.into(),
        };
        if err.status().is_server_error() {
            tracing::error!(kind = %kind, verb, error = %err.failure, "Action failed");
        } else {
            tracing::warn!(kind = %kind, verb, error = %err.failure, "Action rejected");
        }
        err
    }

    /// Shorthand for `map_err` on repository calls.
    pub fn repo(kind: ContentKind, verb: &'static str) -> impl FnOnce(RepositoryError) -> Self {
        move |e| Self::new(kind, verb, e)
    }

    /// Reject the input without touching the database.
    pub fn invalid(kind: ContentKind, verb: &'static str, message: impl Into<String>) -> Self {
        Self::new(kind, verb, Failure::Invalid(message.into()))
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        match &self.failure {
            Failure::Invalid(_) => StatusCode::BAD_REQUEST,
            Failure::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
            Failure::Repository(RepositoryError::Conflict(_)) => StatusCode::CONFLICT,
            Failure::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Failure::Auth(AuthError::UserAlreadyExists) => StatusCode::CONFLICT,
            Failure::Auth(AuthError::WeakPassword(_) | AuthError::InvalidEmail(_)) => {
                StatusCode::BAD_REQUEST
            }
            Failure::Auth(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// Text for the alert; never includes database internals.
    #[must_use]
    pub fn user_message(&self) -> String {
        let reason = match &self.failure {
            Failure::Invalid(message) => message.clone(),
            Failure::Repository(RepositoryError::Conflict(what)) => what.clone(),
            Failure::Repository(RepositoryError::NotFound) => {
                format!("the {} no longer exists or you cannot edit it", self.kind)
            }
            Failure::Repository(_) => "a database error occurred, please try again".to_string(),
            Failure::Auth(AuthError::UserAlreadyExists) => {
                "an account with this email already exists".to_string()
            }
            Failure::Auth(AuthError::WeakPassword(message)) => message.clone(),
            Failure::Auth(AuthError::InvalidEmail(_)) => "invalid email address".to_string(),
            Failure::Auth(_) => "the authentication service is unavailable".to_string(),
        };
        format!("Failed to {} {}: {reason}", self.verb, self.kind)
    }
}

/// Alert page shown when an action fails.
#[derive(Template)]
#[template(path = "admin/alert.html")]
struct AlertTemplate<'a> {
    message: &'a str,
    back_href: &'a str,
}

impl IntoResponse for ActionError {
    fn into_response(self) -> Response {
        if self.status().is_server_error() {
            sentry::capture_error(&self);
        }

        let message = self.user_message();
        let template = AlertTemplate {
            message: &message,
            back_href: admin_list_path(self.kind),
        };
        let body = template.render().unwrap_or_else(|e| {
            tracing::error!("Template render error: {e}");
            message.clone()
        });

        (self.status(), Html(body)).into_response()
    }
}

/// Admin page listing `kind`.
#[must_use]
pub const fn admin_list_path(kind: ContentKind) -> &'static str {
    match kind {
        ContentKind::Project => "/admin/projects",
        ContentKind::Service => "/admin/services",
        ContentKind::BlogPost => "/admin/blog",
        ContentKind::Testimonial => "/admin/testimonials",
        ContentKind::Booking => "/admin/bookings",
        ContentKind::Admin => "/admin/admins",
        ContentKind::Settings => "/admin/settings",
    }
}

/// RLS scope for an admin acting through the CMS.
pub(crate) fn actor(identity: &Identity) -> Actor {
    Actor::Authenticated(identity.clone())
}

/// Treat a missing or blank required field as invalid input.
pub(crate) fn require(
    kind: ContentKind,
    fields: &[(&str, Option<&str>)],
) -> Result<(), ActionError> {
    let missing: Vec<&str> = fields
        .iter()
        .filter(|(_, value)| value.is_none_or(|v| v.trim().is_empty()))
        .map(|(name, _)| *name)
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ActionError::invalid(
            kind,
            "save",
            format!("missing required fields: {}", missing.join(", ")),
        ))
    }
}

/// Drop cached copies of `paths` and leave a breadcrumb for the action.
pub(crate) async fn settle(state: &AppState, kind: ContentKind, verb: &str, paths: &[String]) {
    state.pages().invalidate(paths).await;
    add_breadcrumb(
        "action",
        &format!("{verb} {kind}"),
        Some(&[("invalidated", &paths.join(","))]),
    );
    tracing::info!(kind = %kind, verb, paths = ?paths, "Action succeeded");
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_require_lists_blank_fields() {
        assert!(require(ContentKind::Project, &[("title", Some("Atlas"))]).is_ok());

        let err = require(
            ContentKind::Project,
            &[("title", Some("  ")), ("category", None), ("description", Some("x"))],
        )
        .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            err.user_message(),
            "Failed to save project: missing required fields: title, category"
        );
    }

    #[test]
    fn test_status_and_message_hide_internals() {
        let err = ActionError::new(
            ContentKind::BlogPost,
            "save",
            RepositoryError::DataCorruption("bad status column".to_string()),
        );
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.user_message().contains("bad status column"));

        let err = ActionError::new(
            ContentKind::BlogPost,
            "save",
            RepositoryError::Conflict("slug already exists".to_string()),
        );
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert_eq!(
            err.user_message(),
            "Failed to save blog post: slug already exists"
        );
    }

    #[test]
    fn test_alert_response_status() {
        let err = ActionError::new(
            ContentKind::Testimonial,
            "delete",
            RepositoryError::NotFound,
        );
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
