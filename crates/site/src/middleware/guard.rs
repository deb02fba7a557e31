//! Protected layout guard for the admin area.
//!
//! Every admin page load evaluates the guard afresh: who is the caller, and
//! do they have an admin record? The decision itself is the pure function
//! [`evaluate`]; the extractors gather its inputs and turn the decision into
//! a redirect or an [`AdminView`] for the page.
//!
//! When the admin record cannot be read (as opposed to not existing), the
//! configured [`AdminLookupFailurePolicy`] decides. Failing open renders the
//! page with a generic view so a flaky database does not lock admins out;
//! row-level security still guards every read and write the page makes.

use axum::{
    extract::FromRequestParts,
    http::request::Parts,
    response::{IntoResponse, Redirect, Response},
};

use crate::config::AdminLookupFailurePolicy;
use crate::db::RepositoryError;
use crate::error::set_sentry_user;
use crate::middleware::interceptor::LOGIN_PATH;
use crate::middleware::resolver::MaybeIdentity;
use crate::models::{Admin, AdminView, Identity};
use crate::state::AppState;
use opal_core::AdminRole;

/// Where non-super-admins land when they open a super-admin page.
pub const DASHBOARD_PATH: &str = "/admin/dashboard";

/// Name shown when the admin record could not be read.
const DEGRADED_NAME: &str = "User";

/// Name shown when an admin has no first name.
const DEFAULT_NAME: &str = "Admin";

/// Outcome of the layout guard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// No identity on the request.
    Unauthenticated,
    /// Signed in, but not an admin.
    AuthenticatedNoRecord,
    /// Signed-in admin.
    Authorized(AdminView),
    /// Signed in; the admin record could not be read and the policy fails open.
    Degraded(AdminView),
    /// Signed in; the admin record could not be read and the policy fails closed.
    LookupFailed,
}

impl GuardDecision {
    /// The view to render with, if the page may render at all.
    #[must_use]
    pub fn view(self) -> Option<AdminView> {
        match self {
            Self::Authorized(view) | Self::Degraded(view) => Some(view),
            Self::Unauthenticated | Self::AuthenticatedNoRecord | Self::LookupFailed => None,
        }
    }
}

/// Decide what a caller may see.
#[must_use]
pub fn evaluate(
    identity: &Identity,
    lookup: Result<Option<Admin>, RepositoryError>,
    policy: AdminLookupFailurePolicy,
) -> GuardDecision {
    match lookup {
        Ok(Some(admin)) => GuardDecision::Authorized(AdminView {
            user_id: identity.user_id,
            name: admin
                .first_name
                .as_deref()
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .unwrap_or(DEFAULT_NAME)
                .to_owned(),
            email: admin.email.unwrap_or_else(|| identity.email.clone()),
            role: admin.role,
            degraded: false,
        }),
        Ok(None) => GuardDecision::AuthenticatedNoRecord,
        Err(e) => match policy {
            AdminLookupFailurePolicy::FailOpen => {
                tracing::warn!(user_id = %identity.user_id, error = %e, "Admin lookup failed; rendering degraded view");
                GuardDecision::Degraded(AdminView {
                    user_id: identity.user_id,
                    name: DEGRADED_NAME.to_owned(),
                    email: identity.email.clone(),
                    role: AdminRole::Admin,
                    degraded: true,
                })
            }
            AdminLookupFailurePolicy::FailClosed => {
                tracing::warn!(user_id = %identity.user_id, error = %e, "Admin lookup failed; denying");
                GuardDecision::LookupFailed
            }
        },
    }
}

/// Resolve the identity and evaluate the guard for a request.
pub async fn guard(state: &AppState, identity: Option<Identity>) -> GuardDecision {
    let Some(identity) = identity else {
        return GuardDecision::Unauthenticated;
    };

    let lookup = state.admins().get_admin(identity.user_id).await;
    let decision = evaluate(&identity, lookup, state.config().admin_lookup_policy);

    if let GuardDecision::Authorized(view) | GuardDecision::Degraded(view) = &decision {
        set_sentry_user(&view.user_id, Some(&view.email));
    }
    decision
}

/// Error returned when the admin guard rejects a request.
pub enum GuardRejection {
    /// Not signed in, not an admin, or the admin lookup failed closed.
    RedirectToLogin,
    /// Signed-in admin without the super admin role.
    RedirectToDashboard,
}

impl IntoResponse for GuardRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin => Redirect::to(LOGIN_PATH).into_response(),
            Self::RedirectToDashboard => Redirect::to(DASHBOARD_PATH).into_response(),
        }
    }
}

/// Extractor that requires an admin.
///
/// # Example
///
/// ```rust,ignore
/// async fn dashboard(RequireAdmin(admin): RequireAdmin) -> impl IntoResponse {
///     format!("Welcome back, {}", admin.name)
/// }
/// ```
pub struct RequireAdmin(pub AdminView);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = GuardRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Ok(MaybeIdentity(identity)) = MaybeIdentity::from_request_parts(parts, state).await;

        guard(state, identity)
            .await
            .view()
            .map(Self)
            .ok_or(GuardRejection::RedirectToLogin)
    }
}

/// Extractor that requires a super admin.
///
/// Standard admins are sent to the dashboard rather than shown an error.
pub struct RequireSuperAdmin(pub AdminView);

impl FromRequestParts<AppState> for RequireSuperAdmin {
    type Rejection = GuardRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let RequireAdmin(admin) = RequireAdmin::from_request_parts(parts, state).await?;

        if !admin.is_super_admin() {
            tracing::info!(user_id = %admin.user_id, "Non-super admin opened a super admin page");
            return Err(GuardRejection::RedirectToDashboard);
        }

        Ok(Self(admin))
    }
}

/// One entry in the admin sidebar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavItem {
    pub href: &'static str,
    pub label: &'static str,
    pub active: bool,
}

/// Sidebar entries for `role`, marking the one that contains `current_path`.
#[must_use]
pub fn nav_items(role: AdminRole, current_path: &str) -> Vec<NavItem> {
    const STANDARD: &[(&str, &str)] = &[
        ("/admin/dashboard", "Overview"),
        ("/admin/services", "Services"),
        ("/admin/projects", "Projects"),
        ("/admin/blog", "Blog Posts"),
        ("/admin/testimonials", "Testimonials"),
        ("/admin/bookings", "Bookings"),
    ];
    const SUPER_ONLY: &[(&str, &str)] = &[
        ("/admin/admins", "Admins"),
        ("/admin/settings", "Site Settings"),
    ];

    let extra: &[(&str, &str)] = if role.is_super_admin() { SUPER_ONLY } else { &[] };

    STANDARD
        .iter()
        .chain(extra)
        .map(|&(href, label)| NavItem {
            href,
            label,
            active: current_path == href
                || current_path
                    .strip_prefix(href)
                    .is_some_and(|rest| rest.starts_with('/')),
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use opal_core::UserId;

    use super::*;

    fn identity() -> Identity {
        Identity {
            user_id: UserId::generate(),
            email: "ada@opal.studio".to_string(),
        }
    }

    fn admin(identity: &Identity, first_name: Option<&str>, role: AdminRole) -> Admin {
        Admin {
            id: identity.user_id,
            email: None,
            first_name: first_name.map(String::from),
            last_name: None,
            role,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_authorized_uses_first_name() {
        let identity = identity();
        let decision = evaluate(
            &identity,
            Ok(Some(admin(&identity, Some("Ada"), AdminRole::SuperAdmin))),
            AdminLookupFailurePolicy::FailOpen,
        );

        let GuardDecision::Authorized(view) = decision else {
            panic!("expected authorized");
        };
        assert_eq!(view.name, "Ada");
        assert_eq!(view.email, "ada@opal.studio");
        assert!(view.is_super_admin());
        assert!(!view.degraded);
    }

    #[test]
    fn test_authorized_without_name_defaults() {
        let identity = identity();
        let view = evaluate(
            &identity,
            Ok(Some(admin(&identity, Some("  "), AdminRole::Admin))),
            AdminLookupFailurePolicy::FailOpen,
        )
        .view()
        .unwrap();
        assert_eq!(view.name, "Admin");
    }

    #[test]
    fn test_no_record() {
        let identity = identity();
        assert_eq!(
            evaluate(&identity, Ok(None), AdminLookupFailurePolicy::FailOpen),
            GuardDecision::AuthenticatedNoRecord
        );
    }

    #[test]
    fn test_lookup_error_fail_open_degrades() {
        let identity = identity();
        let decision = evaluate(
            &identity,
            Err(RepositoryError::DataCorruption("boom".to_string())),
            AdminLookupFailurePolicy::FailOpen,
        );

        let GuardDecision::Degraded(view) = decision else {
            panic!("expected degraded");
        };
        assert_eq!(view.name, "User");
        assert_eq!(view.role, AdminRole::Admin);
        assert!(view.degraded);
    }

    #[test]
    fn test_lookup_error_fail_closed_denies() {
        let identity = identity();
        let decision = evaluate(
            &identity,
            Err(RepositoryError::DataCorruption("boom".to_string())),
            AdminLookupFailurePolicy::FailClosed,
        );
        assert_eq!(decision, GuardDecision::LookupFailed);
        assert!(decision.view().is_none());
    }

    #[test]
    fn test_nav_items_by_role() {
        let standard = nav_items(AdminRole::Admin, "/admin/projects/new");
        assert!(standard.iter().all(|item| item.label != "Admins"));
        assert!(standard.iter().all(|item| item.label != "Site Settings"));
        let active: Vec<_> = standard.iter().filter(|i| i.active).map(|i| i.href).collect();
        assert_eq!(active, vec!["/admin/projects"]);

        let super_admin = nav_items(AdminRole::SuperAdmin, "/admin/settings");
        assert!(super_admin.iter().any(|item| item.href == "/admin/admins"));
        assert!(
            super_admin
                .iter()
                .any(|item| item.href == "/admin/settings" && item.active)
        );
    }
}
