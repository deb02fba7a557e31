//! Admin CMS routes.
//!
//! # Route Structure
//!
//! ```text
//! GET  /admin                          - Redirect to dashboard
//! GET  /admin/login                    - Login form
//! POST /admin/login                    - Sign in
//! POST /admin/logout                   - Sign out
//! GET  /admin/dashboard                - Counts and recent bookings
//!
//! # Content (projects, services, blog, testimonials)
//! GET  /admin/{kind}                   - List
//! GET  /admin/{kind}/new               - New form
//! POST /admin/{kind}                   - Create
//! GET  /admin/{kind}/{id}              - Edit form
//! POST /admin/{kind}/{id}              - Update
//! POST /admin/{kind}/{id}/delete       - Delete
//!
//! # Bookings
//! GET  /admin/bookings                 - List
//! GET  /admin/bookings/{id}            - Detail with workflow form
//! POST /admin/bookings/{id}            - Update status and notes
//! POST /admin/bookings/{id}/delete     - Delete
//!
//! # Super admin only
//! GET  /admin/admins                   - Admins and pending admins
//! GET  /admin/admins/new               - Add admin form
//! POST /admin/admins                   - Add admin
//! POST /admin/admins/{id}/role         - Change role
//! POST /admin/admins/{id}/delete       - Remove admin
//! POST /admin/admins/pending/{id}/delete - Withdraw invitation
//! GET  /admin/settings                 - Site settings form
//! POST /admin/settings                 - Save site settings
//!
//! # Uploads
//! POST /admin/uploads                  - Upload an image, returns `{url}`
//! POST /admin/uploads/delete           - Delete an uploaded image
//! ```

pub mod admins;
pub mod auth;
pub mod blog;
pub mod bookings;
pub mod dashboard;
pub mod projects;
pub mod services;
pub mod settings;
pub mod testimonials;
pub mod uploads;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    response::{Html, Redirect},
    routing::{get, post},
};
use tower_sessions::Session;

use crate::error::Result;
use crate::middleware::{NavItem, nav_items, take_flash};
use crate::models::AdminView;
use crate::services::storage::MAX_UPLOAD_BYTES;
use crate::state::AppState;

/// Multipart framing allowance on top of the largest accepted image.
const UPLOAD_OVERHEAD_BYTES: usize = 64 * 1024;

/// The parts of every admin page outside the main content.
pub struct AdminChrome {
    pub admin: AdminView,
    pub nav: Vec<NavItem>,
    pub flash: Option<String>,
}

impl AdminChrome {
    /// Build the chrome for `current_path`, consuming any pending flash notice.
    pub async fn new(admin: AdminView, current_path: &str, session: &Session) -> Self {
        let nav = nav_items(admin.role, current_path);
        let flash = take_flash(session).await;
        Self { admin, nav, flash }
    }
}

/// Render an admin fragment through the page cache under `key`.
///
/// Degraded views bypass the cache: their reads may have been filtered by
/// row-level security and must not be served to other admins.
pub(crate) async fn fragment<F>(
    state: &AppState,
    admin: &AdminView,
    key: &str,
    render: F,
) -> Result<String>
where
    F: Future<Output = Result<String>>,
{
    if admin.degraded {
        return render.await;
    }
    let html = state.pages().get_or_render(key, render).await?;
    Ok(html.as_ref().clone())
}

/// Render a full page template.
pub(crate) fn page(template: &impl askama::Template) -> Result<Html<String>> {
    Ok(Html(template.render()?))
}

/// Trimmed text for a nullable column; an empty string clears it.
pub(crate) fn optional(value: String) -> Option<String> {
    Some(value.trim().to_string())
}

/// Trimmed text for a required column; blank means "leave unchanged".
pub(crate) fn required(value: String) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Parse an optional number field; blank means "leave unchanged".
pub(crate) fn number<T: std::str::FromStr>(value: &str) -> std::result::Result<Option<T>, String> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    value
        .parse()
        .map(Some)
        .map_err(|_| format!("'{value}' is not a number"))
}

/// Create the admin router (mounted at `/admin`).
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(|| async { Redirect::to(crate::actions::DASHBOARD_PATH) }))
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/dashboard", get(dashboard::index))
        // Projects
        .route("/projects", get(projects::index).post(projects::create))
        .route("/projects/new", get(projects::new))
        .route("/projects/{id}", get(projects::edit).post(projects::update))
        .route("/projects/{id}/delete", post(projects::delete))
        // Services
        .route("/services", get(services::index).post(services::create))
        .route("/services/new", get(services::new))
        .route("/services/{id}", get(services::edit).post(services::update))
        .route("/services/{id}/delete", post(services::delete))
        // Blog
        .route("/blog", get(blog::index).post(blog::create))
        .route("/blog/new", get(blog::new))
        .route("/blog/{id}", get(blog::edit).post(blog::update))
        .route("/blog/{id}/delete", post(blog::delete))
        // Testimonials
        .route(
            "/testimonials",
            get(testimonials::index).post(testimonials::create),
        )
        .route("/testimonials/new", get(testimonials::new))
        .route(
            "/testimonials/{id}",
            get(testimonials::edit).post(testimonials::update),
        )
        .route("/testimonials/{id}/delete", post(testimonials::delete))
        // Bookings
        .route("/bookings", get(bookings::index))
        .route("/bookings/{id}", get(bookings::show).post(bookings::update))
        .route("/bookings/{id}/delete", post(bookings::delete))
        // Admins
        .route("/admins", get(admins::index).post(admins::create))
        .route("/admins/new", get(admins::new))
        .route("/admins/{id}/role", post(admins::update_role))
        .route("/admins/{id}/delete", post(admins::delete))
        .route("/admins/pending/{id}/delete", post(admins::delete_pending))
        // Settings
        .route("/settings", get(settings::index).post(settings::save))
        // Uploads
        .route(
            "/uploads",
            post(uploads::upload)
                .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES + UPLOAD_OVERHEAD_BYTES)),
        )
        .route("/uploads/delete", post(uploads::delete))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_form_value_helpers() {
        assert_eq!(optional("  ".to_string()).as_deref(), Some(""));
        assert_eq!(optional(" x ".to_string()).as_deref(), Some("x"));
        assert_eq!(required("  ".to_string()), None);
        assert_eq!(required(" Atlas ".to_string()).as_deref(), Some("Atlas"));
    }

    #[test]
    fn test_number() {
        assert_eq!(number::<i32>("").unwrap(), None);
        assert_eq!(number::<i32>(" 3 ").unwrap(), Some(3));
        assert!(number::<i16>("three").is_err());
    }
}
