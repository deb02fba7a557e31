//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                       - Home page
//! GET  /about                  - About page
//! GET  /services               - Services
//! GET  /work                   - Portfolio
//! GET  /work/{id}              - Project detail
//! GET  /blog                   - Published posts
//! GET  /blog/{slug}            - Post detail
//! GET  /team                   - Team members
//! GET  /contact                - Contact form
//!
//! # API
//! POST /api/contact            - Submit a booking enquiry
//!
//! # Admin CMS
//! /admin/...                   - See [`admin`]
//! ```
//!
//! Public pages are rendered through the page cache and invalidated by the
//! admin actions that change them.

pub mod admin;
pub mod api;
pub mod public;

use axum::{Router, routing::get};

use crate::state::AppState;

/// Create the public page routes.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(public::home))
        .route("/about", get(public::about))
        .route("/services", get(public::services))
        .route("/work", get(public::work_index))
        .route("/work/{id}", get(public::work_show))
        .route("/blog", get(public::blog_index))
        .route("/blog/{slug}", get(public::blog_show))
        .route("/team", get(public::team))
        .route("/contact", get(public::contact))
}

/// Create the complete router with all routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(public_routes())
        .nest("/api", api::router())
        .nest("/admin", admin::router())
}
