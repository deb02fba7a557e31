//! JSON API routes.

pub mod contact;

use axum::{Router, routing::post};

use crate::state::AppState;

/// Create the API router (mounted at `/api`).
pub fn router() -> Router<AppState> {
    Router::new().route("/contact", post(contact::submit))
}
