//! Opal site library.
//!
//! The public agency site and its admin CMS, built as a library so the
//! integration tests can drive the full router with in-memory backends.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod actions;
pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod filters;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

use axum::{
    Router,
    extract::State,
    http::{HeaderValue, StatusCode},
    middleware::from_fn,
    middleware::from_fn_with_state,
    routing::get,
};
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::middleware::security_headers::content_security_policy;
use crate::middleware::{
    create_session_layer, edge_interceptor, request_id_middleware, security_headers_middleware,
};
use crate::state::AppState;

/// Directory served under `/static`, relative to the workspace root.
pub const STATIC_DIR: &str = "crates/site/static";

/// Build the full application router.
///
/// Layers run outermost first: tracing, request id, security headers,
/// flash sessions, then the edge interceptor.
pub fn app(state: AppState) -> Router {
    let csp = HeaderValue::from_str(&content_security_policy(&storage_origin(
        &state.config().supabase.url,
    )))
    .unwrap_or_else(|e| {
        tracing::error!(error = %e, "Invalid storage origin in CSP; images from storage will be blocked");
        HeaderValue::from_static("default-src 'self'")
    });
    let session_layer = create_session_layer(state.config());

    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .merge(routes::routes())
        .nest_service("/static", ServeDir::new(STATIC_DIR))
        .layer(from_fn_with_state(state.clone(), edge_interceptor))
        .layer(session_layer)
        .layer(from_fn_with_state(csp, security_headers_middleware))
        .layer(from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Scheme, host and port of the storage service, for the CSP `img-src`.
fn storage_origin(base_url: &str) -> String {
    url::Url::parse(base_url).map_or_else(
        |_| base_url.trim_end_matches('/').to_string(),
        |url| url.origin().ascii_serialization(),
    )
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Verifies database connectivity before returning OK.
/// Returns 503 Service Unavailable if the database is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match sqlx::query("SELECT 1").fetch_one(state.pool()).await {
        Ok(_) => StatusCode::OK,
        Err(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_origin() {
        assert_eq!(
            storage_origin("https://abc.supabase.co/"),
            "https://abc.supabase.co"
        );
        assert_eq!(
            storage_origin("http://localhost:54321/storage/v1"),
            "http://localhost:54321"
        );
    }
}
