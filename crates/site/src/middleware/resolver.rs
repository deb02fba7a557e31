//! Per-request identity resolution.
//!
//! Any number of handlers, guards and templates may ask "who is this?"
//! during one request. The first ask resolves; every later ask in the same
//! request gets the same answer without doing the work again. The memo lives
//! in an [`AuthContext`] request extension, so nothing is shared between
//! requests.
//!
//! Resolution never redeems a refresh token and never calls the auth
//! service: it trusts the interceptor's signed identity header, and falls
//! back to a passive cookie read.

use std::sync::Arc;

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, request::Parts},
};
use tokio::sync::OnceCell;

use super::identity::IDENTITY_HEADER;
use crate::models::Identity;
use crate::services::auth::{AUTH_COOKIE, SessionRead, cookie::read_cookie};
use crate::state::AppState;

/// Memoized identity for one request.
#[derive(Clone, Default)]
pub struct AuthContext {
    cell: Arc<OnceCell<Option<Identity>>>,
}

impl AuthContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Who is making the request, resolved at most once.
    pub async fn resolve(&self, state: &AppState, headers: &HeaderMap) -> Option<Identity> {
        self.cell
            .get_or_init(|| async { resolve_uncached(state, headers) })
            .await
            .clone()
    }

    /// Whether this context has already resolved.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.cell.initialized()
    }
}

fn resolve_uncached(state: &AppState, headers: &HeaderMap) -> Option<Identity> {
    if let Some(identity) = headers
        .get(IDENTITY_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| state.signer().verify(value))
    {
        return Some(identity);
    }

    let cookie = read_cookie(headers, AUTH_COOKIE)?;
    match state.sessions().read_session(&cookie) {
        SessionRead::Valid(session) => Some(session.identity()),
        SessionRead::Expired { .. } => {
            tracing::debug!("Session expired and was not refreshed upstream");
            None
        }
        SessionRead::Absent => None,
    }
}

/// The request's [`AuthContext`], inserting one if the interceptor did not.
fn context(parts: &mut Parts) -> AuthContext {
    if let Some(ctx) = parts.extensions.get::<AuthContext>() {
        return ctx.clone();
    }
    let ctx = AuthContext::new();
    parts.extensions.insert(ctx.clone());
    ctx
}

/// Extractor for the optional identity of the caller.
pub struct MaybeIdentity(pub Option<Identity>);

impl FromRequestParts<AppState> for MaybeIdentity {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let ctx = context(parts);
        Ok(Self(ctx.resolve(state, &parts.headers).await))
    }
}
