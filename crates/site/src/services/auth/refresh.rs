//! Single-flight refresh-token redemption.
//!
//! A refresh token may be redeemed once. When a page load fires several
//! requests that all carry the same expired session, only one of them may
//! talk to the auth service; the rest wait for that result. The outcome is
//! kept for a short grace window so a request that arrives just after the
//! redemption (still holding the old cookie) gets the already-issued session
//! instead of trying to redeem a dead token.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use sha2::{Digest, Sha256};

use super::{AuthError, SessionStore};
use crate::models::Session;

/// How long a redeemed session is handed out for its old refresh token.
pub const DEFAULT_GRACE: Duration = Duration::from_secs(30);

/// Maximum number of in-flight or recently redeemed tokens tracked.
const MAX_TRACKED: u64 = 10_000;

/// Owns every call to [`SessionStore::refresh_session`].
#[derive(Clone)]
pub struct RefreshCoordinator {
    redeemed: Cache<String, Session>,
}

impl Default for RefreshCoordinator {
    fn default() -> Self {
        Self::new(DEFAULT_GRACE)
    }
}

impl RefreshCoordinator {
    #[must_use]
    pub fn new(grace: Duration) -> Self {
        Self {
            redeemed: Cache::builder()
                .max_capacity(MAX_TRACKED)
                .time_to_live(grace)
                .build(),
        }
    }

    /// Redeem `refresh_token`, coalescing with any concurrent or recent redemption.
    ///
    /// Failures are not remembered; the next caller tries again.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::RefreshTokenAlreadyUsed` if the token was redeemed
    /// elsewhere, or `AuthError::RefreshFailed` for any other failure.
    #[tracing::instrument(skip_all)]
    pub async fn refresh(
        &self,
        store: &dyn SessionStore,
        refresh_token: &str,
    ) -> Result<Session, AuthError> {
        let key = token_key(refresh_token);

        self.redeemed
            .try_get_with(key, async {
                tracing::debug!("Redeeming refresh token");
                store.refresh_session(refresh_token).await
            })
            .await
            .map_err(|e: Arc<AuthError>| match e.as_ref() {
                AuthError::RefreshTokenAlreadyUsed => AuthError::RefreshTokenAlreadyUsed,
                other => AuthError::RefreshFailed(other.to_string()),
            })
    }
}

/// Cache key for a refresh token. The raw token is never kept in memory longer than needed.
fn token_key(refresh_token: &str) -> String {
    hex::encode(Sha256::digest(refresh_token.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_key_is_stable_and_opaque() {
        let key = token_key("refresh-abc");
        assert_eq!(key, token_key("refresh-abc"));
        assert_ne!(key, token_key("refresh-abd"));
        assert_eq!(key.len(), 64);
        assert!(!key.contains("refresh"));
    }
}
