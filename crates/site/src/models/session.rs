//! Auth session types.
//!
//! A [`Session`] is what the hosted auth provider issues at sign-in and on
//! every refresh. It is mirrored into the `opal-auth-token` cookie. An
//! [`Identity`] is the part of it the rest of the site cares about.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use opal_core::UserId;

/// The user a session authenticates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: UserId,
    #[serde(default)]
    pub email: Option<String>,
}

/// An access/refresh token pair plus the identity it authenticates.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    /// Expiry of the access token.
    pub expires_at: DateTime<Utc>,
    pub user: AuthUser,
}

impl Session {
    /// Whether the access token expires within `margin` of `now`.
    #[must_use]
    pub fn expires_within(&self, now: DateTime<Utc>, margin: Duration) -> bool {
        self.expires_at <= now + margin
    }

    #[must_use]
    pub fn identity(&self) -> Identity {
        Identity {
            user_id: self.user.id,
            email: self.user.email.clone().unwrap_or_default(),
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .field("user", &self.user)
            .finish()
    }
}

/// Who is making the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: UserId,
    pub email: String,
}
