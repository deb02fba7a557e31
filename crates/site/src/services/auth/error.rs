//! Authentication error types.

use thiserror::Error;

/// Errors that can occur talking to the hosted auth service.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] opal_core::EmailError),

    /// Wrong email or password.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// The refresh token was already redeemed (by this or another process).
    #[error("refresh token already used")]
    RefreshTokenAlreadyUsed,

    /// A coalesced refresh failed for a reason other than token reuse.
    #[error("refresh failed: {0}")]
    RefreshFailed(String),

    /// The access token is expired.
    #[error("session expired")]
    Expired,

    /// The cookie or token could not be decoded or verified.
    #[error("invalid session: {0}")]
    InvalidSession(String),

    /// An account with this email already exists.
    #[error("user already exists")]
    UserAlreadyExists,

    /// The operation needs the service-role credential, which is not configured.
    #[error("service credential not configured")]
    MissingServiceCredential,

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Auth service returned an error response.
    #[error("auth service error: {status} - {message}")]
    Api { status: u16, message: String },
}
