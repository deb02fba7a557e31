//! Database operations for the site `PostgreSQL`.
//!
//! ## Tables
//!
//! - `projects`, `services`, `blog_posts`, `testimonials`, `team_members` - public content
//! - `bookings` - contact enquiries (admins only, anyone may insert)
//! - `settings` - key/value site settings
//! - `admins` - admin records keyed by auth user id
//! - `pending_admins` - invited admins without an account yet
//!
//! # Row-level security
//!
//! Authorization lives in the database. Every mutation and every admin read
//! runs inside [`scoped`], a transaction that adopts the `authenticated`
//! role with the caller's claims (or `anon` for visitors) so that the table
//! policies decide what is allowed. Public reads of published content go
//! straight to the pool.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/site/migrations/` and run via:
//! ```bash
//! cargo run -p opal-cli -- migrate
//! ```

pub mod admins;
pub mod blog_posts;
pub mod bookings;
pub mod dashboard;
pub mod projects;
pub mod services;
pub mod settings;
pub mod team;
pub mod testimonials;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, Transaction};
use thiserror::Error;

use crate::models::Identity;

pub use admins::{AdminDirectory, PgAdminDirectory};
pub use blog_posts::BlogPostRepository;
pub use bookings::{BookingRepository, BookingStore, PgBookingStore};
pub use dashboard::{DashboardCounts, DashboardRepository};
pub use projects::ProjectRepository;
pub use services::ServiceRepository;
pub use settings::SettingsRepository;
pub use team::TeamRepository;
pub use testimonials::TestimonialRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

impl RepositoryError {
    /// Map a unique-violation into `Conflict`, leaving other errors as `Database`.
    pub(crate) fn from_unique(e: sqlx::Error, what: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = e
            && db_err.is_unique_violation()
        {
            return Self::Conflict(what.to_owned());
        }
        Self::Database(e)
    }
}

/// Who a scoped transaction acts as.
#[derive(Debug, Clone)]
pub enum Actor {
    /// A visitor with no session.
    Anonymous,
    /// A signed-in user; the policies look them up in `admins`.
    Authenticated(Identity),
}

/// Begin a transaction that row-level security evaluates as `actor`.
///
/// The role and claims are `LOCAL`, so they end with the transaction and
/// never leak to the next user of the pooled connection.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the transaction cannot be started.
pub async fn scoped(
    pool: &PgPool,
    actor: &Actor,
) -> Result<Transaction<'static, Postgres>, RepositoryError> {
    let mut tx = pool.begin().await?;

    match actor {
        Actor::Anonymous => {
            sqlx::query("SELECT set_config('request.jwt.claims', $1, true)")
                .bind(serde_json::json!({ "role": "anon" }).to_string())
                .execute(&mut *tx)
                .await?;
            sqlx::query("SET LOCAL ROLE anon").execute(&mut *tx).await?;
        }
        Actor::Authenticated(identity) => {
            let claims = serde_json::json!({
                "sub": identity.user_id,
                "email": identity.email,
                "role": "authenticated",
            });
            sqlx::query("SELECT set_config('request.jwt.claims', $1, true)")
                .bind(claims.to_string())
                .execute(&mut *tx)
                .await?;
            sqlx::query("SET LOCAL ROLE authenticated")
                .execute(&mut *tx)
                .await?;
        }
    }

    Ok(tx)
}

/// Treat an empty or whitespace-only form value as absent.
pub(crate) fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_blank() {
        assert_eq!(non_blank(Some("  x ")), Some("x"));
        assert_eq!(non_blank(Some("   ")), None);
        assert_eq!(non_blank(None), None);
    }

    #[test]
    fn test_not_found_display() {
        assert_eq!(RepositoryError::NotFound.to_string(), "not found");
        assert_eq!(
            RepositoryError::Conflict("email already pending".to_string()).to_string(),
            "constraint violation: email already pending"
        );
    }
}
