//! Admin roster commands.
//!
//! The CMS only lets super admins add admins, so the first one has to come
//! from here.
//!
//! # Usage
//!
//! ```bash
//! # Make an email a super admin (pending until first sign-in if no account exists)
//! opal-cli admin grant -e owner@opal.studio -r super_admin --first-name Ada
//!
//! # Remove an admin or withdraw a pending invitation
//! opal-cli admin revoke -e former@opal.studio
//!
//! # List admins and pending admins
//! opal-cli admin list
//! ```
//!
//! # Environment Variables
//!
//! - `DATABASE_URL` - `PostgreSQL` connection string for the site database

use chrono::{DateTime, Utc};
use opal_core::{AdminRole, Email};
use thiserror::Error;
use uuid::Uuid;

use super::{CommandError, connect};

/// Errors that can occur during admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error(transparent)]
    Command(#[from] CommandError),

    /// Database query error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Invalid role.
    #[error("Invalid role: {0}. Valid roles: super_admin, admin")]
    InvalidRole(String),

    /// Invalid email.
    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    /// Neither an admin nor a pending admin has this email.
    #[error("No admin or pending admin with email: {0}")]
    NotFound(String),
}

/// What `grant` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granted {
    /// The account existed and is now an admin with the given role.
    Admin(Uuid),
    /// No account yet; recorded as pending.
    Pending(Uuid),
}

fn parse(email: &str, role: &str) -> Result<(Email, AdminRole), AdminError> {
    let role = role
        .parse()
        .map_err(|_| AdminError::InvalidRole(role.to_owned()))?;
    let email = Email::parse(email).map_err(|_| AdminError::InvalidEmail(email.to_owned()))?;
    Ok((email, role))
}

fn blank_to_none(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Grant admin access to an email.
///
/// An existing account is upserted into `admins` (re-granting changes the
/// role). Otherwise the email is recorded in `pending_admins` and promoted
/// when that person first signs in.
///
/// # Errors
///
/// Returns an error for an invalid email or role, or if a query fails.
pub async fn grant(
    email: &str,
    role: &str,
    first_name: Option<&str>,
    last_name: Option<&str>,
) -> Result<Granted, AdminError> {
    let (email, role) = parse(email, role)?;
    let first_name = blank_to_none(first_name);
    let last_name = blank_to_none(last_name);
    let pool = connect().await?;

    let user_id: Option<Uuid> =
        sqlx::query_scalar("SELECT id FROM auth.users WHERE lower(email) = $1 LIMIT 1")
            .bind(email.as_str())
            .fetch_optional(&pool)
            .await?;

    if let Some(user_id) = user_id {
        sqlx::query(
            r"
            INSERT INTO admins (id, first_name, last_name, role)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE SET
                role = EXCLUDED.role,
                first_name = COALESCE(EXCLUDED.first_name, admins.first_name),
                last_name = COALESCE(EXCLUDED.last_name, admins.last_name)
            ",
        )
        .bind(user_id)
        .bind(first_name)
        .bind(last_name)
        .bind(role.to_string())
        .execute(&pool)
        .await?;

        tracing::info!("{} is now {} (account {})", email, role.label(), user_id);
        return Ok(Granted::Admin(user_id));
    }

    let pending_id: Uuid = sqlx::query_scalar(
        r"
        INSERT INTO pending_admins (email, first_name, last_name, role)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (email) DO UPDATE SET
            role = EXCLUDED.role,
            first_name = COALESCE(EXCLUDED.first_name, pending_admins.first_name),
            last_name = COALESCE(EXCLUDED.last_name, pending_admins.last_name)
        RETURNING id
        ",
    )
    .bind(email.as_str())
    .bind(first_name)
    .bind(last_name)
    .bind(role.to_string())
    .fetch_one(&pool)
    .await?;

    tracing::info!(
        "No account for {} yet; recorded as pending {} ({})",
        email,
        role.label(),
        pending_id
    );
    tracing::info!("They become an admin the first time they sign in at /admin/login.");
    Ok(Granted::Pending(pending_id))
}

/// Remove admin access from an email, admin or pending.
///
/// The auth account itself is left alone.
///
/// # Errors
///
/// Returns `AdminError::NotFound` if the email has no admin or pending record.
pub async fn revoke(email: &str) -> Result<(), AdminError> {
    let email = Email::parse(email).map_err(|_| AdminError::InvalidEmail(email.to_owned()))?;
    let pool = connect().await?;
    let mut tx = pool.begin().await?;

    let admins = sqlx::query(
        "DELETE FROM admins WHERE id IN (SELECT id FROM auth.users WHERE lower(email) = $1)",
    )
    .bind(email.as_str())
    .execute(&mut *tx)
    .await?
    .rows_affected();

    let pending = sqlx::query("DELETE FROM pending_admins WHERE email = $1")
        .bind(email.as_str())
        .execute(&mut *tx)
        .await?
        .rows_affected();

    if admins + pending == 0 {
        return Err(AdminError::NotFound(email.into_inner()));
    }

    tx.commit().await?;
    tracing::info!("Admin access revoked for {}", email);
    Ok(())
}

#[derive(Debug, sqlx::FromRow)]
struct RosterRow {
    email: Option<String>,
    role: String,
    pending: bool,
    created_at: DateTime<Utc>,
}

/// Log every admin and pending admin.
///
/// # Errors
///
/// Returns an error if the query fails.
pub async fn list() -> Result<(), AdminError> {
    let pool = connect().await?;

    let rows = sqlx::query_as::<_, RosterRow>(
        r"
        SELECT u.email::text AS email, a.role, FALSE AS pending, a.created_at
        FROM admins a
        LEFT JOIN auth.users u ON u.id = a.id
        UNION ALL
        SELECT email, role, TRUE AS pending, created_at
        FROM pending_admins
        ORDER BY created_at
        ",
    )
    .fetch_all(&pool)
    .await?;

    if rows.is_empty() {
        tracing::info!("No admins yet. Run `opal-cli admin grant` to add the first one.");
    }

    for row in rows {
        let role = role_label(&row.role);
        tracing::info!(
            "{:<40} {:<12} {}{}",
            row.email.as_deref().unwrap_or("(unknown)"),
            role,
            row.created_at.format("%Y-%m-%d"),
            if row.pending { "  pending" } else { "" }
        );
    }
    Ok(())
}

/// Display name for a stored role, or the raw value if it is unknown.
fn role_label(role: &str) -> &str {
    match role.parse::<AdminRole>() {
        Ok(role) => role.label(),
        Err(_) => role,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_label() {
        assert_eq!(role_label("super_admin"), AdminRole::SuperAdmin.label());
        assert_eq!(role_label("editor"), "editor");
    }

    #[test]
    fn test_parse_rejects_bad_role() {
        assert!(matches!(
            parse("ada@opal.studio", "viewer"),
            Err(AdminError::InvalidRole(_))
        ));
    }

    #[test]
    fn test_parse_normalizes_email() {
        let Ok((email, role)) = parse(" Ada@Opal.Studio ", "super_admin") else {
            panic!("expected valid input");
        };
        assert_eq!(email.as_str(), "ada@opal.studio");
        assert_eq!(role, AdminRole::SuperAdmin);
    }

    #[test]
    fn test_blank_to_none() {
        assert_eq!(blank_to_none(Some("  ")), None);
        assert_eq!(blank_to_none(Some(" Ada ")), Some("Ada"));
        assert_eq!(blank_to_none(None), None);
    }
}
