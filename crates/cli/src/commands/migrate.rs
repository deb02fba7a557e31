//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! opal-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `DATABASE_URL` - `PostgreSQL` connection string for the site database
//!
//! # Migration Files
//!
//! Site migrations live in `crates/site/migrations/` and are embedded at
//! compile time:
//! ```text
//! migrations/
//! ├── 20260301000001_roles_and_auth.sql
//! ├── 20260301000002_create_content.sql
//! ├── 20260301000003_create_admins.sql
//! └── 20260301000004_row_level_security.sql
//! ```

use super::{CommandError, connect};

/// Errors that can occur while migrating.
#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Run the site database migrations.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a migration fails.
pub async fn run() -> Result<(), MigrationError> {
    let pool = connect().await?;

    tracing::info!("Running site migrations...");
    sqlx::migrate!("../site/migrations").run(&pool).await?;

    tracing::info!("Site migrations complete!");
    Ok(())
}
