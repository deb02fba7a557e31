//! Site settings repository (key/value).

use sqlx::PgPool;

use super::{Actor, RepositoryError, scoped};
use crate::models::{SettingKey, SiteSettings};

/// Repository for the `settings` table.
pub struct SettingsRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> SettingsRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Load every known setting.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn load(&self) -> Result<SiteSettings, RepositoryError> {
        let rows: Vec<(String, Option<String>)> =
            sqlx::query_as("SELECT key, value FROM settings")
                .fetch_all(self.pool)
                .await?;

        Ok(SiteSettings::from_pairs(rows))
    }

    /// Upsert the given settings in one transaction.
    ///
    /// A `None` value clears the setting. Keys not in `values` are untouched.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if any upsert fails; nothing is written in that case.
    pub async fn save(
        &self,
        actor: &Actor,
        values: &[(SettingKey, Option<String>)],
    ) -> Result<(), RepositoryError> {
        let mut tx = scoped(self.pool, actor).await?;

        for (key, value) in values {
            sqlx::query(
                r"
                INSERT INTO settings (key, value, updated_at)
                VALUES ($1, $2, NOW())
                ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = NOW()
                ",
            )
            .bind(key.as_str())
            .bind(value.as_deref())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}
