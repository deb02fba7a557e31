//! Service repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use opal_core::ServiceId;

use super::{Actor, RepositoryError, scoped};
use crate::models::{Service, ServiceInput};

#[derive(Debug, sqlx::FromRow)]
struct ServiceRow {
    id: Uuid,
    title: String,
    description: String,
    icon_url: Option<String>,
    order_index: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ServiceRow> for Service {
    fn from(row: ServiceRow) -> Self {
        Self {
            id: ServiceId::new(row.id),
            title: row.title,
            description: row.description,
            icon_url: row.icon_url,
            order_index: row.order_index,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Repository for the services the agency offers.
pub struct ServiceRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ServiceRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List services in display order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Service>, RepositoryError> {
        let rows = sqlx::query_as::<_, ServiceRow>(
            r"
            SELECT id, title, description, icon_url, order_index, created_at, updated_at
            FROM services
            ORDER BY order_index ASC
            ",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Get a service by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ServiceId) -> Result<Option<Service>, RepositoryError> {
        let row = sqlx::query_as::<_, ServiceRow>(
            r"
            SELECT id, title, description, icon_url, order_index, created_at, updated_at
            FROM services
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Insert a new service.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails or row-level security rejects it.
    pub async fn insert(
        &self,
        actor: &Actor,
        input: &ServiceInput,
    ) -> Result<ServiceId, RepositoryError> {
        let mut tx = scoped(self.pool, actor).await?;

        let id: Uuid = sqlx::query_scalar(
            r"
            INSERT INTO services (title, description, icon_url, order_index)
            VALUES ($1, $2, NULLIF($3, ''), COALESCE($4, 0))
            RETURNING id
            ",
        )
        .bind(input.title.as_deref())
        .bind(input.description.as_deref())
        .bind(input.icon_url.as_deref())
        .bind(input.order_index)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(ServiceId::new(id))
    }

    /// Update the supplied fields of a service.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no row was updated.
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn update(
        &self,
        actor: &Actor,
        id: ServiceId,
        input: &ServiceInput,
    ) -> Result<(), RepositoryError> {
        let mut tx = scoped(self.pool, actor).await?;

        let result = sqlx::query(
            r"
            UPDATE services SET
                title = COALESCE($2, title),
                description = COALESCE($3, description),
                icon_url = CASE WHEN $4::text IS NULL THEN icon_url ELSE NULLIF($4, '') END,
                order_index = COALESCE($5, order_index),
                updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(input.title.as_deref())
        .bind(input.description.as_deref())
        .bind(input.icon_url.as_deref())
        .bind(input.order_index)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        tx.commit().await?;
        Ok(())
    }

    /// Delete a service.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no row was deleted.
    pub async fn delete(&self, actor: &Actor, id: ServiceId) -> Result<(), RepositoryError> {
        let mut tx = scoped(self.pool, actor).await?;

        let result = sqlx::query("DELETE FROM services WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        tx.commit().await?;
        Ok(())
    }
}
