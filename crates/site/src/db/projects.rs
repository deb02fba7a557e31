//! Project repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use opal_core::ProjectId;

use super::{Actor, RepositoryError, scoped};
use crate::models::{Project, ProjectInput};

const PROJECT_COLUMNS: &str = "id, title, description, category, image_url, featured_image_url, \
     client_name, results, technologies, order_index, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct ProjectRow {
    id: Uuid,
    title: String,
    description: String,
    category: String,
    image_url: Option<String>,
    featured_image_url: Option<String>,
    client_name: Option<String>,
    results: Option<String>,
    technologies: Option<Vec<String>>,
    order_index: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProjectRow> for Project {
    fn from(row: ProjectRow) -> Self {
        Self {
            id: ProjectId::new(row.id),
            title: row.title,
            description: row.description,
            category: row.category,
            image_url: row.image_url,
            featured_image_url: row.featured_image_url,
            client_name: row.client_name,
            results: row.results,
            technologies: row.technologies.unwrap_or_default(),
            order_index: row.order_index,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Repository for portfolio projects.
pub struct ProjectRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProjectRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List all projects in display order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Project>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProjectRow>(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects ORDER BY order_index ASC, created_at DESC"
        ))
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// First `limit` projects in display order, for the home page.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_featured(&self, limit: i64) -> Result<Vec<Project>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProjectRow>(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects ORDER BY order_index ASC, created_at DESC LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Get a project by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ProjectId) -> Result<Option<Project>, RepositoryError> {
        let row = sqlx::query_as::<_, ProjectRow>(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Insert a new project.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails or row-level security rejects it.
    pub async fn insert(
        &self,
        actor: &Actor,
        input: &ProjectInput,
    ) -> Result<ProjectId, RepositoryError> {
        let mut tx = scoped(self.pool, actor).await?;

        let id: Uuid = sqlx::query_scalar(
            r"
            INSERT INTO projects (title, description, category, image_url, featured_image_url,
                                  client_name, results, technologies, order_index)
            VALUES ($1, $2, $3, NULLIF($4, ''), NULLIF($5, ''), NULLIF($6, ''), NULLIF($7, ''),
                    COALESCE($8, '{}'::text[]), COALESCE($9, 0))
            RETURNING id
            ",
        )
        .bind(input.title.as_deref())
        .bind(input.description.as_deref())
        .bind(input.category.as_deref())
        .bind(input.image_url.as_deref())
        .bind(input.featured_image_url.as_deref())
        .bind(input.client_name.as_deref())
        .bind(input.results.as_deref())
        .bind(input.technologies.as_deref())
        .bind(input.order_index)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(ProjectId::new(id))
    }

    /// Update the supplied fields of a project.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no row was updated (missing, or hidden by policy).
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn update(
        &self,
        actor: &Actor,
        id: ProjectId,
        input: &ProjectInput,
    ) -> Result<(), RepositoryError> {
        let mut tx = scoped(self.pool, actor).await?;

        let result = sqlx::query(
            r"
            UPDATE projects SET
                title = COALESCE($2, title),
                description = COALESCE($3, description),
                category = COALESCE($4, category),
                image_url = CASE WHEN $5::text IS NULL THEN image_url ELSE NULLIF($5, '') END,
                featured_image_url = CASE WHEN $6::text IS NULL THEN featured_image_url ELSE NULLIF($6, '') END,
                client_name = CASE WHEN $7::text IS NULL THEN client_name ELSE NULLIF($7, '') END,
                results = CASE WHEN $8::text IS NULL THEN results ELSE NULLIF($8, '') END,
                technologies = COALESCE($9, technologies),
                order_index = COALESCE($10, order_index),
                updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(input.title.as_deref())
        .bind(input.description.as_deref())
        .bind(input.category.as_deref())
        .bind(input.image_url.as_deref())
        .bind(input.featured_image_url.as_deref())
        .bind(input.client_name.as_deref())
        .bind(input.results.as_deref())
        .bind(input.technologies.as_deref())
        .bind(input.order_index)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        tx.commit().await?;
        Ok(())
    }

    /// Delete a project.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no row was deleted.
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn delete(&self, actor: &Actor, id: ProjectId) -> Result<(), RepositoryError> {
        let mut tx = scoped(self.pool, actor).await?;

        let result = sqlx::query("DELETE FROM projects WHERE id = $1")
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
