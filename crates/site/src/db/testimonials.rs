//! Testimonial repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use opal_core::TestimonialId;

use super::{Actor, RepositoryError, scoped};
use crate::models::{Testimonial, TestimonialInput};

const TESTIMONIAL_COLUMNS: &str = "id, client_name, client_title, company_name, content, rating, \
     image_url, order_index, created_at";

#[derive(Debug, sqlx::FromRow)]
struct TestimonialRow {
    id: Uuid,
    client_name: String,
    client_title: Option<String>,
    company_name: Option<String>,
    content: String,
    rating: i16,
    image_url: Option<String>,
    order_index: i32,
    created_at: DateTime<Utc>,
}

impl From<TestimonialRow> for Testimonial {
    fn from(row: TestimonialRow) -> Self {
        Self {
            id: TestimonialId::new(row.id),
            client_name: row.client_name,
            client_title: row.client_title,
            company_name: row.company_name,
            content: row.content,
            rating: row.rating,
            image_url: row.image_url,
            order_index: row.order_index,
            created_at: row.created_at,
        }
    }
}

/// Repository for client testimonials.
pub struct TestimonialRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> TestimonialRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List testimonials in display order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Testimonial>, RepositoryError> {
        let rows = sqlx::query_as::<_, TestimonialRow>(&format!(
            "SELECT {TESTIMONIAL_COLUMNS} FROM testimonials ORDER BY order_index ASC, created_at DESC"
        ))
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Get a testimonial by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: TestimonialId) -> Result<Option<Testimonial>, RepositoryError> {
        let row = sqlx::query_as::<_, TestimonialRow>(&format!(
            "SELECT {TESTIMONIAL_COLUMNS} FROM testimonials WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Insert a new testimonial.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails (including a rating outside 1-5).
    pub async fn insert(
        &self,
        actor: &Actor,
        input: &TestimonialInput,
    ) -> Result<TestimonialId, RepositoryError> {
        let mut tx = scoped(self.pool, actor).await?;

        let id: Uuid = sqlx::query_scalar(
            r"
            INSERT INTO testimonials (client_name, client_title, company_name, content, rating,
                                      image_url, order_index)
            VALUES ($1, NULLIF($2, ''), NULLIF($3, ''), $4, COALESCE($5, 5), NULLIF($6, ''),
                    COALESCE($7, 0))
            RETURNING id
            ",
        )
        .bind(input.client_name.as_deref())
        .bind(input.client_title.as_deref())
        .bind(input.company_name.as_deref())
        .bind(input.content.as_deref())
        .bind(input.rating)
        .bind(input.image_url.as_deref())
        .bind(input.order_index)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(TestimonialId::new(id))
    }

    /// Update the supplied fields of a testimonial.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no row was updated.
    pub async fn update(
        &self,
        actor: &Actor,
        id: TestimonialId,
        input: &TestimonialInput,
    ) -> Result<(), RepositoryError> {
        let mut tx = scoped(self.pool, actor).await?;

        let result = sqlx::query(
            r"
            UPDATE testimonials SET
                client_name = COALESCE($2, client_name),
                client_title = CASE WHEN $3::text IS NULL THEN client_title ELSE NULLIF($3, '') END,
                company_name = CASE WHEN $4::text IS NULL THEN company_name ELSE NULLIF($4, '') END,
                content = COALESCE($5, content),
                rating = COALESCE($6, rating),
                image_url = CASE WHEN $7::text IS NULL THEN image_url ELSE NULLIF($7, '') END,
                order_index = COALESCE($8, order_index)
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(input.client_name.as_deref())
        .bind(input.client_title.as_deref())
        .bind(input.company_name.as_deref())
        .bind(input.content.as_deref())
        .bind(input.rating)
        .bind(input.image_url.as_deref())
        .bind(input.order_index)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        tx.commit().await?;
        Ok(())
    }

    /// Delete a testimonial.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no row was deleted.
    pub async fn delete(&self, actor: &Actor, id: TestimonialId) -> Result<(), RepositoryError> {
        let mut tx = scoped(self.pool, actor).await?;

        let result = sqlx::query("DELETE FROM testimonials WHERE id = $1")
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
