//! Blog post repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use opal_core::BlogPostId;

use super::{Actor, RepositoryError, scoped};
use crate::models::content::slugify;
use crate::models::{BlogPost, BlogPostInput};

const POST_COLUMNS: &str = "id, title, slug, content, excerpt, featured_image_url, published, \
     published_at, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct BlogPostRow {
    id: Uuid,
    title: String,
    slug: String,
    content: String,
    excerpt: Option<String>,
    featured_image_url: Option<String>,
    published: bool,
    published_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<BlogPostRow> for BlogPost {
    fn from(row: BlogPostRow) -> Self {
        Self {
            id: BlogPostId::new(row.id),
            title: row.title,
            slug: row.slug,
            content: row.content,
            excerpt: row.excerpt,
            featured_image_url: row.featured_image_url,
            published: row.published,
            published_at: row.published_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Slugs touched by a save, so both old and new public paths can be invalidated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlugChange {
    pub previous: Option<String>,
    pub current: String,
}

/// Repository for blog posts.
pub struct BlogPostRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> BlogPostRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Published posts, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_published(&self) -> Result<Vec<BlogPost>, RepositoryError> {
        let rows = sqlx::query_as::<_, BlogPostRow>(&format!(
            "SELECT {POST_COLUMNS} FROM blog_posts WHERE published \
             ORDER BY published_at DESC NULLS LAST, created_at DESC"
        ))
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// A published post by slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_published_by_slug(
        &self,
        slug: &str,
    ) -> Result<Option<BlogPost>, RepositoryError> {
        let row = sqlx::query_as::<_, BlogPostRow>(&format!(
            "SELECT {POST_COLUMNS} FROM blog_posts WHERE slug = $1 AND published"
        ))
        .bind(slug)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// All posts including drafts, newest first (admin view).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_all(&self, actor: &Actor) -> Result<Vec<BlogPost>, RepositoryError> {
        let mut tx = scoped(self.pool, actor).await?;
        let rows = sqlx::query_as::<_, BlogPostRow>(&format!(
            "SELECT {POST_COLUMNS} FROM blog_posts ORDER BY created_at DESC"
        ))
        .fetch_all(&mut *tx)
        .await?;
        tx.commit().await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Any post by ID, including drafts (admin view).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(
        &self,
        actor: &Actor,
        id: BlogPostId,
    ) -> Result<Option<BlogPost>, RepositoryError> {
        let mut tx = scoped(self.pool, actor).await?;
        let row = sqlx::query_as::<_, BlogPostRow>(&format!(
            "SELECT {POST_COLUMNS} FROM blog_posts WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
        tx.commit().await?;

        Ok(row.map(Into::into))
    }

    /// Insert a new post. The slug defaults to the slugified title.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug is taken.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn insert(
        &self,
        actor: &Actor,
        input: &BlogPostInput,
    ) -> Result<(BlogPostId, String), RepositoryError> {
        let slug = resolve_slug(input).unwrap_or_default();
        let published = input.published.unwrap_or(false);

        let mut tx = scoped(self.pool, actor).await?;
        let id: Uuid = sqlx::query_scalar(
            r"
            INSERT INTO blog_posts (title, slug, content, excerpt, featured_image_url,
                                    published, published_at)
            VALUES ($1, $2, COALESCE($3, ''), NULLIF($4, ''), NULLIF($5, ''), $6,
                    CASE WHEN $6 THEN NOW() ELSE NULL END)
            RETURNING id
            ",
        )
        .bind(input.title.as_deref())
        .bind(&slug)
        .bind(input.content.as_deref())
        .bind(input.excerpt.as_deref())
        .bind(input.featured_image_url.as_deref())
        .bind(published)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| RepositoryError::from_unique(e, "slug already exists"))?;
        tx.commit().await?;

        Ok((BlogPostId::new(id), slug))
    }

    /// Update the supplied fields of a post.
    ///
    /// `published_at` is stamped the first time a post is published and kept afterwards.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the post does not exist.
    /// Returns `RepositoryError::Conflict` if the new slug is taken.
    pub async fn update(
        &self,
        actor: &Actor,
        id: BlogPostId,
        input: &BlogPostInput,
    ) -> Result<SlugChange, RepositoryError> {
        let mut tx = scoped(self.pool, actor).await?;

        let previous: Option<String> =
            sqlx::query_scalar("SELECT slug FROM blog_posts WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some(previous) = previous else {
            return Err(RepositoryError::NotFound);
        };

        let current: Option<String> = sqlx::query_scalar(
            r"
            UPDATE blog_posts SET
                title = COALESCE($2, title),
                slug = COALESCE($3, slug),
                content = COALESCE($4, content),
                excerpt = CASE WHEN $5::text IS NULL THEN excerpt ELSE NULLIF($5, '') END,
                featured_image_url = CASE WHEN $6::text IS NULL THEN featured_image_url ELSE NULLIF($6, '') END,
                published = COALESCE($7, published),
                published_at = CASE
                    WHEN COALESCE($7, published) AND published_at IS NULL THEN NOW()
                    ELSE published_at
                END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING slug
            ",
        )
        .bind(id)
        .bind(input.title.as_deref())
        .bind(input.slug.as_deref().map(slugify).filter(|s| !s.is_empty()))
        .bind(input.content.as_deref())
        .bind(input.excerpt.as_deref())
        .bind(input.featured_image_url.as_deref())
        .bind(input.published)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| RepositoryError::from_unique(e, "slug already exists"))?;
        let current = current.ok_or(RepositoryError::NotFound)?;

        tx.commit().await?;
        Ok(SlugChange {
            previous: Some(previous),
            current,
        })
    }

    /// Delete a post, returning its slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no row was deleted.
    pub async fn delete(&self, actor: &Actor, id: BlogPostId) -> Result<String, RepositoryError> {
        let mut tx = scoped(self.pool, actor).await?;

        let slug: Option<String> =
            sqlx::query_scalar("DELETE FROM blog_posts WHERE id = $1 RETURNING slug")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        let slug = slug.ok_or(RepositoryError::NotFound)?;

        tx.commit().await?;
        Ok(slug)
    }
}

/// Explicit slug if given, otherwise derived from the title.
fn resolve_slug(input: &BlogPostInput) -> Option<String> {
    input
        .slug
        .as_deref()
        .map(slugify)
        .filter(|s| !s.is_empty())
        .or_else(|| input.title.as_deref().map(slugify))
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_slug_prefers_explicit() {
        let input = BlogPostInput {
            title: Some("Ignored Title".to_string()),
            slug: Some("My Custom Slug".to_string()),
            ..Default::default()
        };
        assert_eq!(resolve_slug(&input).as_deref(), Some("my-custom-slug"));
    }

    #[test]
    fn test_resolve_slug_falls_back_to_title() {
        let input = BlogPostInput {
            title: Some("Designing for Trust".to_string()),
            slug: Some("   ".to_string()),
            ..Default::default()
        };
        assert_eq!(resolve_slug(&input).as_deref(), Some("designing-for-trust"));
    }

    #[test]
    fn test_resolve_slug_none_without_title() {
        assert_eq!(resolve_slug(&BlogPostInput::default()), None);
    }
}
