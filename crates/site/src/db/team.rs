//! Team member repository (read-only; members are managed in the database directly).

use sqlx::PgPool;
use uuid::Uuid;

use opal_core::TeamMemberId;

use super::RepositoryError;
use crate::models::TeamMember;

#[derive(Debug, sqlx::FromRow)]
struct TeamMemberRow {
    id: Uuid,
    name: String,
    title: String,
    role: Option<String>,
    bio: Option<String>,
    image_url: Option<String>,
    order_index: i32,
}

impl From<TeamMemberRow> for TeamMember {
    fn from(row: TeamMemberRow) -> Self {
        Self {
            id: TeamMemberId::new(row.id),
            name: row.name,
            title: row.title,
            role: row.role,
            bio: row.bio,
            image_url: row.image_url,
            order_index: row.order_index,
        }
    }
}

/// Repository for the public team page.
pub struct TeamRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> TeamRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List team members in display order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<TeamMember>, RepositoryError> {
        let rows = sqlx::query_as::<_, TeamMemberRow>(
            r"
            SELECT id, name, title, role, bio, image_url, order_index
            FROM team_members
            ORDER BY order_index ASC, name ASC
            ",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}
