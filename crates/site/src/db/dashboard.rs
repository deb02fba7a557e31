//! Dashboard aggregates.

use sqlx::PgPool;

use super::{Actor, RepositoryError, scoped};

/// Row counts shown on the admin dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, sqlx::FromRow)]
pub struct DashboardCounts {
    pub services: i64,
    pub projects: i64,
    pub blog_posts: i64,
    pub bookings: i64,
    pub pending_bookings: i64,
}

/// Repository for dashboard statistics.
pub struct DashboardRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> DashboardRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Count content rows as seen by `actor` (bookings are only visible to admins).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn counts(&self, actor: &Actor) -> Result<DashboardCounts, RepositoryError> {
        let mut tx = scoped(self.pool, actor).await?;
        let counts = sqlx::query_as::<_, DashboardCounts>(
            r"
            SELECT
                (SELECT COUNT(*) FROM services) AS services,
                (SELECT COUNT(*) FROM projects) AS projects,
                (SELECT COUNT(*) FROM blog_posts) AS blog_posts,
                (SELECT COUNT(*) FROM bookings) AS bookings,
                (SELECT COUNT(*) FROM bookings WHERE status = 'pending') AS pending_bookings
            ",
        )
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        Ok(counts)
    }
}
