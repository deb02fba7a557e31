//! Admin records and pending admins.
//!
//! [`AdminDirectory`] is the seam the layout guard and the add-admin action
//! talk to. Lookups by auth identity (`get_admin`, `find_user_id_by_email`,
//! listings that join account emails) read the `auth.users` table, which only
//! the server's own connection may see. Mutations run in the acting admin's
//! row-level security scope, so only super admins can change the roster.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use opal_core::{AdminRole, Email, PendingAdminId, UserId};

use super::{Actor, RepositoryError, non_blank, scoped};
use crate::models::{Admin, NewAdmin, PendingAdmin};

/// Admin records keyed by auth user id, plus invitations keyed by email.
#[async_trait]
pub trait AdminDirectory: Send + Sync {
    /// Auth account id for an email, if an account exists.
    async fn find_user_id_by_email(&self, email: &Email) -> Result<Option<UserId>, RepositoryError>;

    /// The admin record for an auth user, if any.
    async fn get_admin(&self, user_id: UserId) -> Result<Option<Admin>, RepositoryError>;

    /// Create an admin record for an existing auth account.
    ///
    /// Returns `Conflict` when the account is already an admin.
    async fn insert_admin(
        &self,
        actor: &Actor,
        user_id: UserId,
        admin: &NewAdmin,
    ) -> Result<(), RepositoryError>;

    /// Record an invitation for an email with no account yet.
    ///
    /// Returns `Conflict` when the email is already pending.
    async fn insert_pending(
        &self,
        actor: &Actor,
        admin: &NewAdmin,
    ) -> Result<PendingAdmin, RepositoryError>;

    /// Promote a pending invitation for `email` into an admin record for `user_id`.
    ///
    /// Returns whether a pending row was promoted.
    async fn promote_pending(&self, user_id: UserId, email: &Email)
    -> Result<bool, RepositoryError>;

    async fn update_role(
        &self,
        actor: &Actor,
        user_id: UserId,
        role: AdminRole,
    ) -> Result<(), RepositoryError>;

    async fn delete_admin(&self, actor: &Actor, user_id: UserId) -> Result<(), RepositoryError>;

    async fn delete_pending(
        &self,
        actor: &Actor,
        id: PendingAdminId,
    ) -> Result<(), RepositoryError>;

    /// All admins, newest first.
    async fn list_admins(&self) -> Result<Vec<Admin>, RepositoryError>;

    /// All pending admins, newest first.
    async fn list_pending(&self) -> Result<Vec<PendingAdmin>, RepositoryError>;
}

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct AdminRow {
    id: Uuid,
    email: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    role: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<AdminRow> for Admin {
    type Error = RepositoryError;

    fn try_from(row: AdminRow) -> Result<Self, Self::Error> {
        let role = row
            .role
            .parse::<AdminRole>()
            .map_err(RepositoryError::DataCorruption)?;

        Ok(Self {
            id: UserId::new(row.id),
            email: row.email,
            first_name: row.first_name,
            last_name: row.last_name,
            role,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PendingAdminRow {
    id: Uuid,
    email: String,
    first_name: Option<String>,
    last_name: Option<String>,
    role: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<PendingAdminRow> for PendingAdmin {
    type Error = RepositoryError;

    fn try_from(row: PendingAdminRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;
        let role = row
            .role
            .parse::<AdminRole>()
            .map_err(RepositoryError::DataCorruption)?;

        Ok(Self {
            id: PendingAdminId::new(row.id),
            email,
            first_name: row.first_name,
            last_name: row.last_name,
            role,
            created_at: row.created_at,
        })
    }
}

// =============================================================================
// PostgreSQL implementation
// =============================================================================

/// `PostgreSQL` implementation of [`AdminDirectory`].
#[derive(Clone)]
pub struct PgAdminDirectory {
    pool: PgPool,
}

impl PgAdminDirectory {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AdminDirectory for PgAdminDirectory {
    async fn find_user_id_by_email(&self, email: &Email) -> Result<Option<UserId>, RepositoryError> {
        let id: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM auth.users WHERE lower(email) = $1 LIMIT 1")
                .bind(email.as_str())
                .fetch_optional(&self.pool)
                .await?;

        Ok(id.map(UserId::new))
    }

    async fn get_admin(&self, user_id: UserId) -> Result<Option<Admin>, RepositoryError> {
        let row = sqlx::query_as::<_, AdminRow>(
            r"
            SELECT a.id, u.email::text AS email, a.first_name, a.last_name, a.role, a.created_at
            FROM admins a
            LEFT JOIN auth.users u ON u.id = a.id
            WHERE a.id = $1
            ",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn insert_admin(
        &self,
        actor: &Actor,
        user_id: UserId,
        admin: &NewAdmin,
    ) -> Result<(), RepositoryError> {
        let mut tx = scoped(&self.pool, actor).await?;

        sqlx::query(
            r"
            INSERT INTO admins (id, first_name, last_name, role)
            VALUES ($1, $2, $3, $4)
            ",
        )
        .bind(user_id)
        .bind(non_blank(admin.first_name.as_deref()))
        .bind(non_blank(admin.last_name.as_deref()))
        .bind(admin.role.to_string())
        .execute(&mut *tx)
        .await
        .map_err(|e| RepositoryError::from_unique(e, "account is already an admin"))?;

        tx.commit().await?;
        Ok(())
    }

    async fn insert_pending(
        &self,
        actor: &Actor,
        admin: &NewAdmin,
    ) -> Result<PendingAdmin, RepositoryError> {
        let mut tx = scoped(&self.pool, actor).await?;

        let row = sqlx::query_as::<_, PendingAdminRow>(
            r"
            INSERT INTO pending_admins (email, first_name, last_name, role)
            VALUES ($1, $2, $3, $4)
            RETURNING id, email, first_name, last_name, role, created_at
            ",
        )
        .bind(admin.email.as_str())
        .bind(non_blank(admin.first_name.as_deref()))
        .bind(non_blank(admin.last_name.as_deref()))
        .bind(admin.role.to_string())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| RepositoryError::from_unique(e, "email is already pending"))?;

        tx.commit().await?;
        row.try_into()
    }

    async fn promote_pending(
        &self,
        user_id: UserId,
        email: &Email,
    ) -> Result<bool, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let promoted = sqlx::query(
            r"
            INSERT INTO admins (id, first_name, last_name, role)
            SELECT $1, first_name, last_name, role
            FROM pending_admins
            WHERE email = $2
            ON CONFLICT (id) DO NOTHING
            ",
        )
        .bind(user_id)
        .bind(email.as_str())
        .execute(&mut *tx)
        .await?
        .rows_affected();

        sqlx::query("DELETE FROM pending_admins WHERE email = $1")
            .bind(email.as_str())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(promoted > 0)
    }

    async fn update_role(
        &self,
        actor: &Actor,
        user_id: UserId,
        role: AdminRole,
    ) -> Result<(), RepositoryError> {
        let mut tx = scoped(&self.pool, actor).await?;

        let result = sqlx::query("UPDATE admins SET role = $2 WHERE id = $1")
            .bind(user_id)
            .bind(role.to_string())
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        tx.commit().await?;
        Ok(())
    }

    async fn delete_admin(&self, actor: &Actor, user_id: UserId) -> Result<(), RepositoryError> {
        let mut tx = scoped(&self.pool, actor).await?;

        let result = sqlx::query("DELETE FROM admins WHERE id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        tx.commit().await?;
        Ok(())
    }

    async fn delete_pending(
        &self,
        actor: &Actor,
        id: PendingAdminId,
    ) -> Result<(), RepositoryError> {
        let mut tx = scoped(&self.pool, actor).await?;

        let result = sqlx::query("DELETE FROM pending_admins WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        tx.commit().await?;
        Ok(())
    }

    async fn list_admins(&self) -> Result<Vec<Admin>, RepositoryError> {
        let rows = sqlx::query_as::<_, AdminRow>(
            r"
            SELECT a.id, u.email::text AS email, a.first_name, a.last_name, a.role, a.created_at
            FROM admins a
            LEFT JOIN auth.users u ON u.id = a.id
            ORDER BY a.created_at DESC
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn list_pending(&self) -> Result<Vec<PendingAdmin>, RepositoryError> {
        let rows = sqlx::query_as::<_, PendingAdminRow>(
            r"
            SELECT id, email, first_name, last_name, role, created_at
            FROM pending_admins
            ORDER BY created_at DESC
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }
}
