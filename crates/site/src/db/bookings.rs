//! Booking storage.
//!
//! Two surfaces share the `bookings` table:
//! - [`BookingStore`], used by the public contact endpoint. Visitors may insert
//!   but not read bookings, so the id is generated here instead of `RETURNING`
//!   it. The notification flags are bookkeeping written by the server itself.
//! - [`BookingRepository`], the admin view, scoped to the signed-in admin.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use opal_core::{BookingId, BookingStatus, Email};

use super::{Actor, RepositoryError, scoped};
use crate::models::{Booking, BookingInput, NewBooking};

/// Where contact submissions are persisted.
#[async_trait]
pub trait BookingStore: Send + Sync {
    /// Persist a new pending booking with both notification flags unset.
    async fn insert(&self, booking: &NewBooking) -> Result<BookingId, RepositoryError>;

    /// Record that the admin notification email went out.
    async fn mark_email_sent(&self, id: BookingId) -> Result<(), RepositoryError>;

    /// Record that the WhatsApp notification went out.
    async fn mark_whatsapp_sent(&self, id: BookingId) -> Result<(), RepositoryError>;
}

/// `PostgreSQL` implementation of [`BookingStore`].
#[derive(Clone)]
pub struct PgBookingStore {
    pool: PgPool,
}

impl PgBookingStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn set_flag(&self, id: BookingId, column: Flag) -> Result<(), RepositoryError> {
        let sql = match column {
            Flag::Email => "UPDATE bookings SET email_sent = TRUE, updated_at = NOW() WHERE id = $1",
            Flag::WhatsApp => {
                "UPDATE bookings SET whatsapp_sent = TRUE, updated_at = NOW() WHERE id = $1"
            }
        };
        let result = sqlx::query(sql).bind(id).execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

#[derive(Clone, Copy)]
enum Flag {
    Email,
    WhatsApp,
}

#[async_trait]
impl BookingStore for PgBookingStore {
    async fn insert(&self, booking: &NewBooking) -> Result<BookingId, RepositoryError> {
        let id = BookingId::generate();
        let mut tx = scoped(&self.pool, &Actor::Anonymous).await?;

        sqlx::query(
            r"
            INSERT INTO bookings (id, client_name, client_email, client_phone, project_type,
                                  project_description, status, whatsapp_sent, email_sent)
            VALUES ($1, $2, $3, $4, $5, $6, $7, FALSE, FALSE)
            ",
        )
        .bind(id)
        .bind(&booking.client_name)
        .bind(&booking.client_email)
        .bind(booking.client_phone.as_deref())
        .bind(&booking.project_type)
        .bind(&booking.project_description)
        .bind(BookingStatus::Pending.to_string())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(id)
    }

    async fn mark_email_sent(&self, id: BookingId) -> Result<(), RepositoryError> {
        self.set_flag(id, Flag::Email).await
    }

    async fn mark_whatsapp_sent(&self, id: BookingId) -> Result<(), RepositoryError> {
        self.set_flag(id, Flag::WhatsApp).await
    }
}

// =============================================================================
// Admin repository
// =============================================================================

const BOOKING_COLUMNS: &str = "id, client_name, client_email, client_phone, project_type, \
     project_description, budget, timeline, additional_notes, status, whatsapp_sent, email_sent, \
     created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct BookingRow {
    id: Uuid,
    client_name: String,
    client_email: String,
    client_phone: Option<String>,
    project_type: String,
    project_description: String,
    budget: Option<String>,
    timeline: Option<String>,
    additional_notes: Option<String>,
    status: String,
    whatsapp_sent: bool,
    email_sent: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<BookingRow> for Booking {
    type Error = RepositoryError;

    fn try_from(row: BookingRow) -> Result<Self, Self::Error> {
        let client_email = Email::parse(&row.client_email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;
        let status = row
            .status
            .parse::<BookingStatus>()
            .map_err(RepositoryError::DataCorruption)?;

        Ok(Self {
            id: BookingId::new(row.id),
            client_name: row.client_name,
            client_email,
            client_phone: row.client_phone,
            project_type: row.project_type,
            project_description: row.project_description,
            budget: row.budget,
            timeline: row.timeline,
            additional_notes: row.additional_notes,
            status,
            whatsapp_sent: row.whatsapp_sent,
            email_sent: row.email_sent,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Admin access to bookings. Every call is scoped to the acting admin.
pub struct BookingRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> BookingRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Most recent bookings first; `limit` of `None` returns all.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a row holds an invalid email or status.
    pub async fn list_recent(
        &self,
        actor: &Actor,
        limit: Option<i64>,
    ) -> Result<Vec<Booking>, RepositoryError> {
        let mut tx = scoped(self.pool, actor).await?;
        let rows = sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings ORDER BY created_at DESC LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(&mut *tx)
        .await?;
        tx.commit().await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Get a booking by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(
        &self,
        actor: &Actor,
        id: BookingId,
    ) -> Result<Option<Booking>, RepositoryError> {
        let mut tx = scoped(self.pool, actor).await?;
        let row = sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
        tx.commit().await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Update workflow fields and stamp `updated_at`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no row was updated.
    pub async fn update(
        &self,
        actor: &Actor,
        id: BookingId,
        input: &BookingInput,
    ) -> Result<(), RepositoryError> {
        let mut tx = scoped(self.pool, actor).await?;

        let result = sqlx::query(
            r"
            UPDATE bookings SET
                status = COALESCE($2, status),
                budget = CASE WHEN $3::text IS NULL THEN budget ELSE NULLIF($3, '') END,
                timeline = CASE WHEN $4::text IS NULL THEN timeline ELSE NULLIF($4, '') END,
                additional_notes = CASE WHEN $5::text IS NULL THEN additional_notes ELSE NULLIF($5, '') END,
                updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(input.status.map(|s| s.to_string()))
        .bind(input.budget.as_deref())
        .bind(input.timeline.as_deref())
        .bind(input.additional_notes.as_deref())
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        tx.commit().await?;
        Ok(())
    }

    /// Delete a booking.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no row was deleted.
    pub async fn delete(&self, actor: &Actor, id: BookingId) -> Result<(), RepositoryError> {
        let mut tx = scoped(self.pool, actor).await?;

        let result = sqlx::query("DELETE FROM bookings WHERE id = $1")
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
