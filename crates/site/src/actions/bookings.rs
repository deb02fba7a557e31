//! Booking actions.
//!
//! Bookings are created by the public contact endpoint; admins only move
//! them through the workflow, annotate them, or delete them.

use tracing::instrument;

use opal_core::{BookingId, ContentKind};

use super::{ActionError, DASHBOARD_PATH, actor, settle};
use crate::db::BookingRepository;
use crate::models::{BookingInput, Identity};
use crate::state::AppState;

const KIND: ContentKind = ContentKind::Booking;

/// Admin pages that show a booking.
#[must_use]
pub fn invalidation_paths(id: BookingId) -> Vec<String> {
    vec![
        "/admin/bookings".to_string(),
        format!("/admin/bookings/{id}"),
        DASHBOARD_PATH.to_string(),
    ]
}

/// Update a booking's workflow fields.
///
/// # Errors
///
/// Returns an `ActionError` if the booking does not exist or the update fails.
#[instrument(skip(state, identity, input), fields(user_id = %identity.user_id))]
pub async fn update_booking(
    state: &AppState,
    identity: &Identity,
    id: BookingId,
    input: &BookingInput,
) -> Result<(), ActionError> {
    BookingRepository::new(state.pool())
        .update(&actor(identity), id, input)
        .await
        .map_err(ActionError::repo(KIND, "update"))?;

    settle(state, KIND, "update", &invalidation_paths(id)).await;
    Ok(())
}

/// Delete a booking.
///
/// # Errors
///
/// Returns an `ActionError` if the booking does not exist or the delete fails.
#[instrument(skip(state, identity), fields(user_id = %identity.user_id))]
pub async fn delete_booking(
    state: &AppState,
    identity: &Identity,
    id: BookingId,
) -> Result<(), ActionError> {
    BookingRepository::new(state.pool())
        .delete(&actor(identity), id)
        .await
        .map_err(ActionError::repo(KIND, "delete"))?;

    settle(state, KIND, "delete", &invalidation_paths(id)).await;
    Ok(())
}
