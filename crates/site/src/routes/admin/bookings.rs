//! Admin booking pages.
//!
//! Bookings arrive through the contact endpoint; admins only move them
//! through the workflow, add notes, or delete them.

use askama::Template;
use axum::{
    Form,
    extract::{Path, State},
    response::{Html, Redirect},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use opal_core::{BookingId, BookingStatus, ContentKind};

use super::{AdminChrome, fragment, optional, page};
use crate::actions::bookings::{delete_booking, update_booking};
use crate::actions::{ActionError, admin_list_path};
use crate::db::{Actor, BookingRepository};
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::{RequireAdmin, set_flash};
use crate::models::{Booking, BookingInput};
use crate::state::AppState;

const LIST_PATH: &str = admin_list_path(ContentKind::Booking);

#[derive(Template)]
#[template(path = "admin/bookings/table.html")]
struct BookingsTable {
    bookings: Vec<Booking>,
}

#[derive(Template)]
#[template(path = "admin/bookings/index.html")]
struct BookingsIndexTemplate {
    chrome: AdminChrome,
    table: String,
}

#[derive(Template)]
#[template(path = "admin/bookings/detail.html")]
struct BookingDetail {
    booking: Booking,
    statuses: [BookingStatus; 4],
}

#[derive(Template)]
#[template(path = "admin/bookings/show.html")]
struct BookingShowTemplate {
    chrome: AdminChrome,
    detail: String,
}

/// Workflow form on the booking detail page.
#[derive(Debug, Deserialize)]
pub struct BookingForm {
    pub status: BookingStatus,
    #[serde(default)]
    pub budget: String,
    #[serde(default)]
    pub timeline: String,
    #[serde(default)]
    pub additional_notes: String,
}

impl From<BookingForm> for BookingInput {
    fn from(form: BookingForm) -> Self {
        Self {
            status: Some(form.status),
            budget: optional(form.budget),
            timeline: optional(form.timeline),
            additional_notes: optional(form.additional_notes),
        }
    }
}

/// `GET /admin/bookings`
#[instrument(skip(admin, state, session), fields(user_id = %admin.user_id))]
pub async fn index(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    session: Session,
) -> Result<Html<String>> {
    let actor = Actor::Authenticated(admin.identity());

    let table = fragment(&state, &admin, LIST_PATH, async {
        let bookings = BookingRepository::new(state.pool())
            .list_recent(&actor, None)
            .await?;
        Ok(BookingsTable { bookings }.render()?)
    })
    .await?;

    page(&BookingsIndexTemplate {
        chrome: AdminChrome::new(admin, LIST_PATH, &session).await,
        table,
    })
}

/// `GET /admin/bookings/{id}`
#[instrument(skip(admin, state, session), fields(user_id = %admin.user_id))]
pub async fn show(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<BookingId>,
) -> Result<Html<String>> {
    let actor = Actor::Authenticated(admin.identity());
    let key = format!("{LIST_PATH}/{id}");

    let detail = fragment(&state, &admin, &key, async {
        let booking = BookingRepository::new(state.pool())
            .get(&actor, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("booking {id}")))?;
        Ok(BookingDetail {
            booking,
            statuses: BookingStatus::ALL,
        }
        .render()?)
    })
    .await?;

    page(&BookingShowTemplate {
        chrome: AdminChrome::new(admin, LIST_PATH, &session).await,
        detail,
    })
}

/// `POST /admin/bookings/{id}`
pub async fn update(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<BookingId>,
    Form(form): Form<BookingForm>,
) -> std::result::Result<Redirect, ActionError> {
    update_booking(&state, &admin.identity(), id, &form.into()).await?;
    set_flash(&session, "Booking updated").await;
    Ok(Redirect::to(&format!("{LIST_PATH}/{id}")))
}

/// `POST /admin/bookings/{id}/delete`
pub async fn delete(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<BookingId>,
) -> std::result::Result<Redirect, ActionError> {
    delete_booking(&state, &admin.identity(), id).await?;
    set_flash(&session, "Booking deleted").await;
    Ok(Redirect::to(LIST_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_form_sets_status_and_clears_blank_notes() {
        let input = BookingInput::from(BookingForm {
            status: BookingStatus::InProgress,
            budget: " $5k ".to_string(),
            timeline: String::new(),
            additional_notes: String::new(),
        });
        assert_eq!(input.status, Some(BookingStatus::InProgress));
        assert_eq!(input.budget.as_deref(), Some("$5k"));
        assert_eq!(input.timeline.as_deref(), Some(""));
    }
}
