//! Contact form endpoint.
//!
//! The booking is persisted before replying; notifications go out afterwards
//! on a background task, so a slow or broken mail server never fails the
//! visitor's submission.

use std::sync::Arc;

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use opal_core::{BookingId, Email};

use crate::actions::bookings::invalidation_paths;
use crate::db::BookingStore;
use crate::models::NewBooking;
use crate::services::notify::{BookingNotice, Notifier, whatsapp_greeting};
use crate::state::AppState;

/// Project type recorded for submissions from the contact form.
pub const GENERAL_INQUIRY: &str = "General Inquiry";

/// Contact form submission.
#[derive(Debug, Deserialize)]
pub struct ContactRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Successful submission.
#[derive(Debug, Serialize)]
pub struct ContactResponse {
    pub success: bool,
    pub booking_id: BookingId,
}

/// Failed submission.
#[derive(Debug, Serialize)]
pub struct ContactError {
    pub error: &'static str,
}

fn reject(status: StatusCode, error: &'static str) -> Response {
    (status, Json(ContactError { error })).into_response()
}

/// A submission with every required field present and trimmed.
struct Submission {
    name: String,
    email: Email,
    phone: Option<String>,
    message: String,
}

fn validate(request: ContactRequest) -> Result<Submission, Response> {
    let field = |value: Option<String>| {
        value
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let (Some(name), Some(email), Some(message)) = (
        field(request.name),
        field(request.email),
        field(request.message),
    ) else {
        return Err(reject(StatusCode::BAD_REQUEST, "Missing required fields"));
    };

    let email = Email::parse(&email)
        .map_err(|_| reject(StatusCode::BAD_REQUEST, "Invalid email address"))?;

    Ok(Submission {
        name,
        email,
        phone: field(request.phone),
        message,
    })
}

/// `POST /api/contact`
#[instrument(skip(state, body))]
pub async fn submit(
    State(state): State<AppState>,
    body: Result<Json<ContactRequest>, JsonRejection>,
) -> Response {
    let Ok(Json(request)) = body else {
        return reject(StatusCode::BAD_REQUEST, "Invalid request body");
    };

    let submission = match validate(request) {
        Ok(submission) => submission,
        Err(response) => return response,
    };

    let booking = NewBooking {
        client_name: submission.name.clone(),
        client_email: submission.email.clone(),
        client_phone: submission.phone.clone(),
        project_type: GENERAL_INQUIRY.to_string(),
        project_description: submission.message.clone(),
    };

    let booking_id = match state.bookings().insert(&booking).await {
        Ok(id) => id,
        Err(e) => {
            let event_id = sentry::capture_error(&e);
            tracing::error!(error = %e, sentry_event_id = %event_id, "Failed to save booking");
            return reject(StatusCode::INTERNAL_SERVER_ERROR, "Failed to save booking");
        }
    };
    tracing::info!(booking_id = %booking_id, "Booking received");

    state.pages().invalidate(invalidation_paths(booking_id)).await;

    let notice = BookingNotice {
        booking_id,
        name: submission.name,
        email: submission.email,
        phone: submission.phone,
        message: submission.message,
    };
    tokio::spawn(dispatch_notifications(
        state.bookings(),
        state.notifier(),
        notice,
    ));

    (
        StatusCode::OK,
        Json(ContactResponse {
            success: true,
            booking_id,
        }),
    )
        .into_response()
}

/// Send every notification for a new booking, recording which ones went out.
///
/// Failures are logged and never propagated.
pub async fn dispatch_notifications(
    bookings: Arc<dyn BookingStore>,
    notifier: Arc<dyn Notifier>,
    notice: BookingNotice,
) {
    let id = notice.booking_id;

    match notifier.send_admin_booking_email(&notice).await {
        Ok(()) => {
            if let Err(e) = bookings.mark_email_sent(id).await {
                tracing::warn!(booking_id = %id, error = %e, "Failed to record email_sent");
            }
        }
        Err(e) => tracing::warn!(booking_id = %id, error = %e, "Admin booking email failed"),
    }

    if let Some(phone) = notice.phone.as_deref()
        && notifier.whatsapp_enabled()
    {
        match notifier
            .send_whatsapp(phone, &whatsapp_greeting(&notice.name))
            .await
        {
            Ok(()) => {
                if let Err(e) = bookings.mark_whatsapp_sent(id).await {
                    tracing::warn!(booking_id = %id, error = %e, "Failed to record whatsapp_sent");
                }
            }
            Err(e) => tracing::warn!(booking_id = %id, error = %e, "WhatsApp message failed"),
        }
    }

    if let Err(e) = notifier.send_client_confirmation(&notice).await {
        tracing::warn!(booking_id = %id, error = %e, "Client confirmation email failed");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn request(name: &str, email: &str, message: &str) -> ContactRequest {
        ContactRequest {
            name: Some(name.to_string()),
            email: Some(email.to_string()),
            phone: Some("  ".to_string()),
            message: Some(message.to_string()),
        }
    }

    #[test]
    fn test_validate_trims_and_drops_blank_phone() {
        let submission = validate(request(" Ada ", "ada@example.com", " Hi ")).ok().unwrap();
        assert_eq!(submission.name, "Ada");
        assert_eq!(submission.message, "Hi");
        assert_eq!(submission.phone, None);
    }

    #[test]
    fn test_validate_missing_fields() {
        let response = validate(request("Ada", "", "Hi")).err().unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_validate_bad_email() {
        let response = validate(request("Ada", "not-an-email", "Hi")).err().unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
