//! Contact endpoint: persistence, notifications, invalidation.

use axum::http::StatusCode;
use opal_integration_tests::{TestApp, body_text};
use opal_site::error::AppError;
use serde_json::{Value, json};

fn submission() -> Value {
    json!({
        "name": "Mara Lind",
        "email": "mara@example.com",
        "phone": "+15551234567",
        "message": "We need a new site for our bakery."
    })
}

#[tokio::test]
async fn test_contact_saves_booking() {
    let app = TestApp::new();

    let response = app.post_json("/api/contact", &submission()).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(body["success"], json!(true));

    let bookings = app.bookings.all();
    assert_eq!(bookings.len(), 1);
    assert_eq!(body["booking_id"], json!(bookings[0].id));
    assert_eq!(bookings[0].booking.client_email.as_str(), "mara@example.com");
    assert_eq!(bookings[0].booking.project_type, "General Inquiry");

    let attempts = app.notifier.wait_for(2).await;
    assert_eq!(attempts, vec!["admin_email", "client_confirmation"]);
    assert!(app.bookings.all()[0].email_sent);
    assert!(!app.bookings.all()[0].whatsapp_sent);
}

#[tokio::test]
async fn test_contact_succeeds_when_email_fails() {
    let app = TestApp::new();
    app.notifier.fail_email();

    let response = app.post_json("/api/contact", &submission()).await;
    assert_eq!(response.status(), StatusCode::OK);

    app.notifier.wait_for(2).await;
    let bookings = app.bookings.all();
    assert_eq!(bookings.len(), 1);
    assert!(!bookings[0].email_sent);
}

#[tokio::test]
async fn test_contact_sends_whatsapp_when_enabled() {
    let app = TestApp::new();
    app.notifier.enable_whatsapp();

    app.post_json("/api/contact", &submission()).await;

    let attempts = app.notifier.wait_for(3).await;
    assert_eq!(
        attempts,
        vec!["admin_email", "whatsapp:+15551234567", "client_confirmation"]
    );
    assert!(app.bookings.all()[0].whatsapp_sent);
}

#[tokio::test]
async fn test_contact_missing_fields() {
    let app = TestApp::new();

    let response = app
        .post_json("/api/contact", &json!({ "name": "Mara", "message": "Hi" }))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(body["error"], json!("Missing required fields"));
    assert!(app.bookings.all().is_empty());
}

#[tokio::test]
async fn test_contact_invalid_body() {
    let app = TestApp::new();

    let response = app.post_json("/api/contact", &json!("not an object")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(app.bookings.all().is_empty());
}

#[tokio::test]
async fn test_contact_invalidates_booking_pages() {
    let app = TestApp::new();
    for path in ["/admin/bookings", "/admin/dashboard"] {
        app.state
            .pages()
            .get_or_render(path, async { Ok::<_, AppError>("stale".to_string()) })
            .await
            .unwrap();
    }

    app.post_json("/api/contact", &submission()).await;

    assert!(!app.state.pages().contains("/admin/bookings").await);
    assert!(!app.state.pages().contains("/admin/dashboard").await);
}
