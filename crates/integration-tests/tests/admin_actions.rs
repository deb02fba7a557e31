//! Admin roster actions and page cache invalidation.

use axum::http::StatusCode;
use opal_core::{AdminRole, Email};
use opal_integration_tests::{TestApp, body_text, location};
use opal_site::actions::admins::{AddAdminOutcome, add_admin, remove_admin};
use opal_site::error::AppError;
use opal_site::models::NewAdmin;
use secrecy::SecretString;

fn new_admin(email: &str, password: Option<&str>) -> NewAdmin {
    NewAdmin {
        email: Email::parse(email).unwrap(),
        first_name: Some("New".to_string()),
        last_name: None,
        role: AdminRole::Admin,
        password: password.map(SecretString::from),
    }
}

async fn warm(app: &TestApp, path: &str) {
    app.state
        .pages()
        .get_or_render(path, async { Ok::<_, AppError>("stale".to_string()) })
        .await
        .unwrap();
    assert!(app.state.pages().contains(path).await);
}

#[tokio::test]
async fn test_add_admin_without_account_records_pending() {
    let app = TestApp::new();
    let (_, session) = app.admin("grace@opal.studio", AdminRole::SuperAdmin);

    let outcome = add_admin(&app.state, &session.identity(), &new_admin("new@opal.studio", None))
        .await
        .unwrap();

    let AddAdminOutcome::Pending(pending) = outcome else {
        panic!("expected a pending admin");
    };
    assert_eq!(pending.email.as_str(), "new@opal.studio");
    assert_eq!(app.admins.pending().len(), 1);
}

#[tokio::test]
async fn test_add_admin_twice_conflicts() {
    let app = TestApp::new();
    let (_, session) = app.admin("grace@opal.studio", AdminRole::SuperAdmin);
    let identity = session.identity();

    add_admin(&app.state, &identity, &new_admin("new@opal.studio", None))
        .await
        .unwrap();
    let err = add_admin(&app.state, &identity, &new_admin("new@opal.studio", None))
        .await
        .unwrap_err();

    assert_eq!(err.status(), StatusCode::CONFLICT);
    assert_eq!(app.admins.pending().len(), 1);
}

#[tokio::test]
async fn test_add_admin_with_existing_account() {
    let app = TestApp::new();
    let (_, session) = app.admin("grace@opal.studio", AdminRole::SuperAdmin);
    let user = app.sessions.add_account("new@opal.studio", "correct-horse-battery");
    app.admins.add_user(&user);

    let outcome = add_admin(&app.state, &session.identity(), &new_admin("new@opal.studio", None))
        .await
        .unwrap();

    assert!(matches!(outcome, AddAdminOutcome::Admin(id) if id == user.id));
    assert!(app.admins.pending().is_empty());
}

#[tokio::test]
async fn test_add_admin_with_password_creates_account() {
    let app = TestApp::new();
    let (_, session) = app.admin("grace@opal.studio", AdminRole::SuperAdmin);

    let outcome = add_admin(
        &app.state,
        &session.identity(),
        &new_admin("new@opal.studio", Some("correct-horse-battery")),
    )
    .await
    .unwrap();

    let AddAdminOutcome::Admin(user_id) = outcome else {
        panic!("expected an admin");
    };
    assert!(app.admins.admin(user_id).is_some());
}

#[tokio::test]
async fn test_add_admin_rejects_weak_password() {
    let app = TestApp::new();
    let (_, session) = app.admin("grace@opal.studio", AdminRole::SuperAdmin);

    let err = add_admin(
        &app.state,
        &session.identity(),
        &new_admin("new@opal.studio", Some("short")),
    )
    .await
    .unwrap_err();
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_admin_cannot_remove_themselves() {
    let app = TestApp::new();
    let (user, session) = app.admin("grace@opal.studio", AdminRole::SuperAdmin);

    let err = remove_admin(&app.state, &session.identity(), user.id)
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    assert!(app.admins.admin(user.id).is_some());
}

#[tokio::test]
async fn test_actions_invalidate_cached_pages() {
    let app = TestApp::new();
    let (_, session) = app.admin("grace@opal.studio", AdminRole::SuperAdmin);
    warm(&app, "/admin/admins").await;

    add_admin(&app.state, &session.identity(), &new_admin("new@opal.studio", None))
        .await
        .unwrap();

    assert!(!app.state.pages().contains("/admin/admins").await);
}

#[tokio::test]
async fn test_admins_page_shows_new_pending_admin_after_create() {
    let app = TestApp::new();
    let (_, session) = app.admin("grace@opal.studio", AdminRole::SuperAdmin);

    let before = body_text(app.get("/admin/admins", Some(&session)).await).await;
    assert!(!before.contains("new@opal.studio"));

    let response = app
        .post_form("/admin/admins", "email=new%40opal.studio&role=admin", Some(&session))
        .await;
    assert_eq!(location(&response), Some("/admin/admins"));

    let after = body_text(app.get("/admin/admins", Some(&session)).await).await;
    assert!(after.contains("new@opal.studio"));
    assert!(after.contains("Pending"));
}
