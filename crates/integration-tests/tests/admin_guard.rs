//! Identity resolution, the protected layout guard, and sign-in.

use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use opal_core::AdminRole;
use opal_integration_tests::{TestApp, auth_cookie, body_text, location, set_auth_cookie};
use opal_site::config::AdminLookupFailurePolicy;
use opal_site::middleware::AuthContext;

// ============================================================================
// Resolver
// ============================================================================

#[tokio::test]
async fn test_resolver_memoizes_within_a_request() {
    let app = TestApp::new();
    let (user, session) = app.admin("ada@opal.studio", AdminRole::Admin);

    let mut headers = HeaderMap::new();
    headers.insert(header::COOKIE, HeaderValue::from_str(&auth_cookie(&session)).unwrap());

    let ctx = AuthContext::new();
    assert!(!ctx.is_resolved());
    let first = ctx.resolve(&app.state, &headers).await;
    assert_eq!(first.as_ref().map(|i| i.user_id), Some(user.id));
    assert!(ctx.is_resolved());

    // Later asks reuse the first answer even if the inputs changed.
    let second = ctx.resolve(&app.state, &HeaderMap::new()).await;
    assert_eq!(first, second);
    assert_eq!(app.sessions.network_calls(), 0);
}

#[tokio::test]
async fn test_admin_page_makes_no_auth_service_calls() {
    let app = TestApp::new();
    let (_, session) = app.admin("ada@opal.studio", AdminRole::Admin);

    let response = app.get("/admin/projects/new", Some(&session)).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(app.sessions.network_calls(), 0);
    assert_eq!(app.admins.lookups(), 1);
}

// ============================================================================
// Guard
// ============================================================================

#[tokio::test]
async fn test_account_without_admin_record_is_sent_to_login() {
    let app = TestApp::new();
    let user = app.sessions.add_account("visitor@example.com", "correct-horse-battery");
    let session = app.sessions.valid_session(&user);

    let response = app.get("/admin/projects/new", Some(&session)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), Some("/admin/login"));
}

#[tokio::test]
async fn test_lookup_failure_fails_open_by_default() {
    let app = TestApp::new();
    let (_, session) = app.admin("ada@opal.studio", AdminRole::SuperAdmin);
    app.admins.set_failing(true);

    let response = app.get("/admin/projects/new", Some(&session)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_text(response).await;
    assert!(body.contains("could not be loaded"));
    assert!(body.contains("User"));
    // Degraded views get the plain admin role, so no super admin links.
    assert!(!body.contains("/admin/settings"));
}

#[tokio::test]
async fn test_lookup_failure_fails_closed_when_configured() {
    let app = TestApp::with_policy(AdminLookupFailurePolicy::FailClosed);
    let (_, session) = app.admin("ada@opal.studio", AdminRole::SuperAdmin);
    app.admins.set_failing(true);

    let response = app.get("/admin/projects/new", Some(&session)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), Some("/admin/login"));
}

#[tokio::test]
async fn test_super_admin_pages() {
    let app = TestApp::new();
    let (_, admin) = app.admin("ada@opal.studio", AdminRole::Admin);
    let (_, super_admin) = app.admin("grace@opal.studio", AdminRole::SuperAdmin);

    let response = app.get("/admin/admins/new", Some(&admin)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), Some("/admin/dashboard"));

    let response = app.get("/admin/admins/new", Some(&super_admin)).await;
    assert_eq!(response.status(), StatusCode::OK);
}

// ============================================================================
// Sign-in
// ============================================================================

#[tokio::test]
async fn test_login_promotes_pending_admin() {
    let app = TestApp::new();
    let (_, super_admin) = app.admin("grace@opal.studio", AdminRole::SuperAdmin);

    let response = app
        .post_form(
            "/admin/admins",
            "email=new%40opal.studio&first_name=New&role=admin",
            Some(&super_admin),
        )
        .await;
    assert_eq!(location(&response), Some("/admin/admins"));
    assert_eq!(app.admins.pending().len(), 1);

    let user = app.sessions.add_account("new@opal.studio", "correct-horse-battery");
    let response = app
        .post_form(
            "/admin/login",
            "email=new%40opal.studio&password=correct-horse-battery",
            None,
        )
        .await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), Some("/admin/dashboard"));
    assert!(set_auth_cookie(&response).is_some_and(|v| !v.is_empty()));
    assert!(app.admins.pending().is_empty());
    assert_eq!(app.admins.admin(user.id).map(|a| a.role), Some(AdminRole::Admin));
}

#[tokio::test]
async fn test_login_rejects_non_admin_and_signs_out() {
    let app = TestApp::new();
    app.sessions.add_account("visitor@example.com", "correct-horse-battery");

    let response = app
        .post_form(
            "/admin/login",
            "email=visitor%40example.com&password=correct-horse-battery",
            None,
        )
        .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(set_auth_cookie(&response).is_none());
    assert_eq!(app.sessions.sign_out_calls(), 1);
}

#[tokio::test]
async fn test_login_wrong_password() {
    let app = TestApp::new();
    app.admin("ada@opal.studio", AdminRole::Admin);

    let response = app
        .post_form(
            "/admin/login",
            "email=ada%40opal.studio&password=wrong-password",
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_page_sends_signed_in_admin_to_dashboard() {
    let app = TestApp::new();
    let (_, session) = app.admin("ada@opal.studio", AdminRole::Admin);

    let response = app.get("/admin/login", Some(&session)).await;
    assert_eq!(location(&response), Some("/admin/dashboard"));
    assert_eq!(app.sessions.get_user_calls(), 1);
}
