//! Edge interceptor: login redirects, refresh, cookie propagation.

use std::time::Duration;

use axum::body::Body;
use axum::http::StatusCode;
use opal_core::AdminRole;
use opal_integration_tests::{TestApp, location, refreshed_session, request, set_auth_cookie};
use opal_site::middleware::IDENTITY_HEADER;
use tower::ServiceExt;

// ============================================================================
// Login redirects
// ============================================================================

#[tokio::test]
async fn test_signed_out_admin_get_redirects_to_login() {
    let app = TestApp::new();

    for path in ["/admin", "/admin/dashboard", "/admin/projects/new"] {
        let response = app.get(path, None).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER, "{path}");
        assert_eq!(location(&response), Some("/admin/login"), "{path}");
    }
}

#[tokio::test]
async fn test_login_page_is_open_to_signed_out_visitors() {
    let app = TestApp::new();

    let response = app.get("/admin/login", None).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_signed_out_post_reaches_handler() {
    let app = TestApp::new();

    // The interceptor never redirects a POST; logout runs and clears the cookie itself.
    let response = app.post_form("/admin/logout", "", None).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), Some("/admin/login"));
    assert_eq!(set_auth_cookie(&response).as_deref(), Some(""));
}

#[tokio::test]
async fn test_client_identity_header_is_stripped() {
    let app = TestApp::new();
    let (user, session) = app.admin("ada@opal.studio", AdminRole::SuperAdmin);
    let forged = app.state.signer().sign(&session.identity());

    let response = app
        .send(
            request("POST", "/admin/projects", None)
                .header(IDENTITY_HEADER, forged)
                .header("content-type", "application/x-www-form-urlencoded")
                .body(Body::from("title=Stolen"))
                .unwrap(),
        )
        .await;

    assert_eq!(location(&response), Some("/admin/login"));
    assert_eq!(app.admins.lookups(), 0, "guard must not see {}", user.id);
}

// ============================================================================
// Refresh
// ============================================================================

#[tokio::test]
async fn test_static_assets_skip_session_work() {
    let app = TestApp::new();
    let (user, _) = app.admin("ada@opal.studio", AdminRole::Admin);
    let expired = app.sessions.expired_session(&user);

    let response = app.get("/static/css/site.css", Some(&expired)).await;

    assert_eq!(app.sessions.refresh_calls(), 0);
    assert!(set_auth_cookie(&response).is_none());
}

#[tokio::test]
async fn test_expired_session_is_refreshed_and_propagated() {
    let app = TestApp::new();
    let (user, _) = app.admin("ada@opal.studio", AdminRole::Admin);
    let expired = app.sessions.expired_session(&user);

    let response = app.get("/admin/projects/new", Some(&expired)).await;

    // The handler saw the refreshed identity...
    assert_eq!(response.status(), StatusCode::OK);
    // ...and the browser receives the new session.
    let fresh = refreshed_session(&response).expect("refreshed cookie");
    assert_eq!(fresh.user.id, user.id);
    assert_ne!(fresh.refresh_token, expired.refresh_token);
    assert_eq!(app.sessions.refresh_calls(), 1);
}

#[tokio::test]
async fn test_valid_session_is_not_refreshed() {
    let app = TestApp::new();
    let (_, session) = app.admin("ada@opal.studio", AdminRole::Admin);

    let response = app.get("/admin/projects/new", Some(&session)).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(set_auth_cookie(&response).is_none());
    assert_eq!(app.sessions.refresh_calls(), 0);
}

#[tokio::test]
async fn test_concurrent_requests_redeem_refresh_token_once() {
    let app = TestApp::new();
    let (user, _) = app.admin("ada@opal.studio", AdminRole::Admin);
    let expired = app.sessions.expired_session(&user);
    app.sessions.set_refresh_delay(Duration::from_millis(50));

    let handles: Vec<_> = (0..5)
        .map(|_| {
            let router = app.router.clone();
            let req = request("GET", "/admin/projects/new", Some(&expired))
                .body(Body::empty())
                .unwrap();
            tokio::spawn(async move { router.oneshot(req).await.unwrap() })
        })
        .collect();

    let mut tokens = Vec::new();
    for handle in handles {
        let response = handle.await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        tokens.push(refreshed_session(&response).expect("refreshed cookie").refresh_token);
    }

    assert_eq!(app.sessions.refresh_calls(), 1);
    tokens.dedup();
    assert_eq!(tokens.len(), 1, "every request carries the same new session");

    // A straggler still holding the old cookie gets the already-issued session.
    let late = app.get("/admin/projects/new", Some(&expired)).await;
    assert_eq!(late.status(), StatusCode::OK);
    assert_eq!(
        refreshed_session(&late).map(|s| s.refresh_token),
        tokens.pop()
    );
    assert_eq!(app.sessions.refresh_calls(), 1);
}

#[tokio::test]
async fn test_already_used_refresh_token_is_treated_as_signed_out() {
    let app = TestApp::new();
    let (user, _) = app.admin("ada@opal.studio", AdminRole::Admin);
    let expired = app.sessions.expired_session(&user);
    app.sessions.reject_refresh_as_used();

    let response = app.get("/admin/projects/new", Some(&expired)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), Some("/admin/login"));
    // The cookie is left alone.
    assert!(set_auth_cookie(&response).is_none());

    let response = app.get("/admin/login", Some(&expired)).await;
    assert_eq!(response.status(), StatusCode::OK);
}
