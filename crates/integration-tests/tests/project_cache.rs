//! Deleting a project through the admin reaches the cached pages that showed it.
//!
//! Requires a `PostgreSQL` database at `DATABASE_URL`; the site migrations
//! are run first.
//!
//! Run with: `cargo test -p opal-integration-tests -- --ignored`

use axum::http::StatusCode;
use opal_core::{AdminRole, UserId};
use opal_integration_tests::{TestApp, body_text};
use sqlx::PgPool;
use uuid::Uuid;

async fn pool() -> PgPool {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = PgPool::connect(&url).await.expect("Failed to connect");
    sqlx::migrate!("../site/migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");
    pool
}

/// Mirror an in-memory admin into the database so row-level security lets it write.
async fn grant_admin(pool: &PgPool, id: UserId, email: &str) {
    sqlx::query("INSERT INTO auth.users (id, email) VALUES ($1, $2)")
        .bind(id)
        .bind(email)
        .execute(pool)
        .await
        .unwrap();
    sqlx::query("INSERT INTO admins (id, role) VALUES ($1, 'admin')")
        .bind(id)
        .execute(pool)
        .await
        .unwrap();
}

#[tokio::test]
#[ignore = "Requires a PostgreSQL database"]
async fn test_deleted_project_disappears_from_cached_pages() {
    let pool = pool().await;
    let app = TestApp::with_pool(pool.clone());

    let email = format!("editor-{}@opal.studio", Uuid::new_v4());
    let (user, session) = app.admin(&email, AdminRole::Admin);
    grant_admin(&pool, user.id, &email).await;

    let title = format!("Atlas {}", Uuid::new_v4());
    let id: Uuid = sqlx::query_scalar(
        "INSERT INTO projects (title, description, category) VALUES ($1, 'Rebrand', 'Branding') RETURNING id",
    )
    .bind(&title)
    .fetch_one(&pool)
    .await
    .unwrap();
    let detail = format!("/work/{id}");

    let response = app.get(&detail, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains(&title));
    let response = app.get("/admin/projects", Some(&session)).await;
    assert!(body_text(response).await.contains(&title));
    assert!(app.state.pages().contains(&detail).await);

    let response = app
        .post_form(&format!("/admin/projects/{id}/delete"), "", Some(&session))
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let response = app.get(&detail, None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let response = app.get("/admin/projects", Some(&session)).await;
    assert!(!body_text(response).await.contains(&title));
}

#[tokio::test]
#[ignore = "Requires a PostgreSQL database"]
async fn test_pages_built_from_several_queries_render() {
    let pool = pool().await;
    let app = TestApp::with_pool(pool.clone());

    let email = format!("viewer-{}@opal.studio", Uuid::new_v4());
    let (user, session) = app.admin(&email, AdminRole::Admin);
    grant_admin(&pool, user.id, &email).await;

    for path in ["/", "/about"] {
        let response = app.get(path, None).await;
        assert_eq!(response.status(), StatusCode::OK, "{path}");
    }
    let response = app.get("/admin/dashboard", Some(&session)).await;
    assert_eq!(response.status(), StatusCode::OK);
}
