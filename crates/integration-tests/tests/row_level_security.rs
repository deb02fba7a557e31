//! Row-level security policies against a real database.
//!
//! These tests require a `PostgreSQL` database at `DATABASE_URL`; they run
//! the site migrations first.
//!
//! Run with: `cargo test -p opal-integration-tests -- --ignored`

use opal_core::{Email, UserId};
use opal_site::db::{Actor, BookingStore, PgBookingStore, scoped};
use opal_site::models::{Identity, NewBooking};
use sqlx::PgPool;

async fn pool() -> PgPool {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = PgPool::connect(&url).await.expect("Failed to connect");
    sqlx::migrate!("../site/migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");
    pool
}

fn stranger() -> Actor {
    Actor::Authenticated(Identity {
        user_id: UserId::generate(),
        email: "stranger@example.com".to_string(),
    })
}

#[tokio::test]
#[ignore = "Requires a PostgreSQL database"]
async fn test_visitors_can_submit_but_not_read_bookings() {
    let pool = pool().await;

    PgBookingStore::new(pool.clone())
        .insert(&NewBooking {
            client_name: "Mara".to_string(),
            client_email: Email::parse("mara@example.com").unwrap(),
            client_phone: None,
            project_type: "General Inquiry".to_string(),
            project_description: "Hello".to_string(),
        })
        .await
        .expect("anonymous insert is allowed");

    let mut tx = scoped(&pool, &Actor::Anonymous).await.unwrap();
    let visible: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM bookings")
        .fetch_one(&mut *tx)
        .await
        .unwrap();
    assert_eq!(visible, 0);
}

#[tokio::test]
#[ignore = "Requires a PostgreSQL database"]
async fn test_non_admins_cannot_write_content() {
    let pool = pool().await;

    for actor in [Actor::Anonymous, stranger()] {
        let mut tx = scoped(&pool, &actor).await.unwrap();
        let result = sqlx::query("INSERT INTO services (title, description) VALUES ('x', 'y')")
            .execute(&mut *tx)
            .await;
        assert!(result.is_err(), "{actor:?} must not insert services");
    }
}

#[tokio::test]
#[ignore = "Requires a PostgreSQL database"]
async fn test_drafts_are_hidden_from_visitors() {
    let pool = pool().await;

    let mut tx = scoped(&pool, &Actor::Anonymous).await.unwrap();
    let drafts: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM blog_posts WHERE NOT published")
        .fetch_one(&mut *tx)
        .await
        .unwrap();
    assert_eq!(drafts, 0);
}
