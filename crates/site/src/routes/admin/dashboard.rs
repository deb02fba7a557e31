//! Admin dashboard.

use askama::Template;
use axum::{extract::State, response::Html};
use tower_sessions::Session;
use tracing::instrument;

use super::{AdminChrome, fragment, page};
use crate::actions::DASHBOARD_PATH;
use crate::db::{Actor, BookingRepository, DashboardCounts, DashboardRepository};
use crate::error::Result;
use crate::filters;
use crate::middleware::RequireAdmin;
use crate::models::Booking;
use crate::state::AppState;

/// Bookings shown under "Recent bookings".
const RECENT_BOOKINGS: i64 = 5;

#[derive(Template)]
#[template(path = "admin/dashboard/stats.html")]
struct StatsFragment {
    counts: DashboardCounts,
    recent: Vec<Booking>,
}

#[derive(Template)]
#[template(path = "admin/dashboard/index.html")]
struct DashboardTemplate {
    chrome: AdminChrome,
    stats: String,
}

/// `GET /admin/dashboard`
#[instrument(skip(admin, state, session), fields(user_id = %admin.user_id))]
pub async fn index(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    session: Session,
) -> Result<Html<String>> {
    let actor = Actor::Authenticated(admin.identity());

    let stats = fragment(&state, &admin, DASHBOARD_PATH, async {
        let dashboard = DashboardRepository::new(state.pool());
        let bookings = BookingRepository::new(state.pool());
        let (counts, recent) = tokio::try_join!(
            dashboard.counts(&actor),
            bookings.list_recent(&actor, Some(RECENT_BOOKINGS)),
        )?;
        Ok(StatsFragment { counts, recent }.render()?)
    })
    .await?;

    page(&DashboardTemplate {
        chrome: AdminChrome::new(admin, DASHBOARD_PATH, &session).await,
        stats,
    })
}
