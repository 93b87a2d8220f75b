pub mod health;
pub mod imports;
pub mod team_members;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /imports/preview                  upload (POST), show (GET), cancel (DELETE)
/// /imports/confirm                  submit staged batch (POST)
/// /imports/jobs                     list jobs (GET)
/// /imports/jobs/{id}                job status (GET)
/// /imports/jobs/{id}/records        per-record outcomes (GET)
///
/// /team-members                     list, create (GET, POST)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/imports", imports::router())
        .nest("/team-members", team_members::router())
}
