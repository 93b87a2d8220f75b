use axum::routing::get;
use axum::Router;

use crate::handlers::team_members;
use crate::state::AppState;

/// Routes mounted at `/team-members`.
///
/// ```text
/// GET    /    -> list_team_members
/// POST   /    -> create_team_member
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route(
        "/",
        get(team_members::list_team_members).post(team_members::create_team_member),
    )
}
