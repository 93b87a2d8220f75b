//! Handlers for the `/team-members` resource.
//!
//! Reads go straight to the roster store. An import confirmed moments ago
//! may not be visible yet.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use roster_core::error::CoreError;
use roster_core::team_member::{EmploymentType, ValidatedRecord};
use serde::Deserialize;
use validator::Validate;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// DTO for `POST /api/v1/team-members`.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTeamMember {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 200))]
    pub role: String,
    pub employment_type: EmploymentType,
}

/// GET /api/v1/team-members
pub async fn list_team_members(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let entries = state.store.find_all().await?;
    Ok(Json(DataResponse { data: entries }))
}

/// POST /api/v1/team-members
///
/// Create one member synchronously. 409 if the email is taken.
pub async fn create_team_member(
    State(state): State<AppState>,
    Json(input): Json<CreateTeamMember>,
) -> AppResult<impl IntoResponse> {
    input
        .validate()
        .map_err(|e| CoreError::Validation(e.to_string()))?;
    let record = ValidatedRecord::new(
        &input.name,
        &input.email,
        &input.role,
        input.employment_type,
    )?;

    let entry = state.store.create_one(&record).await?;
    tracing::info!(team_member_id = entry.id, "Team member created");

    Ok((StatusCode::CREATED, Json(DataResponse { data: entry })))
}
