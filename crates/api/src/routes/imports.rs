//! Route definitions for the `/imports` resource.
//!
//! Preview and confirm require the `x-session-id` header.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::imports;
use crate::state::AppState;

/// Routes mounted at `/imports`.
///
/// ```text
/// POST   /preview             -> upload_preview
/// GET    /preview             -> get_preview
/// DELETE /preview             -> cancel_preview
/// POST   /confirm             -> confirm_import
/// GET    /jobs                -> list_jobs
/// GET    /jobs/{id}           -> get_job
/// GET    /jobs/{id}/records   -> list_job_records
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/preview",
            post(imports::upload_preview)
                .get(imports::get_preview)
                .delete(imports::cancel_preview),
        )
        .route("/confirm", post(imports::confirm_import))
        .route("/jobs", get(imports::list_jobs))
        .route("/jobs/{id}", get(imports::get_job))
        .route("/jobs/{id}/records", get(imports::list_job_records))
}
