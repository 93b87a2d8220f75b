//! Handlers for the `/imports` resource.
//!
//! The preview endpoints work on the caller's session only and never touch
//! the queue. `confirm` is the single point where a batch enters the queue.

use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use roster_core::error::CoreError;
use roster_core::import_batch::ImportBatch;
use roster_core::import_job::{ImportJob, ImportJobStatus, JobId, JobListQuery};
use roster_core::preview::PendingImport;
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::extract::Session;
use crate::query::JobListParams;
use crate::response::DataResponse;
use crate::state::AppState;

/// Multipart field holding the CSV file.
const FILE_FIELD: &str = "file";

/// Response body for an accepted import.
#[derive(Debug, Serialize)]
pub struct AcceptedImport {
    pub job_id: JobId,
    pub status: ImportJobStatus,
    pub record_count: usize,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn find_job(state: &AppState, job_id: JobId) -> AppResult<ImportJob> {
    state
        .queue
        .find(job_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Import job",
            id: job_id,
        }))
}

fn no_preview() -> AppError {
    AppError::NotFound("No import preview is staged for this session".into())
}

/// Pull the `file` part out of a multipart body.
async fn read_upload(multipart: &mut Multipart) -> AppResult<(String, Vec<u8>)> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let file_name = field.file_name().unwrap_or("upload.csv").to_string();
        let bytes = field.bytes().await?;
        return Ok((file_name, bytes.to_vec()));
    }
    Err(AppError::BadRequest(format!(
        "Multipart body has no '{FILE_FIELD}' field"
    )))
}

// ---------------------------------------------------------------------------
// Preview
// ---------------------------------------------------------------------------

/// POST /api/v1/imports/preview
///
/// Validate an uploaded CSV and stage it as the session's preview, replacing
/// any earlier one. Nothing is staged if validation fails.
pub async fn upload_preview(
    Session(session): Session,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<impl IntoResponse> {
    let (file_name, bytes) = read_upload(&mut multipart).await?;

    let now = Utc::now();
    let batch = ImportBatch::from_csv(&bytes, now).inspect_err(|e| {
        tracing::debug!(%session, file_name = %file_name, error = %e, "Rejected CSV upload");
    })?;

    let pending = PendingImport {
        file_name,
        batch,
        staged_at: now,
    };
    let summary = pending.summary();
    let replaced = state.previews.stage(session, pending).await;

    tracing::info!(
        %session,
        file_name = %summary.file_name,
        rows = summary.total_rows,
        replaced,
        "Import preview staged",
    );

    Ok(Json(DataResponse { data: summary }))
}

/// GET /api/v1/imports/preview
pub async fn get_preview(
    Session(session): Session,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let pending = state.previews.get(session).await.ok_or_else(no_preview)?;
    Ok(Json(DataResponse {
        data: pending.summary(),
    }))
}

/// DELETE /api/v1/imports/preview
///
/// Discard the staged preview. Local only: nothing was queued yet.
pub async fn cancel_preview(
    Session(session): Session,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    if !state.previews.clear(session).await {
        return Err(no_preview());
    }
    tracing::info!(%session, "Import preview cancelled");
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Confirm
// ---------------------------------------------------------------------------

/// POST /api/v1/imports/confirm
///
/// Submit the staged batch as one job. Returns 202 once the queue has
/// accepted it; the roster is updated later by a worker. If the queue is
/// unavailable the preview is kept so the caller can retry.
pub async fn confirm_import(
    Session(session): Session,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let pending = state.previews.get(session).await.ok_or_else(no_preview)?;

    let job_id = state.gateway.submit(&pending.batch).await.inspect_err(|e| {
        tracing::warn!(%session, error = %e, "Import submission failed; preview kept");
    })?;

    state
        .previews
        .clear_if_staged_at(session, pending.staged_at)
        .await;

    Ok((
        StatusCode::ACCEPTED,
        Json(DataResponse {
            data: AcceptedImport {
                job_id,
                status: ImportJobStatus::Queued,
                record_count: pending.batch.len(),
            },
        }),
    ))
}

// ---------------------------------------------------------------------------
// Jobs
// ---------------------------------------------------------------------------

/// GET /api/v1/imports/jobs
///
/// List import jobs, newest first. Supports `status`, `limit`, `offset`.
pub async fn list_jobs(
    State(state): State<AppState>,
    Query(params): Query<JobListParams>,
) -> AppResult<impl IntoResponse> {
    let status = params
        .status
        .as_deref()
        .map(|name| {
            ImportJobStatus::parse(name)
                .ok_or_else(|| AppError::BadRequest(format!("Unknown job status '{name}'")))
        })
        .transpose()?;

    let jobs = state
        .queue
        .list(&JobListQuery {
            status,
            limit: params.limit,
            offset: params.offset,
        })
        .await?;

    let data: Vec<_> = jobs.iter().map(ImportJob::summary).collect();
    Ok(Json(DataResponse { data }))
}

/// GET /api/v1/imports/jobs/{id}
pub async fn get_job(
    State(state): State<AppState>,
    Path(job_id): Path<JobId>,
) -> AppResult<impl IntoResponse> {
    let job = find_job(&state, job_id).await?;
    Ok(Json(DataResponse {
        data: job.summary(),
    }))
}

/// GET /api/v1/imports/jobs/{id}/records
///
/// Per-record outcomes recorded so far. Records not yet attempted are
/// absent.
pub async fn list_job_records(
    State(state): State<AppState>,
    Path(job_id): Path<JobId>,
) -> AppResult<impl IntoResponse> {
    find_job(&state, job_id).await?;
    let outcomes = state.queue.outcomes(job_id).await?;
    Ok(Json(DataResponse { data: outcomes }))
}
