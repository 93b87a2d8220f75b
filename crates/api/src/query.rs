//! Shared query parameter types for API handlers.

use serde::Deserialize;

/// Query parameters for `GET /imports/jobs` (`?status=&limit=&offset=`).
///
/// `status` is a job status name (`queued`, `processing`, `completed`,
/// `failed`). Limits are clamped by the queue.
#[derive(Debug, Default, Deserialize)]
pub struct JobListParams {
    pub status: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}
