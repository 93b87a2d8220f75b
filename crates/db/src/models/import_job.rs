//! Rows of the `import_jobs` table.

use roster_core::import_batch::ImportBatch;
use roster_core::import_job::{ImportJob, ImportJobStatus, StatusId};
use roster_core::ports::QueueError;
use roster_core::team_member::ValidatedRecord;
use roster_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// A row from the `import_jobs` table.
#[derive(Debug, Clone, FromRow)]
pub struct ImportJobRow {
    pub id: DbId,
    pub topic: String,
    pub status_id: StatusId,
    pub payload: serde_json::Value,
    pub record_count: i32,
    pub submitted_at: Timestamp,
    pub attempt_count: i32,
    pub max_attempts: i32,
    pub worker_id: Option<String>,
    pub last_error: Option<String>,
    pub available_at: Timestamp,
    pub lease_expires_at: Option<Timestamp>,
    pub claimed_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Insert DTO for a new queued job.
#[derive(Debug)]
pub struct NewImportJob<'a> {
    pub topic: &'a str,
    pub payload: serde_json::Value,
    pub record_count: i32,
    pub submitted_at: Timestamp,
    pub max_attempts: i32,
}

impl<'a> NewImportJob<'a> {
    pub fn from_batch(
        topic: &'a str,
        batch: &ImportBatch,
        max_attempts: i32,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            topic,
            payload: serde_json::to_value(batch.records())?,
            record_count: batch.len() as i32,
            submitted_at: batch.submitted_at(),
            max_attempts,
        })
    }
}

impl TryFrom<ImportJobRow> for ImportJob {
    type Error = QueueError;

    fn try_from(row: ImportJobRow) -> Result<Self, Self::Error> {
        let id = row.id;
        let corrupt = move |reason: String| QueueError::Corrupt { id, reason };

        let status = ImportJobStatus::from_id(row.status_id)
            .ok_or_else(|| corrupt(format!("unknown status_id {}", row.status_id)))?;

        let records: Vec<ValidatedRecord> = serde_json::from_value(row.payload)
            .map_err(|e| corrupt(format!("payload does not decode: {e}")))?;
        if records.iter().any(ValidatedRecord::has_empty_field) {
            return Err(corrupt("payload contains a record with an empty field".into()));
        }
        let batch = ImportBatch::new(records, row.submitted_at)
            .map_err(|e| corrupt(e.to_string()))?;

        Ok(ImportJob {
            id: row.id,
            topic: row.topic,
            batch,
            status,
            attempt_count: row.attempt_count,
            max_attempts: row.max_attempts,
            worker_id: row.worker_id,
            last_error: row.last_error,
            enqueued_at: row.created_at,
            available_at: row.available_at,
            lease_expires_at: row.lease_expires_at,
            completed_at: row.completed_at,
        })
    }
}
