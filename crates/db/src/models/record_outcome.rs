//! Rows of the `import_record_outcomes` table.

use roster_core::import_job::{RecordOutcome, RecordStatus};
use roster_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// A row from the `import_record_outcomes` table.
#[derive(Debug, Clone, FromRow)]
pub struct RecordOutcomeRow {
    pub id: DbId,
    pub import_job_id: DbId,
    pub record_index: i32,
    pub status: String,
    pub team_member_id: Option<DbId>,
    pub error: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl RecordOutcomeRow {
    /// `None` if the stored status is not one this build understands.
    pub fn into_outcome(self) -> Option<RecordOutcome> {
        let status = RecordStatus::parse(&self.status)?;
        Some(RecordOutcome {
            record_index: usize::try_from(self.record_index).ok()?,
            status,
            roster_entry_id: self.team_member_id,
            error: self.error,
        })
    }
}
