//! Import job lifecycle: statuses, allowed transitions, and per-record
//! outcome bookkeeping.
//!
//! ```text
//! Queued -> Processing -> Completed
//!                      -> Failed
//!                      -> Queued   (retry or lease expiry, bounded by max_attempts)
//! ```

use serde::{Deserialize, Serialize};

use crate::import_batch::ImportBatch;
use crate::types::{DbId, Timestamp};

/// Queue topic carrying bulk team member imports.
pub const BULK_TEAM_MEMBER_TOPIC: &str = "bulk-team-member";

/// Deliveries allowed per job before it is forced to `Failed`.
pub const DEFAULT_MAX_ATTEMPTS: i32 = 5;

/// Job identity, assigned once at enqueue time.
pub type JobId = DbId;

/// Status ID type matching the SMALLINT lookup table.
pub type StatusId = i16;

/// Import job status. Discriminants match the `import_job_statuses` seed rows.
#[repr(i16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportJobStatus {
    Queued = 1,
    Processing = 2,
    Completed = 3,
    Failed = 4,
}

impl ImportJobStatus {
    /// Return the database status ID.
    pub fn id(self) -> StatusId {
        self as StatusId
    }

    pub fn from_id(id: StatusId) -> Option<Self> {
        match id {
            1 => Some(Self::Queued),
            2 => Some(Self::Processing),
            3 => Some(Self::Completed),
            4 => Some(Self::Failed),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        [Self::Queued, Self::Processing, Self::Completed, Self::Failed]
            .into_iter()
            .find(|s| s.as_str() == name)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Whether the state machine allows moving from `self` to `next`.
    pub fn can_transition_to(&self, next: ImportJobStatus) -> bool {
        use ImportJobStatus::*;
        matches!(
            (self, next),
            (Queued, Processing)
                | (Processing, Completed)
                | (Processing, Failed)
                | (Processing, Queued)
        )
    }
}

impl std::fmt::Display for ImportJobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A unit of work tracked by the queue, wrapping one batch.
#[derive(Debug, Clone)]
pub struct ImportJob {
    pub id: JobId,
    pub topic: String,
    pub batch: ImportBatch,
    pub status: ImportJobStatus,
    pub attempt_count: i32,
    pub max_attempts: i32,
    /// Holder of the current delivery while `Processing`.
    pub worker_id: Option<String>,
    pub last_error: Option<String>,
    pub enqueued_at: Timestamp,
    /// Earliest time the job may be claimed (pushed forward by backoff).
    pub available_at: Timestamp,
    pub lease_expires_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
}

impl ImportJob {
    /// True once the current delivery is the last one allowed.
    pub fn attempts_exhausted(&self) -> bool {
        self.attempt_count >= self.max_attempts
    }

    pub fn summary(&self) -> ImportJobSummary {
        ImportJobSummary {
            id: self.id,
            topic: self.topic.clone(),
            status: self.status,
            attempt_count: self.attempt_count,
            max_attempts: self.max_attempts,
            record_count: self.batch.len(),
            last_error: self.last_error.clone(),
            enqueued_at: self.enqueued_at,
            completed_at: self.completed_at,
        }
    }
}

/// Job status as exposed to clients and operators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportJobSummary {
    pub id: JobId,
    pub topic: String,
    pub status: ImportJobStatus,
    pub attempt_count: i32,
    pub max_attempts: i32,
    pub record_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    pub enqueued_at: Timestamp,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<Timestamp>,
}

/// Result of persisting one record of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    Created,
    Rejected,
}

impl RecordStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Rejected => "rejected",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "created" => Some(Self::Created),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

/// Per-record bookkeeping kept across deliveries of the same job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordOutcome {
    /// Zero-based position of the record within the batch.
    pub record_index: usize,
    pub status: RecordStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roster_entry_id: Option<DbId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RecordOutcome {
    pub fn created(record_index: usize, roster_entry_id: DbId) -> Self {
        Self {
            record_index,
            status: RecordStatus::Created,
            roster_entry_id: Some(roster_entry_id),
            error: None,
        }
    }

    pub fn rejected(record_index: usize, error: impl Into<String>) -> Self {
        Self {
            record_index,
            status: RecordStatus::Rejected,
            roster_entry_id: None,
            error: Some(error.into()),
        }
    }
}

/// Filter for listing jobs.
#[derive(Debug, Clone, Default)]
pub struct JobListQuery {
    pub status: Option<ImportJobStatus>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}
