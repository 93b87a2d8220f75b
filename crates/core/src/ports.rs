//! Seams to the two external collaborators of the import pipeline: the
//! durable work queue and the roster store.
//!
//! Postgres adapters live in `roster-db`; in-memory adapters for tests live in
//! [`crate::memory`] behind the `test-support` feature.

use std::time::Duration;

use async_trait::async_trait;

use crate::import_batch::ImportBatch;
use crate::import_job::{ImportJob, JobId, JobListQuery, RecordOutcome};
use crate::team_member::{RosterEntry, ValidatedRecord};

// ---------------------------------------------------------------------------
// Work queue
// ---------------------------------------------------------------------------

/// Failure talking to the work queue.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    /// The queue could not be reached or did not acknowledge.
    #[error("Work queue unavailable: {0}")]
    Unavailable(String),

    /// A stored job could not be decoded.
    #[error("Corrupt job {id}: {reason}")]
    Corrupt { id: JobId, reason: String },
}

/// Durable, per-topic job queue with at-least-once delivery.
///
/// A claimed job is leased to one worker. If the lease expires before the
/// worker settles the job, the job becomes eligible for redelivery (or is
/// forced to `Failed` once its attempts are used up). Settlement calls return
/// `false` when the caller no longer holds the lease.
#[async_trait]
pub trait WorkQueue: Send + Sync {
    /// Persist a new job. Returns only after the write is durable.
    async fn enqueue(
        &self,
        topic: &str,
        batch: &ImportBatch,
        max_attempts: i32,
    ) -> Result<JobId, QueueError>;

    /// Lease the oldest due job on `topic` to `worker_id`, after first
    /// reclaiming expired leases.
    async fn claim_next(
        &self,
        topic: &str,
        worker_id: &str,
        lease: Duration,
    ) -> Result<Option<ImportJob>, QueueError>;

    /// Acknowledge successful processing.
    async fn complete(&self, id: JobId, worker_id: &str) -> Result<bool, QueueError>;

    /// Release the job back to `Queued`, claimable again after `delay`.
    async fn retry_later(
        &self,
        id: JobId,
        worker_id: &str,
        delay: Duration,
        error: &str,
    ) -> Result<bool, QueueError>;

    /// Mark the job terminally failed.
    async fn fail(&self, id: JobId, worker_id: &str, error: &str) -> Result<bool, QueueError>;

    /// Upsert per-record outcomes, keyed by record index.
    async fn record_outcomes(
        &self,
        id: JobId,
        outcomes: &[RecordOutcome],
    ) -> Result<(), QueueError>;

    /// Outcomes recorded so far, ordered by record index.
    async fn outcomes(&self, id: JobId) -> Result<Vec<RecordOutcome>, QueueError>;

    async fn find(&self, id: JobId) -> Result<Option<ImportJob>, QueueError>;

    /// Most recently enqueued first.
    async fn list(&self, query: &JobListQuery) -> Result<Vec<ImportJob>, QueueError>;
}

// ---------------------------------------------------------------------------
// Roster store
// ---------------------------------------------------------------------------

/// Failure of a whole roster store call.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    /// Store unreachable; worth retrying later.
    #[error("Roster store unavailable: {0}")]
    Unavailable(String),

    /// Store did not answer in time; worth retrying later.
    #[error("Roster store timed out after {0:?}")]
    Timeout(Duration),

    /// Store refused the input (constraint violation, malformed data).
    #[error("Roster store rejected the request: {0}")]
    Rejected(String),
}

impl StoreError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Timeout(_))
    }
}

/// One record of a bulk create, with its position in the batch.
///
/// `(job_id, record_index)` is the idempotency key: creating the same key
/// twice returns the entry created the first time.
#[derive(Debug, Clone, Copy)]
pub struct BulkItem<'a> {
    pub record_index: usize,
    pub record: &'a ValidatedRecord,
}

/// Per-record result of a non-atomic bulk create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BulkItemResult {
    Created(RosterEntry),
    Rejected(String),
}

/// Report of a bulk create, one entry per input item, in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkCreateReport {
    pub items: Vec<(usize, BulkItemResult)>,
}

impl BulkCreateReport {
    pub fn created_count(&self) -> usize {
        self.items
            .iter()
            .filter(|(_, r)| matches!(r, BulkItemResult::Created(_)))
            .count()
    }

    pub fn rejected_count(&self) -> usize {
        self.items.len() - self.created_count()
    }

    pub fn to_outcomes(&self) -> Vec<RecordOutcome> {
        self.items
            .iter()
            .map(|(index, result)| match result {
                BulkItemResult::Created(entry) => RecordOutcome::created(*index, entry.id),
                BulkItemResult::Rejected(reason) => RecordOutcome::rejected(*index, reason.clone()),
            })
            .collect()
    }
}

/// A bulk create that stopped early.
///
/// `completed` lists the items that were settled (created or rejected)
/// before `source` interrupted the call; those writes are durable.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{source}")]
pub struct BulkCreateError {
    pub completed: BulkCreateReport,
    pub source: StoreError,
}

impl From<StoreError> for BulkCreateError {
    fn from(source: StoreError) -> Self {
        Self {
            completed: BulkCreateReport::default(),
            source,
        }
    }
}

/// Persistence collaborator holding committed roster entries.
#[async_trait]
pub trait RosterStore: Send + Sync {
    async fn create_one(&self, record: &ValidatedRecord) -> Result<RosterEntry, StoreError>;

    /// Create many records. Not atomic: each item succeeds or is rejected on
    /// its own, and the report says which. A call that stops early still
    /// reports the items it settled before the error.
    async fn create_many(
        &self,
        job_id: JobId,
        items: &[BulkItem<'_>],
    ) -> Result<BulkCreateReport, BulkCreateError>;

    async fn find_all(&self) -> Result<Vec<RosterEntry>, StoreError>;

    /// Cheap reachability check.
    async fn ping(&self) -> Result<(), StoreError>;
}
