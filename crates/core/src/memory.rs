//! In-memory [`WorkQueue`] and [`RosterStore`] adapters.
//!
//! Injected instances, never process globals. They follow the same contracts
//! as the Postgres adapters (leases, idempotency keys, unique emails) and can
//! simulate outages, latency and crashes mid-write for tests.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use crate::import_batch::ImportBatch;
use crate::import_job::{ImportJob, ImportJobStatus, JobId, JobListQuery, RecordOutcome};
use crate::ports::{
    BulkCreateError, BulkCreateReport, BulkItem, BulkItemResult, QueueError, RosterStore,
    StoreError, WorkQueue,
};
use crate::team_member::{RosterEntry, ValidatedRecord};
use crate::types::{DbId, Timestamp};

fn chrono_duration(d: Duration) -> chrono::Duration {
    chrono::Duration::from_std(d).unwrap_or(chrono::Duration::MAX)
}

// ---------------------------------------------------------------------------
// Work queue
// ---------------------------------------------------------------------------

#[derive(Default)]
struct QueueState {
    next_id: JobId,
    jobs: BTreeMap<JobId, ImportJob>,
    outcomes: HashMap<JobId, BTreeMap<usize, RecordOutcome>>,
}

impl QueueState {
    fn reclaim_expired(&mut self, topic: &str, now: Timestamp) {
        for job in self.jobs.values_mut() {
            let expired = job.topic == topic
                && job.status == ImportJobStatus::Processing
                && job.lease_expires_at.is_some_and(|t| t <= now);
            if !expired {
                continue;
            }
            job.worker_id = None;
            job.lease_expires_at = None;
            if job.attempts_exhausted() {
                job.status = ImportJobStatus::Failed;
                job.last_error = Some("Lease expired on the final attempt".to_string());
                job.completed_at = Some(now);
            } else {
                job.status = ImportJobStatus::Queued;
                job.last_error = Some("Lease expired; job redelivered".to_string());
            }
        }
    }

    /// The job if `worker_id` still holds its lease.
    fn held_by(&mut self, id: JobId, worker_id: &str) -> Option<&mut ImportJob> {
        self.jobs.get_mut(&id).filter(|job| {
            job.status == ImportJobStatus::Processing && job.worker_id.as_deref() == Some(worker_id)
        })
    }
}

/// Work queue backed by process memory.
pub struct InMemoryWorkQueue {
    state: Mutex<QueueState>,
    available: AtomicBool,
}

impl Default for InMemoryWorkQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryWorkQueue {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                next_id: 1,
                ..Default::default()
            }),
            available: AtomicBool::new(true),
        }
    }

    /// Simulate the queue going down (`false`) or coming back (`true`).
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub async fn job_count(&self) -> usize {
        self.state.lock().await.jobs.len()
    }

    fn ensure_available(&self) -> Result<(), QueueError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(QueueError::Unavailable("in-memory queue is offline".to_string()))
        }
    }
}

#[async_trait]
impl WorkQueue for InMemoryWorkQueue {
    async fn enqueue(
        &self,
        topic: &str,
        batch: &ImportBatch,
        max_attempts: i32,
    ) -> Result<JobId, QueueError> {
        self.ensure_available()?;
        let mut state = self.state.lock().await;
        let id = state.next_id;
        state.next_id += 1;
        let now = Utc::now();
        state.jobs.insert(
            id,
            ImportJob {
                id,
                topic: topic.to_string(),
                batch: batch.clone(),
                status: ImportJobStatus::Queued,
                attempt_count: 0,
                max_attempts,
                worker_id: None,
                last_error: None,
                enqueued_at: now,
                available_at: now,
                lease_expires_at: None,
                completed_at: None,
            },
        );
        Ok(id)
    }

    async fn claim_next(
        &self,
        topic: &str,
        worker_id: &str,
        lease: Duration,
    ) -> Result<Option<ImportJob>, QueueError> {
        self.ensure_available()?;
        let mut state = self.state.lock().await;
        let now = Utc::now();
        state.reclaim_expired(topic, now);

        let next = state
            .jobs
            .values()
            .filter(|j| {
                j.topic == topic && j.status == ImportJobStatus::Queued && j.available_at <= now
            })
            .min_by_key(|j| (j.available_at, j.id))
            .map(|j| j.id);

        let Some(id) = next else {
            return Ok(None);
        };
        let job = state
            .jobs
            .get_mut(&id)
            .ok_or_else(|| QueueError::Unavailable(format!("job {id} vanished")))?;
        job.status = ImportJobStatus::Processing;
        job.attempt_count += 1;
        job.worker_id = Some(worker_id.to_string());
        job.lease_expires_at = Some(now + chrono_duration(lease));
        Ok(Some(job.clone()))
    }

    async fn complete(&self, id: JobId, worker_id: &str) -> Result<bool, QueueError> {
        self.ensure_available()?;
        let mut state = self.state.lock().await;
        let Some(job) = state.held_by(id, worker_id) else {
            return Ok(false);
        };
        job.status = ImportJobStatus::Completed;
        job.worker_id = None;
        job.lease_expires_at = None;
        job.last_error = None;
        job.completed_at = Some(Utc::now());
        Ok(true)
    }

    async fn retry_later(
        &self,
        id: JobId,
        worker_id: &str,
        delay: Duration,
        error: &str,
    ) -> Result<bool, QueueError> {
        self.ensure_available()?;
        let mut state = self.state.lock().await;
        let Some(job) = state.held_by(id, worker_id) else {
            return Ok(false);
        };
        job.status = ImportJobStatus::Queued;
        job.worker_id = None;
        job.lease_expires_at = None;
        job.last_error = Some(error.to_string());
        job.available_at = Utc::now() + chrono_duration(delay);
        Ok(true)
    }

    async fn fail(&self, id: JobId, worker_id: &str, error: &str) -> Result<bool, QueueError> {
        self.ensure_available()?;
        let mut state = self.state.lock().await;
        let Some(job) = state.held_by(id, worker_id) else {
            return Ok(false);
        };
        job.status = ImportJobStatus::Failed;
        job.worker_id = None;
        job.lease_expires_at = None;
        job.last_error = Some(error.to_string());
        job.completed_at = Some(Utc::now());
        Ok(true)
    }

    async fn record_outcomes(
        &self,
        id: JobId,
        outcomes: &[RecordOutcome],
    ) -> Result<(), QueueError> {
        self.ensure_available()?;
        let mut state = self.state.lock().await;
        let recorded = state.outcomes.entry(id).or_default();
        for outcome in outcomes {
            recorded.insert(outcome.record_index, outcome.clone());
        }
        Ok(())
    }

    async fn outcomes(&self, id: JobId) -> Result<Vec<RecordOutcome>, QueueError> {
        self.ensure_available()?;
        let state = self.state.lock().await;
        Ok(state
            .outcomes
            .get(&id)
            .map(|m| m.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn find(&self, id: JobId) -> Result<Option<ImportJob>, QueueError> {
        self.ensure_available()?;
        Ok(self.state.lock().await.jobs.get(&id).cloned())
    }

    async fn list(&self, query: &JobListQuery) -> Result<Vec<ImportJob>, QueueError> {
        self.ensure_available()?;
        let state = self.state.lock().await;
        let offset = query.offset.unwrap_or(0).max(0) as usize;
        let limit = query.limit.unwrap_or(50).clamp(1, 100) as usize;
        Ok(state
            .jobs
            .values()
            .rev()
            .filter(|j| query.status.is_none_or(|s| j.status == s))
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Roster store
// ---------------------------------------------------------------------------

/// Fault to inject into the next `create_many` call.
#[derive(Debug, Clone)]
pub enum StoreFault {
    /// Fail the whole call without writing anything.
    Fail(StoreError),
    /// Commit the first `n` items, then fail as if the connection dropped.
    CommitThenFail(usize),
}

#[derive(Default)]
struct StoreState {
    next_id: DbId,
    entries: Vec<RosterEntry>,
    /// Lowercased email -> entry id.
    emails: HashMap<String, DbId>,
    /// Idempotency key -> entry id.
    import_keys: HashMap<(JobId, usize), DbId>,
    faults: VecDeque<StoreFault>,
    create_many_calls: usize,
}

impl StoreState {
    fn insert(&mut self, record: &ValidatedRecord) -> Result<RosterEntry, String> {
        let email_key = record.email.to_lowercase();
        if self.emails.contains_key(&email_key) {
            return Err(format!("duplicate email: {}", record.email));
        }
        let entry = RosterEntry {
            id: self.next_id,
            name: record.name.clone(),
            email: record.email.clone(),
            role: record.role.clone(),
            employment_type: record.employment_type,
            created_at: Utc::now(),
        };
        self.next_id += 1;
        self.emails.insert(email_key, entry.id);
        self.entries.push(entry.clone());
        Ok(entry)
    }

    fn insert_keyed(&mut self, job_id: JobId, item: &BulkItem<'_>) -> BulkItemResult {
        let key = (job_id, item.record_index);
        if let Some(existing) = self
            .import_keys
            .get(&key)
            .and_then(|id| self.entries.iter().find(|e| e.id == *id))
        {
            return BulkItemResult::Created(existing.clone());
        }
        match self.insert(item.record) {
            Ok(entry) => {
                self.import_keys.insert(key, entry.id);
                BulkItemResult::Created(entry)
            }
            Err(reason) => BulkItemResult::Rejected(reason),
        }
    }
}

/// Roster store backed by process memory, with a case-insensitive unique
/// email constraint.
pub struct InMemoryRosterStore {
    state: Mutex<StoreState>,
    latency: Mutex<Duration>,
}

impl Default for InMemoryRosterStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRosterStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(StoreState {
                next_id: 1,
                ..Default::default()
            }),
            latency: Mutex::new(Duration::ZERO),
        }
    }

    /// Queue a fault for an upcoming `create_many` call (FIFO).
    pub async fn inject(&self, fault: StoreFault) {
        self.state.lock().await.faults.push_back(fault);
    }

    /// Delay every `create_many` call by `latency`.
    pub async fn set_latency(&self, latency: Duration) {
        *self.latency.lock().await = latency;
    }

    pub async fn entry_count(&self) -> usize {
        self.state.lock().await.entries.len()
    }

    pub async fn create_many_calls(&self) -> usize {
        self.state.lock().await.create_many_calls
    }
}

#[async_trait]
impl RosterStore for InMemoryRosterStore {
    async fn create_one(&self, record: &ValidatedRecord) -> Result<RosterEntry, StoreError> {
        self.state
            .lock()
            .await
            .insert(record)
            .map_err(StoreError::Rejected)
    }

    async fn create_many(
        &self,
        job_id: JobId,
        items: &[BulkItem<'_>],
    ) -> Result<BulkCreateReport, BulkCreateError> {
        let latency = *self.latency.lock().await;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        let mut state = self.state.lock().await;
        state.create_many_calls += 1;

        let commit_limit = match state.faults.pop_front() {
            Some(StoreFault::Fail(err)) => return Err(err.into()),
            Some(StoreFault::CommitThenFail(n)) => Some(n),
            None => None,
        };

        let mut report = BulkCreateReport::default();
        for (i, item) in items.iter().enumerate() {
            if commit_limit.is_some_and(|n| i >= n) {
                return Err(BulkCreateError {
                    completed: report,
                    source: StoreError::Unavailable("connection lost mid-batch".to_string()),
                });
            }
            let result = state.insert_keyed(job_id, item);
            report.items.push((item.record_index, result));
        }
        Ok(report)
    }

    async fn find_all(&self) -> Result<Vec<RosterEntry>, StoreError> {
        Ok(self.state.lock().await.entries.clone())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
