//! Worker behaviour against the in-memory queue and store.

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use chrono::Utc;
use roster_core::import_batch::ImportBatch;
use roster_core::import_job::{ImportJobStatus, RecordStatus, BULK_TEAM_MEMBER_TOPIC};
use roster_core::memory::{InMemoryRosterStore, InMemoryWorkQueue, StoreFault};
use roster_core::ports::{StoreError, WorkQueue};
use roster_core::team_member::{EmploymentType, ValidatedRecord};
use roster_worker::{BulkImportWorker, JobDisposition, WorkerConfig, WorkerPool};
use tokio_util::sync::CancellationToken;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn test_config() -> WorkerConfig {
    WorkerConfig {
        concurrency: 2,
        poll_interval: Duration::from_millis(10),
        job_lease: Duration::from_secs(60),
        store_timeout: Duration::from_secs(5),
        max_attempts: 5,
        retry_base_delay: Duration::ZERO,
        retry_max_delay: Duration::ZERO,
        worker_id_prefix: "test-worker".into(),
    }
}

fn record(i: usize) -> ValidatedRecord {
    ValidatedRecord::new(
        &format!("Member {i}"),
        &format!("member{i}@example.com"),
        "Engineer",
        EmploymentType::FullTime,
    )
    .unwrap()
}

fn batch_of(records: Vec<ValidatedRecord>) -> ImportBatch {
    ImportBatch::new(records, Utc::now()).unwrap()
}

fn batch(n: usize) -> ImportBatch {
    batch_of((0..n).map(record).collect())
}

struct Harness {
    queue: Arc<InMemoryWorkQueue>,
    store: Arc<InMemoryRosterStore>,
}

impl Harness {
    fn new() -> Self {
        Self {
            queue: Arc::new(InMemoryWorkQueue::new()),
            store: Arc::new(InMemoryRosterStore::new()),
        }
    }

    fn worker(&self, id: &str, config: &WorkerConfig) -> BulkImportWorker {
        BulkImportWorker::new(id, self.queue.clone(), self.store.clone(), config)
    }

    async fn enqueue(&self, batch: &ImportBatch, max_attempts: i32) -> i64 {
        self.queue
            .enqueue(BULK_TEAM_MEMBER_TOPIC, batch, max_attempts)
            .await
            .unwrap()
    }

    async fn status(&self, id: i64) -> ImportJobStatus {
        self.queue.find(id).await.unwrap().unwrap().status
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn idle_worker_finds_nothing() {
    let h = Harness::new();
    let worker = h.worker("w1", &test_config());

    assert!(worker.process_next().await.unwrap().is_none());
}

#[tokio::test]
async fn completes_job_and_creates_every_record() {
    let h = Harness::new();
    let id = h.enqueue(&batch(3), 5).await;
    let worker = h.worker("w1", &test_config());

    let (job, disposition) = worker.process_next().await.unwrap().unwrap();

    assert_eq!(job.id, id);
    assert_eq!(disposition, JobDisposition::Completed { created: 3 });
    assert_eq!(h.status(id).await, ImportJobStatus::Completed);
    assert_eq!(h.store.entry_count().await, 3);

    let outcomes = h.queue.outcomes(id).await.unwrap();
    assert_eq!(outcomes.len(), 3);
    assert!(outcomes.iter().all(|o| o.status == RecordStatus::Created));
}

#[tokio::test]
async fn retryable_failure_requeues_then_completes() {
    let h = Harness::new();
    let id = h.enqueue(&batch(2), 5).await;
    h.store
        .inject(StoreFault::Fail(StoreError::Unavailable("db restarting".into())))
        .await;
    let worker = h.worker("w1", &test_config());

    let (_, first) = worker.process_next().await.unwrap().unwrap();
    assert_matches!(first, JobDisposition::Retrying { .. });

    let job = h.queue.find(id).await.unwrap().unwrap();
    assert_eq!(job.status, ImportJobStatus::Queued);
    assert_matches!(job.last_error.as_deref(), Some(e) if e.contains("db restarting"));

    let (job, second) = worker.process_next().await.unwrap().unwrap();
    assert_eq!(job.attempt_count, 2);
    assert_eq!(second, JobDisposition::Completed { created: 2 });
    assert_eq!(h.store.entry_count().await, 2);
}

#[tokio::test]
async fn exhausted_retries_fail_the_job() {
    let h = Harness::new();
    let id = h.enqueue(&batch(1), 2).await;
    for _ in 0..2 {
        h.store
            .inject(StoreFault::Fail(StoreError::Unavailable("down".into())))
            .await;
    }
    let worker = h.worker("w1", &test_config());

    let (_, first) = worker.process_next().await.unwrap().unwrap();
    assert_matches!(first, JobDisposition::Retrying { .. });

    let (_, second) = worker.process_next().await.unwrap().unwrap();
    assert_matches!(second, JobDisposition::Failed { reason } if reason.contains("Gave up after 2 attempts"));
    assert_eq!(h.status(id).await, ImportJobStatus::Failed);

    // Terminal: never delivered again.
    assert!(worker.process_next().await.unwrap().is_none());
    assert_eq!(h.store.create_many_calls().await, 2);
}

#[tokio::test]
async fn worker_attempt_cap_applies_even_if_job_allows_more() {
    let h = Harness::new();
    let id = h.enqueue(&batch(1), 10).await;
    h.store
        .inject(StoreFault::Fail(StoreError::Unavailable("down".into())))
        .await;
    let config = WorkerConfig {
        max_attempts: 1,
        ..test_config()
    };
    let worker = h.worker("w1", &config);

    let (_, disposition) = worker.process_next().await.unwrap().unwrap();

    assert_matches!(disposition, JobDisposition::Failed { .. });
    assert_eq!(h.status(id).await, ImportJobStatus::Failed);
}

#[tokio::test]
async fn rejected_record_fails_job_and_keeps_siblings() {
    let h = Harness::new();
    let duplicate = ValidatedRecord::new(
        "Someone Else",
        "MEMBER0@example.com",
        "Designer",
        EmploymentType::Intern,
    )
    .unwrap();
    let id = h
        .enqueue(&batch_of(vec![record(0), duplicate, record(2)]), 5)
        .await;
    let worker = h.worker("w1", &test_config());

    let (_, disposition) = worker.process_next().await.unwrap().unwrap();

    assert_matches!(
        disposition,
        JobDisposition::Failed { reason } if reason == "1 of 3 records were rejected"
    );
    assert_eq!(h.status(id).await, ImportJobStatus::Failed);
    assert_eq!(h.store.entry_count().await, 2);

    let outcomes = h.queue.outcomes(id).await.unwrap();
    let statuses: Vec<_> = outcomes.iter().map(|o| o.status).collect();
    assert_eq!(
        statuses,
        vec![RecordStatus::Created, RecordStatus::Rejected, RecordStatus::Created]
    );
    assert!(outcomes[1].error.as_deref().unwrap().contains("duplicate email"));
}

#[tokio::test]
async fn terminal_store_error_fails_without_retry() {
    let h = Harness::new();
    let id = h.enqueue(&batch(1), 5).await;
    h.store
        .inject(StoreFault::Fail(StoreError::Rejected("schema mismatch".into())))
        .await;
    let worker = h.worker("w1", &test_config());

    let (_, disposition) = worker.process_next().await.unwrap().unwrap();

    assert_matches!(disposition, JobDisposition::Failed { .. });
    assert_eq!(h.status(id).await, ImportJobStatus::Failed);
}

#[tokio::test]
async fn crash_mid_batch_is_redelivered_without_duplicates() {
    let h = Harness::new();
    let id = h.enqueue(&batch(4), 5).await;
    // Two rows commit, then the connection drops.
    h.store.inject(StoreFault::CommitThenFail(2)).await;
    let worker = h.worker("w1", &test_config());

    let (_, first) = worker.process_next().await.unwrap().unwrap();
    assert_matches!(first, JobDisposition::Retrying { .. });
    assert_eq!(h.store.entry_count().await, 2);

    let (_, second) = worker.process_next().await.unwrap().unwrap();
    assert_eq!(second, JobDisposition::Completed { created: 4 });
    assert_eq!(h.store.entry_count().await, 4);
    assert_eq!(h.status(id).await, ImportJobStatus::Completed);
}

#[tokio::test]
async fn crash_mid_batch_on_last_attempt_keeps_committed_outcomes() {
    let h = Harness::new();
    let id = h.enqueue(&batch(4), 1).await;
    h.store.inject(StoreFault::CommitThenFail(2)).await;
    let worker = h.worker("w1", &test_config());

    let (_, disposition) = worker.process_next().await.unwrap().unwrap();

    assert_matches!(disposition, JobDisposition::Failed { reason } if reason.contains("Gave up after 1 attempts"));
    assert_eq!(h.status(id).await, ImportJobStatus::Failed);
    assert_eq!(h.store.entry_count().await, 2);

    let outcomes = h.queue.outcomes(id).await.unwrap();
    let indexes: Vec<usize> = outcomes.iter().map(|o| o.record_index).collect();
    assert_eq!(indexes, vec![0, 1]);
    assert!(outcomes.iter().all(|o| o.status == RecordStatus::Created));
}

#[tokio::test]
async fn redelivery_after_crash_only_sends_unsettled_records() {
    let h = Harness::new();
    let id = h.enqueue(&batch(4), 5).await;
    h.store.inject(StoreFault::CommitThenFail(3)).await;
    let worker = h.worker("w1", &test_config());

    let (_, first) = worker.process_next().await.unwrap().unwrap();
    assert_matches!(first, JobDisposition::Retrying { .. });
    assert_eq!(h.queue.outcomes(id).await.unwrap().len(), 3);

    let (_, second) = worker.process_next().await.unwrap().unwrap();
    assert_eq!(second, JobDisposition::Completed { created: 4 });
    assert_eq!(h.store.create_many_calls().await, 2);
    assert_eq!(h.queue.outcomes(id).await.unwrap().len(), 4);
    assert_eq!(h.store.entry_count().await, 4);
}

#[tokio::test]
async fn slow_store_times_out_and_is_retried() {
    let h = Harness::new();
    let id = h.enqueue(&batch(1), 5).await;
    h.store.set_latency(Duration::from_millis(300)).await;
    let config = WorkerConfig {
        store_timeout: Duration::from_millis(20),
        ..test_config()
    };
    let worker = h.worker("w1", &config);

    let (_, disposition) = worker.process_next().await.unwrap().unwrap();

    assert_matches!(disposition, JobDisposition::Retrying { reason, .. } if reason.contains("timed out"));
    assert_eq!(h.status(id).await, ImportJobStatus::Queued);
    assert_eq!(h.store.entry_count().await, 0);
}

#[tokio::test]
async fn stale_lease_is_redelivered_and_first_holder_loses_it() {
    let h = Harness::new();
    let id = h.enqueue(&batch(3), 5).await;
    h.store.set_latency(Duration::from_millis(100)).await;

    // The first worker's lease expires the moment it is granted.
    let stalled = Arc::new(h.worker(
        "stalled",
        &WorkerConfig {
            job_lease: Duration::ZERO,
            ..test_config()
        },
    ));
    let healthy = h.worker("healthy", &test_config());

    let first = tokio::spawn({
        let stalled = Arc::clone(&stalled);
        async move { stalled.process_next().await }
    });
    tokio::time::sleep(Duration::from_millis(20)).await;

    let (job, second) = healthy.process_next().await.unwrap().unwrap();
    let (_, first) = first.await.unwrap().unwrap().unwrap();

    assert_eq!(job.id, id);
    assert_eq!(job.attempt_count, 2);
    assert_eq!(first, JobDisposition::LeaseLost);
    assert_eq!(second, JobDisposition::Completed { created: 3 });
    assert_eq!(h.store.entry_count().await, 3);
    assert_eq!(h.status(id).await, ImportJobStatus::Completed);
}

#[tokio::test]
async fn pool_drains_queue_and_shuts_down() {
    let h = Harness::new();
    let mut ids = Vec::new();
    for n in 1..=3 {
        let records = (n * 10..n * 10 + n).map(record).collect();
        ids.push(h.enqueue(&batch_of(records), 5).await);
    }

    let pool = WorkerPool::spawn(
        &test_config(),
        h.queue.clone(),
        h.store.clone(),
        CancellationToken::new(),
    );
    assert_eq!(pool.len(), 2);

    for _ in 0..200 {
        let mut done = true;
        for id in &ids {
            done &= h.status(*id).await == ImportJobStatus::Completed;
        }
        if done {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    pool.shutdown(Duration::from_secs(1)).await;

    for id in ids {
        assert_eq!(h.status(id).await, ImportJobStatus::Completed);
    }
    assert_eq!(h.store.entry_count().await, 1 + 2 + 3);
}
