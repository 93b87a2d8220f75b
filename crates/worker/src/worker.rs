//! The bulk import worker.
//!
//! One delivery of one job:
//!
//! 1. claim the next job on the topic (leased for `lease`);
//! 2. skip records whose outcome an earlier delivery already recorded;
//! 3. bulk-create the rest under `store_timeout`;
//! 4. record the per-record outcomes;
//! 5. settle: complete, fail, or hand back to the queue with backoff.
//!
//! Every record is keyed by `(job_id, record_index)` in the store, so a
//! redelivery after a crash between steps 3 and 4 cannot duplicate entries.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use roster_core::import_job::{ImportJob, RecordStatus, BULK_TEAM_MEMBER_TOPIC};
use roster_core::ports::{
    BulkCreateError, BulkCreateReport, BulkItem, QueueError, RosterStore, StoreError, WorkQueue,
};
use roster_core::retry::RetryPolicy;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::config::WorkerConfig;

/// How a delivery ended.
#[derive(Debug, Clone, PartialEq)]
pub enum JobDisposition {
    /// Every record is in the roster.
    Completed { created: usize },
    /// Terminal. Created siblings of rejected records stay created.
    Failed { reason: String },
    /// Handed back to the queue; claimable again after `delay`.
    Retrying { delay: Duration, reason: String },
    /// The lease expired before settlement; another delivery owns the job.
    LeaseLost,
}

pub struct BulkImportWorker {
    queue: Arc<dyn WorkQueue>,
    store: Arc<dyn RosterStore>,
    worker_id: String,
    topic: String,
    policy: RetryPolicy,
    lease: Duration,
    store_timeout: Duration,
    poll_interval: Duration,
}

impl BulkImportWorker {
    pub fn new(
        worker_id: impl Into<String>,
        queue: Arc<dyn WorkQueue>,
        store: Arc<dyn RosterStore>,
        config: &WorkerConfig,
    ) -> Self {
        Self {
            queue,
            store,
            worker_id: worker_id.into(),
            topic: BULK_TEAM_MEMBER_TOPIC.to_string(),
            policy: config.retry_policy(),
            lease: config.job_lease,
            store_timeout: config.store_timeout,
            poll_interval: config.poll_interval,
        }
    }

    pub fn worker_id(&self) -> &str {
        &self.worker_id
    }

    /// Claim and process at most one job. `Ok(None)` when nothing is due.
    pub async fn process_next(&self) -> Result<Option<(ImportJob, JobDisposition)>, QueueError> {
        let Some(job) = self
            .queue
            .claim_next(&self.topic, &self.worker_id, self.lease)
            .await?
        else {
            return Ok(None);
        };

        let span = tracing::info_span!(
            "import_job",
            job_id = job.id,
            worker_id = %self.worker_id,
            attempt = job.attempt_count,
        );
        let disposition = self.process(&job).instrument(span).await?;
        Ok(Some((job, disposition)))
    }

    async fn process(&self, job: &ImportJob) -> Result<JobDisposition, QueueError> {
        let total = job.batch.len();
        tracing::info!(records = total, "Processing import job");

        let previous = self.queue.outcomes(job.id).await?;
        let done: HashSet<usize> = previous.iter().map(|o| o.record_index).collect();
        let previously_rejected = previous
            .iter()
            .filter(|o| o.status == RecordStatus::Rejected)
            .count();

        let pending: Vec<BulkItem<'_>> = job
            .batch
            .records()
            .iter()
            .enumerate()
            .filter(|(index, _)| !done.contains(index))
            .map(|(record_index, record)| BulkItem {
                record_index,
                record,
            })
            .collect();

        if !done.is_empty() {
            tracing::info!(
                already_done = done.len(),
                pending = pending.len(),
                "Resuming partially processed job",
            );
        }

        let result = if pending.is_empty() {
            Ok(BulkCreateReport::default())
        } else {
            self.create_with_timeout(job, &pending).await
        };

        match result {
            Ok(report) => {
                self.queue.record_outcomes(job.id, &report.to_outcomes()).await?;
                let rejected = previously_rejected + report.rejected_count();
                if rejected == 0 {
                    self.complete(job, total).await
                } else {
                    let reason = format!("{rejected} of {total} records were rejected");
                    self.fail(job, reason).await
                }
            }
            Err(BulkCreateError { completed, source }) => {
                if !completed.items.is_empty() {
                    tracing::info!(
                        settled = completed.items.len(),
                        "Recording outcomes of interrupted bulk create",
                    );
                    self.queue
                        .record_outcomes(job.id, &completed.to_outcomes())
                        .await?;
                }
                if source.is_retryable() {
                    self.retry_or_fail(job, source).await
                } else {
                    self.fail(job, source.to_string()).await
                }
            }
        }
    }

    async fn create_with_timeout(
        &self,
        job: &ImportJob,
        items: &[BulkItem<'_>],
    ) -> Result<BulkCreateReport, BulkCreateError> {
        match tokio::time::timeout(self.store_timeout, self.store.create_many(job.id, items)).await
        {
            Ok(result) => result,
            Err(_) => Err(StoreError::Timeout(self.store_timeout).into()),
        }
    }

    async fn complete(&self, job: &ImportJob, created: usize) -> Result<JobDisposition, QueueError> {
        if !self.queue.complete(job.id, &self.worker_id).await? {
            return Ok(self.lease_lost());
        }
        tracing::info!(created, "Import job completed");
        Ok(JobDisposition::Completed { created })
    }

    async fn fail(&self, job: &ImportJob, reason: String) -> Result<JobDisposition, QueueError> {
        if !self.queue.fail(job.id, &self.worker_id, &reason).await? {
            return Ok(self.lease_lost());
        }
        tracing::warn!(reason = %reason, "Import job failed");
        Ok(JobDisposition::Failed { reason })
    }

    async fn retry_or_fail(
        &self,
        job: &ImportJob,
        err: StoreError,
    ) -> Result<JobDisposition, QueueError> {
        let attempt = job.attempt_count;
        if job.attempts_exhausted() || !self.policy.should_retry(attempt) {
            return self
                .fail(job, format!("Gave up after {attempt} attempts: {err}"))
                .await;
        }

        let delay = self.policy.next_delay(attempt);
        let reason = err.to_string();
        if !self
            .queue
            .retry_later(job.id, &self.worker_id, delay, &reason)
            .await?
        {
            return Ok(self.lease_lost());
        }
        tracing::warn!(
            error = %reason,
            delay_ms = delay.as_millis() as u64,
            "Roster store unavailable; import job requeued",
        );
        Ok(JobDisposition::Retrying { delay, reason })
    }

    fn lease_lost(&self) -> JobDisposition {
        tracing::warn!("Lease lost before settlement; leaving job to its new holder");
        JobDisposition::LeaseLost
    }

    /// Poll and process jobs until `cancel` is triggered.
    ///
    /// Each tick drains every due job before waiting again.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!(
            worker_id = %self.worker_id,
            topic = %self.topic,
            poll_interval_ms = self.poll_interval.as_millis() as u64,
            "Import worker started",
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!(worker_id = %self.worker_id, "Import worker shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    while !cancel.is_cancelled() {
                        match self.process_next().await {
                            Ok(Some(_)) => continue,
                            Ok(None) => break,
                            Err(e) => {
                                tracing::error!(
                                    worker_id = %self.worker_id,
                                    error = %e,
                                    "Import cycle failed",
                                );
                                break;
                            }
                        }
                    }
                }
            }
        }
    }
}
