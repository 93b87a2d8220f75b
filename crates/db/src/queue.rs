//! [`WorkQueue`] backed by the `import_jobs` table.

use std::time::Duration;

use async_trait::async_trait;
use roster_core::import_batch::ImportBatch;
use roster_core::import_job::{ImportJob, JobId, JobListQuery, RecordOutcome};
use roster_core::ports::{QueueError, WorkQueue};
use sqlx::PgPool;

use crate::models::import_job::NewImportJob;
use crate::repositories::{ImportJobRepo, RecordOutcomeRepo};

fn unavailable(err: sqlx::Error) -> QueueError {
    QueueError::Unavailable(err.to_string())
}

#[derive(Clone)]
pub struct PgWorkQueue {
    pool: PgPool,
}

impl PgWorkQueue {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WorkQueue for PgWorkQueue {
    async fn enqueue(
        &self,
        topic: &str,
        batch: &ImportBatch,
        max_attempts: i32,
    ) -> Result<JobId, QueueError> {
        let input = NewImportJob::from_batch(topic, batch, max_attempts)
            .map_err(|e| QueueError::Unavailable(format!("batch does not serialize: {e}")))?;
        ImportJobRepo::insert(&self.pool, &input)
            .await
            .map_err(unavailable)
    }

    async fn claim_next(
        &self,
        topic: &str,
        worker_id: &str,
        lease: Duration,
    ) -> Result<Option<ImportJob>, QueueError> {
        let mut tx = self.pool.begin().await.map_err(unavailable)?;

        let reclaimed = ImportJobRepo::reclaim_expired(&mut *tx, topic)
            .await
            .map_err(unavailable)?;
        if reclaimed > 0 {
            tracing::warn!(topic, reclaimed, "Released expired job leases");
        }

        let row = ImportJobRepo::claim_next(&mut *tx, topic, worker_id, lease)
            .await
            .map_err(unavailable)?;
        tx.commit().await.map_err(unavailable)?;

        let Some(row) = row else {
            return Ok(None);
        };
        let id = row.id;
        match ImportJob::try_from(row) {
            Ok(job) => Ok(Some(job)),
            Err(err) => {
                // An undecodable job would be redelivered forever.
                tracing::error!(job_id = id, error = %err, "Failing corrupt import job");
                ImportJobRepo::fail(&self.pool, id, worker_id, &err.to_string())
                    .await
                    .map_err(unavailable)?;
                Err(err)
            }
        }
    }

    async fn complete(&self, id: JobId, worker_id: &str) -> Result<bool, QueueError> {
        ImportJobRepo::complete(&self.pool, id, worker_id)
            .await
            .map_err(unavailable)
    }

    async fn retry_later(
        &self,
        id: JobId,
        worker_id: &str,
        delay: Duration,
        error: &str,
    ) -> Result<bool, QueueError> {
        ImportJobRepo::retry_later(&self.pool, id, worker_id, delay, error)
            .await
            .map_err(unavailable)
    }

    async fn fail(&self, id: JobId, worker_id: &str, error: &str) -> Result<bool, QueueError> {
        ImportJobRepo::fail(&self.pool, id, worker_id, error)
            .await
            .map_err(unavailable)
    }

    async fn record_outcomes(
        &self,
        id: JobId,
        outcomes: &[RecordOutcome],
    ) -> Result<(), QueueError> {
        RecordOutcomeRepo::upsert_many(&self.pool, id, outcomes)
            .await
            .map_err(unavailable)
    }

    async fn outcomes(&self, id: JobId) -> Result<Vec<RecordOutcome>, QueueError> {
        let rows = RecordOutcomeRepo::list_for_job(&self.pool, id)
            .await
            .map_err(unavailable)?;
        rows.into_iter()
            .map(|row| {
                let row_id = row.id;
                row.into_outcome().ok_or_else(|| QueueError::Corrupt {
                    id,
                    reason: format!("record outcome {row_id} has an unknown status"),
                })
            })
            .collect()
    }

    async fn find(&self, id: JobId) -> Result<Option<ImportJob>, QueueError> {
        ImportJobRepo::find_by_id(&self.pool, id)
            .await
            .map_err(unavailable)?
            .map(ImportJob::try_from)
            .transpose()
    }

    async fn list(&self, query: &JobListQuery) -> Result<Vec<ImportJob>, QueueError> {
        ImportJobRepo::list(&self.pool, query)
            .await
            .map_err(unavailable)?
            .into_iter()
            .map(ImportJob::try_from)
            .collect()
    }
}
