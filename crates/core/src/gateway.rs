//! Synchronous entry point that hands a confirmed batch to the work queue.

use std::sync::Arc;

use crate::import_batch::ImportBatch;
use crate::import_job::{JobId, BULK_TEAM_MEMBER_TOPIC, DEFAULT_MAX_ATTEMPTS};
use crate::ports::{QueueError, WorkQueue};

/// Accepts batches for processing.
///
/// `submit` returns as soon as the queue has durably acknowledged the job.
/// It never waits for a worker, so its latency does not depend on how long
/// the import itself takes. "Accepted" is not "persisted": roster reads made
/// right after a submit may not include the batch yet.
#[derive(Clone)]
pub struct SubmissionGateway {
    queue: Arc<dyn WorkQueue>,
    topic: String,
    max_attempts: i32,
}

impl SubmissionGateway {
    pub fn new(queue: Arc<dyn WorkQueue>) -> Self {
        Self {
            queue,
            topic: BULK_TEAM_MEMBER_TOPIC.to_string(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: i32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Enqueue exactly one job wrapping `batch`.
    pub async fn submit(&self, batch: &ImportBatch) -> Result<JobId, QueueError> {
        let job_id = self
            .queue
            .enqueue(&self.topic, batch, self.max_attempts)
            .await?;

        tracing::info!(
            job_id,
            topic = %self.topic,
            records = batch.len(),
            "Import batch accepted for processing",
        );

        Ok(job_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    use crate::import_job::ImportJobStatus;
    use crate::memory::InMemoryWorkQueue;
    use crate::team_member::{EmploymentType, ValidatedRecord};

    fn batch() -> ImportBatch {
        let record = ValidatedRecord::new("Jane", "jane@x.com", "Eng", EmploymentType::FullTime)
            .unwrap();
        ImportBatch::new(vec![record], Utc::now()).unwrap()
    }

    #[tokio::test]
    async fn submit_enqueues_one_queued_job() {
        let queue = Arc::new(InMemoryWorkQueue::new());
        let gateway = SubmissionGateway::new(queue.clone()).with_max_attempts(3);

        let id = gateway.submit(&batch()).await.unwrap();
        let job = queue.find(id).await.unwrap().unwrap();

        assert_eq!(job.status, ImportJobStatus::Queued);
        assert_eq!(job.topic, BULK_TEAM_MEMBER_TOPIC);
        assert_eq!(job.max_attempts, 3);
        assert_eq!(job.attempt_count, 0);
        assert_eq!(queue.job_count().await, 1);
    }

    #[tokio::test]
    async fn submit_surfaces_unavailable_queue() {
        let queue = Arc::new(InMemoryWorkQueue::new());
        queue.set_available(false);
        let gateway = SubmissionGateway::new(queue.clone());

        let result = gateway.submit(&batch()).await;
        assert!(matches!(result, Err(QueueError::Unavailable(_))));
        assert_eq!(queue.job_count().await, 0);
    }
}
