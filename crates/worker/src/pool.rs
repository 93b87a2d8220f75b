//! A fixed set of independent workers sharing one queue and one store.

use std::sync::Arc;
use std::time::Duration;

use roster_core::ports::{RosterStore, WorkQueue};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::WorkerConfig;
use crate::worker::BulkImportWorker;

pub struct WorkerPool {
    cancel: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn `config.concurrency` workers. They run until `cancel` fires.
    pub fn spawn(
        config: &WorkerConfig,
        queue: Arc<dyn WorkQueue>,
        store: Arc<dyn RosterStore>,
        cancel: CancellationToken,
    ) -> Self {
        let handles = (0..config.concurrency)
            .map(|i| {
                let worker = BulkImportWorker::new(
                    format!("{}-{i}", config.worker_id_prefix),
                    Arc::clone(&queue),
                    Arc::clone(&store),
                    config,
                );
                let cancel = cancel.clone();
                tokio::spawn(async move { worker.run(cancel).await })
            })
            .collect();

        tracing::info!(concurrency = config.concurrency, "Worker pool started");
        Self { cancel, handles }
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Cancel every worker and wait up to `grace` for in-flight deliveries.
    ///
    /// A worker still busy after `grace` is abandoned; its lease expires and
    /// the job is redelivered.
    pub async fn shutdown(self, grace: Duration) {
        self.cancel.cancel();
        for handle in self.handles {
            match tokio::time::timeout(grace, handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::error!(error = %e, "Worker task panicked"),
                Err(_) => tracing::warn!("Worker did not stop within the grace period"),
            }
        }
        tracing::info!("Worker pool stopped");
    }
}
