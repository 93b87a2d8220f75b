use std::sync::Arc;

use roster_core::gateway::SubmissionGateway;
use roster_core::ports::{RosterStore, WorkQueue};
use roster_core::preview::PreviewCache;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable: everything is behind `Arc` or already `Clone`.
#[derive(Clone)]
pub struct AppState {
    /// Durable queue of import jobs.
    pub queue: Arc<dyn WorkQueue>,
    /// Committed roster entries.
    pub store: Arc<dyn RosterStore>,
    /// Pending previews, one per session.
    pub previews: Arc<PreviewCache>,
    /// Hands confirmed batches to `queue`.
    pub gateway: SubmissionGateway,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(
        queue: Arc<dyn WorkQueue>,
        store: Arc<dyn RosterStore>,
        config: ServerConfig,
    ) -> Self {
        let gateway = SubmissionGateway::new(Arc::clone(&queue)).with_max_attempts(config.max_attempts);
        Self {
            queue,
            store,
            previews: Arc::new(PreviewCache::new()),
            gateway,
            config: Arc::new(config),
        }
    }
}
