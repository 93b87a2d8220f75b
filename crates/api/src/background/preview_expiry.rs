//! Periodic eviction of abandoned import previews.
//!
//! A preview nobody confirms or cancels would otherwise hold its batch in
//! memory until the process exits.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use roster_core::preview::PreviewCache;
use tokio_util::sync::CancellationToken;

/// How often the sweep runs, at most.
const MAX_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Run the eviction loop until `cancel` is triggered.
///
/// Previews staged more than `ttl` ago are dropped.
pub async fn run(previews: Arc<PreviewCache>, ttl: Duration, cancel: CancellationToken) {
    let sweep = ttl.min(MAX_SWEEP_INTERVAL).max(Duration::from_secs(1));
    let ttl_chrono = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX);

    tracing::info!(
        ttl_secs = ttl.as_secs(),
        interval_secs = sweep.as_secs(),
        "Preview expiry job started"
    );

    let mut interval = tokio::time::interval(sweep);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Preview expiry job stopping");
                break;
            }
            _ = interval.tick() => {
                let Some(cutoff) = Utc::now().checked_sub_signed(ttl_chrono) else {
                    continue;
                };
                let evicted = previews.evict_staged_before(cutoff).await;
                if evicted > 0 {
                    tracing::info!(evicted, "Preview expiry: dropped stale previews");
                } else {
                    tracing::debug!("Preview expiry: nothing to drop");
                }
            }
        }
    }
}
