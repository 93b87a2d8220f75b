//! Per-session holder of the one pending (validated, unsubmitted) import.
//!
//! Lives in process memory only; a restart drops every pending preview.

use std::collections::HashMap;

use serde::Serialize;
use tokio::sync::RwLock;

use crate::import_batch::ImportBatch;
use crate::team_member::ValidatedRecord;
use crate::types::{SessionId, Timestamp};

/// Rows shown in a preview response.
pub const PREVIEW_SAMPLE_ROWS: usize = 10;

/// A validated batch waiting for the user to confirm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingImport {
    pub file_name: String,
    pub batch: ImportBatch,
    pub staged_at: Timestamp,
}

/// What the client sees before confirming.
#[derive(Debug, Clone, Serialize)]
pub struct PreviewSummary {
    pub file_name: String,
    pub total_rows: usize,
    /// First [`PREVIEW_SAMPLE_ROWS`] records.
    pub rows: Vec<ValidatedRecord>,
    /// Records beyond the sample.
    pub remaining_rows: usize,
    pub staged_at: Timestamp,
}

impl PendingImport {
    pub fn summary(&self) -> PreviewSummary {
        let total = self.batch.len();
        let rows: Vec<_> = self
            .batch
            .records()
            .iter()
            .take(PREVIEW_SAMPLE_ROWS)
            .cloned()
            .collect();
        PreviewSummary {
            file_name: self.file_name.clone(),
            total_rows: total,
            remaining_rows: total - rows.len(),
            rows,
            staged_at: self.staged_at,
        }
    }
}

/// Zero or one pending import per session.
///
/// Thread-safe via interior `RwLock`; wrap in `Arc` to share.
#[derive(Default)]
pub struct PreviewCache {
    pending: RwLock<HashMap<SessionId, PendingImport>>,
}

impl PreviewCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage `pending` for `session`, replacing any earlier preview wholesale.
    /// Returns `true` if a previous preview was replaced.
    pub async fn stage(&self, session: SessionId, pending: PendingImport) -> bool {
        self.pending.write().await.insert(session, pending).is_some()
    }

    pub async fn get(&self, session: SessionId) -> Option<PendingImport> {
        self.pending.read().await.get(&session).cloned()
    }

    /// Drop the session's preview. Returns `true` if there was one.
    pub async fn clear(&self, session: SessionId) -> bool {
        self.pending.write().await.remove(&session).is_some()
    }

    /// Drop the session's preview only if it is still the one that was
    /// submitted, so a file staged concurrently is not lost.
    pub async fn clear_if_staged_at(&self, session: SessionId, staged_at: Timestamp) -> bool {
        let mut pending = self.pending.write().await;
        match pending.get(&session) {
            Some(p) if p.staged_at == staged_at => pending.remove(&session).is_some(),
            _ => false,
        }
    }

    /// Drop previews staged before `cutoff`. Returns how many were dropped.
    pub async fn evict_staged_before(&self, cutoff: Timestamp) -> usize {
        let mut pending = self.pending.write().await;
        let before = pending.len();
        pending.retain(|_, p| p.staged_at >= cutoff);
        before - pending.len()
    }

    pub async fn len(&self) -> usize {
        self.pending.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.pending.read().await.is_empty()
    }
}
