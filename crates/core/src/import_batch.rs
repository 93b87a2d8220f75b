//! Fully validated batches awaiting submission.

use serde::Serialize;

use crate::csv_import::{validate_csv, ImportValidationError};
use crate::error::CoreError;
use crate::team_member::ValidatedRecord;
use crate::types::Timestamp;

/// An ordered, non-empty, fully validated collection of records.
///
/// There is no way to build a batch from a partially valid upload: a single
/// bad row fails [`ImportBatch::from_csv`] before any batch exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportBatch {
    records: Vec<ValidatedRecord>,
    submitted_at: Timestamp,
}

/// Why a batch could not be built from an upload.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BatchError {
    #[error(transparent)]
    Invalid(#[from] ImportValidationError),

    #[error("File contains no team member rows")]
    Empty,
}

impl From<BatchError> for CoreError {
    fn from(err: BatchError) -> Self {
        CoreError::Validation(err.to_string())
    }
}

impl ImportBatch {
    /// Validate an uploaded file and wrap the result, stamped with `now`.
    pub fn from_csv(input: &[u8], now: Timestamp) -> Result<Self, BatchError> {
        let records = validate_csv(input)?;
        Self::new(records, now)
    }

    /// Wrap records that already passed validation (e.g. when reloading a
    /// queued job). Rejects an empty list.
    pub fn new(records: Vec<ValidatedRecord>, submitted_at: Timestamp) -> Result<Self, BatchError> {
        if records.is_empty() {
            return Err(BatchError::Empty);
        }
        Ok(Self {
            records,
            submitted_at,
        })
    }

    pub fn records(&self) -> &[ValidatedRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Always `false`; present for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn submitted_at(&self) -> Timestamp {
        self.submitted_at
    }

    pub fn into_records(self) -> Vec<ValidatedRecord> {
        self.records
    }
}
