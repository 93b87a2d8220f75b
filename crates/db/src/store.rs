//! [`RosterStore`] backed by the `team_members` table.

use async_trait::async_trait;
use roster_core::import_job::JobId;
use roster_core::ports::{
    BulkCreateError, BulkCreateReport, BulkItem, BulkItemResult, RosterStore, StoreError,
};
use roster_core::team_member::{RosterEntry, ValidatedRecord};
use sqlx::PgPool;

use crate::models::team_member::TeamMemberRow;
use crate::repositories::TeamMemberRepo;

/// Unique index on `lower(email)`.
const EMAIL_CONSTRAINT: &str = "uq_team_members_email";

/// Sort a failed insert into "this record is bad" (`Ok(reason)`) or "the
/// store is in trouble" (`Err`).
///
/// Integrity violations (SQLSTATE class 23) and data exceptions (class 22)
/// are the record's fault. Everything else, pool timeouts and I/O errors
/// included, is treated as the store being unavailable.
fn classify_insert_error(err: sqlx::Error, record: &ValidatedRecord) -> Result<String, StoreError> {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.constraint() == Some(EMAIL_CONSTRAINT) {
            return Ok(format!("Email already exists: {}", record.email));
        }
        let class: Option<String> = db_err.code().map(|c| c.chars().take(2).collect());
        if matches!(class.as_deref(), Some("22" | "23")) {
            return Ok(db_err.message().to_string());
        }
    }
    Err(StoreError::Unavailable(err.to_string()))
}

fn to_entry(row: TeamMemberRow) -> Result<RosterEntry, StoreError> {
    let id = row.id;
    row.into_entry().ok_or_else(|| {
        StoreError::Rejected(format!("team member {id} has an unknown employment type"))
    })
}

#[derive(Clone)]
pub struct PgRosterStore {
    pool: PgPool,
}

impl PgRosterStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RosterStore for PgRosterStore {
    async fn create_one(&self, record: &ValidatedRecord) -> Result<RosterEntry, StoreError> {
        match TeamMemberRepo::create(&self.pool, record).await {
            Ok(row) => to_entry(row),
            Err(err) => Err(StoreError::Rejected(classify_insert_error(err, record)?)),
        }
    }

    async fn create_many(
        &self,
        job_id: JobId,
        items: &[BulkItem<'_>],
    ) -> Result<BulkCreateReport, BulkCreateError> {
        let mut report = BulkCreateReport::default();
        for item in items {
            let result =
                TeamMemberRepo::create_for_import(&self.pool, job_id, item.record_index as i32, item.record)
                    .await;
            let outcome = match result {
                Ok(row) => to_entry(row).map(BulkItemResult::Created),
                Err(err) => classify_insert_error(err, item.record).map(BulkItemResult::Rejected),
            };
            match outcome {
                Ok(outcome) => report.items.push((item.record_index, outcome)),
                // Earlier rows are committed; hand them back with the error.
                Err(source) => {
                    return Err(BulkCreateError {
                        completed: report,
                        source,
                    })
                }
            }
        }
        Ok(report)
    }

    async fn find_all(&self) -> Result<Vec<RosterEntry>, StoreError> {
        let rows = TeamMemberRepo::list(&self.pool)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        rows.into_iter().map(to_entry).collect()
    }

    async fn ping(&self) -> Result<(), StoreError> {
        crate::health_check(&self.pool)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))
    }
}
