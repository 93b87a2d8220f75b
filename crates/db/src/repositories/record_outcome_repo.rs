//! Repository for the `import_record_outcomes` table.

use roster_core::import_job::RecordOutcome;
use roster_core::types::DbId;
use sqlx::PgPool;

use crate::models::record_outcome::RecordOutcomeRow;

/// Column list for `import_record_outcomes` queries.
const COLUMNS: &str = "\
    id, import_job_id, record_index, status, team_member_id, error, \
    created_at, updated_at";

pub struct RecordOutcomeRepo;

impl RecordOutcomeRepo {
    /// Upsert outcomes for a job in one transaction, keyed by record index.
    pub async fn upsert_many(
        pool: &PgPool,
        job_id: DbId,
        outcomes: &[RecordOutcome],
    ) -> Result<(), sqlx::Error> {
        let mut tx = pool.begin().await?;
        for outcome in outcomes {
            sqlx::query(
                "INSERT INTO import_record_outcomes \
                     (import_job_id, record_index, status, team_member_id, error) \
                 VALUES ($1, $2, $3, $4, $5) \
                 ON CONFLICT ON CONSTRAINT uq_import_record_outcomes_job_record \
                 DO UPDATE SET status = EXCLUDED.status, \
                               team_member_id = EXCLUDED.team_member_id, \
                               error = EXCLUDED.error",
            )
            .bind(job_id)
            .bind(outcome.record_index as i32)
            .bind(outcome.status.as_str())
            .bind(outcome.roster_entry_id)
            .bind(outcome.error.as_deref())
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await
    }

    /// All outcomes of a job, ordered by record index.
    pub async fn list_for_job(
        pool: &PgPool,
        job_id: DbId,
    ) -> Result<Vec<RecordOutcomeRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM import_record_outcomes \
             WHERE import_job_id = $1 \
             ORDER BY record_index ASC"
        );
        sqlx::query_as::<_, RecordOutcomeRow>(&query)
            .bind(job_id)
            .fetch_all(pool)
            .await
    }
}
