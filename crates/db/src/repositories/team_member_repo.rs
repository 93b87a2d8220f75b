//! Repository for the `team_members` table.

use roster_core::team_member::ValidatedRecord;
use roster_core::types::DbId;
use sqlx::PgPool;

use crate::models::team_member::TeamMemberRow;

/// Column list for `team_members` queries.
const COLUMNS: &str = "\
    id, name, email, role, employment_type, import_job_id, import_row_index, \
    created_at, updated_at";

pub struct TeamMemberRepo;

impl TeamMemberRepo {
    /// Insert a single member outside any import.
    pub async fn create(pool: &PgPool, record: &ValidatedRecord) -> Result<TeamMemberRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO team_members (name, email, role, employment_type) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, TeamMemberRow>(&query)
            .bind(&record.name)
            .bind(&record.email)
            .bind(&record.role)
            .bind(record.employment_type.as_str())
            .fetch_one(pool)
            .await
    }

    /// Insert a member on behalf of an import, keyed by `(job_id, row_index)`.
    ///
    /// If the key was already written by an earlier delivery, the existing
    /// row is returned unchanged.
    pub async fn create_for_import(
        pool: &PgPool,
        job_id: DbId,
        row_index: i32,
        record: &ValidatedRecord,
    ) -> Result<TeamMemberRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO team_members \
                 (name, email, role, employment_type, import_job_id, import_row_index) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             ON CONFLICT ON CONSTRAINT uq_team_members_import_key \
             DO UPDATE SET import_row_index = team_members.import_row_index \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, TeamMemberRow>(&query)
            .bind(&record.name)
            .bind(&record.email)
            .bind(&record.role)
            .bind(record.employment_type.as_str())
            .bind(job_id)
            .bind(row_index)
            .fetch_one(pool)
            .await
    }

    /// All members in insertion order.
    pub async fn list(pool: &PgPool) -> Result<Vec<TeamMemberRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM team_members ORDER BY id ASC");
        sqlx::query_as::<_, TeamMemberRow>(&query)
            .fetch_all(pool)
            .await
    }

    pub async fn count_for_job(pool: &PgPool, job_id: DbId) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM team_members WHERE import_job_id = $1")
            .bind(job_id)
            .fetch_one(pool)
            .await
    }
}
