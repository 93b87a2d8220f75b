//! Repository for the `import_jobs` table.
//!
//! Status literals come from `ImportJobStatus` discriminants, never magic
//! numbers. Settlement methods only touch a row still leased to the caller.

use std::time::Duration;

use roster_core::import_job::{ImportJobStatus, JobListQuery};
use roster_core::types::DbId;
use sqlx::{PgConnection, PgPool};

use crate::models::import_job::{ImportJobRow, NewImportJob};

/// Column list for `import_jobs` queries.
const COLUMNS: &str = "\
    id, topic, status_id, payload, record_count, submitted_at, \
    attempt_count, max_attempts, worker_id, last_error, \
    available_at, lease_expires_at, claimed_at, completed_at, \
    created_at, updated_at";

/// Maximum page size for job listing.
const MAX_LIMIT: i64 = 100;

/// Default page size for job listing.
const DEFAULT_LIMIT: i64 = 50;

pub struct ImportJobRepo;

impl ImportJobRepo {
    /// Insert a new `queued` job, due immediately.
    pub async fn insert(pool: &PgPool, input: &NewImportJob<'_>) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar::<_, DbId>(
            "INSERT INTO import_jobs \
                 (topic, status_id, payload, record_count, submitted_at, max_attempts) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING id",
        )
        .bind(input.topic)
        .bind(ImportJobStatus::Queued.id())
        .bind(&input.payload)
        .bind(input.record_count)
        .bind(input.submitted_at)
        .bind(input.max_attempts)
        .fetch_one(pool)
        .await
    }

    /// Release every expired lease on `topic`.
    ///
    /// Jobs with deliveries left go back to `queued`; the rest are forced to
    /// `failed`. Returns the number of rows touched.
    pub async fn reclaim_expired(conn: &mut PgConnection, topic: &str) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE import_jobs SET \
                 status_id = CASE WHEN attempt_count < max_attempts THEN $2 ELSE $3 END, \
                 last_error = CASE WHEN attempt_count < max_attempts \
                     THEN 'Lease expired; job redelivered' \
                     ELSE 'Lease expired on the final attempt' END, \
                 completed_at = CASE WHEN attempt_count < max_attempts THEN NULL ELSE NOW() END, \
                 worker_id = NULL, \
                 lease_expires_at = NULL \
             WHERE topic = $1 AND status_id = $4 AND lease_expires_at <= NOW()",
        )
        .bind(topic)
        .bind(ImportJobStatus::Queued.id())
        .bind(ImportJobStatus::Failed.id())
        .bind(ImportJobStatus::Processing.id())
        .execute(&mut *conn)
        .await?;
        Ok(result.rows_affected())
    }

    /// Atomically lease the oldest due `queued` job on `topic`.
    ///
    /// Uses `SELECT FOR UPDATE SKIP LOCKED` so concurrent workers never
    /// claim the same row.
    pub async fn claim_next(
        conn: &mut PgConnection,
        topic: &str,
        worker_id: &str,
        lease: Duration,
    ) -> Result<Option<ImportJobRow>, sqlx::Error> {
        let query = format!(
            "UPDATE import_jobs \
             SET status_id = $3, worker_id = $4, attempt_count = attempt_count + 1, \
                 claimed_at = NOW(), \
                 lease_expires_at = NOW() + make_interval(secs => $5) \
             WHERE id = ( \
                 SELECT id FROM import_jobs \
                 WHERE topic = $1 AND status_id = $2 AND available_at <= NOW() \
                 ORDER BY available_at ASC, id ASC \
                 LIMIT 1 \
                 FOR UPDATE SKIP LOCKED \
             ) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ImportJobRow>(&query)
            .bind(topic)
            .bind(ImportJobStatus::Queued.id())
            .bind(ImportJobStatus::Processing.id())
            .bind(worker_id)
            .bind(lease.as_secs_f64())
            .fetch_optional(&mut *conn)
            .await
    }

    /// Mark a leased job `completed`. Returns `false` if the lease was lost.
    pub async fn complete(pool: &PgPool, id: DbId, worker_id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE import_jobs \
             SET status_id = $3, completed_at = NOW(), last_error = NULL, \
                 worker_id = NULL, lease_expires_at = NULL \
             WHERE id = $1 AND worker_id = $2 AND status_id = $4",
        )
        .bind(id)
        .bind(worker_id)
        .bind(ImportJobStatus::Completed.id())
        .bind(ImportJobStatus::Processing.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Put a leased job back to `queued`, claimable after `delay`.
    pub async fn retry_later(
        pool: &PgPool,
        id: DbId,
        worker_id: &str,
        delay: Duration,
        error: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE import_jobs \
             SET status_id = $3, last_error = $5, \
                 available_at = NOW() + make_interval(secs => $6), \
                 worker_id = NULL, lease_expires_at = NULL \
             WHERE id = $1 AND worker_id = $2 AND status_id = $4",
        )
        .bind(id)
        .bind(worker_id)
        .bind(ImportJobStatus::Queued.id())
        .bind(ImportJobStatus::Processing.id())
        .bind(error)
        .bind(delay.as_secs_f64())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Mark a leased job `failed` with an error message.
    pub async fn fail(
        pool: &PgPool,
        id: DbId,
        worker_id: &str,
        error: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE import_jobs \
             SET status_id = $3, last_error = $5, completed_at = NOW(), \
                 worker_id = NULL, lease_expires_at = NULL \
             WHERE id = $1 AND worker_id = $2 AND status_id = $4",
        )
        .bind(id)
        .bind(worker_id)
        .bind(ImportJobStatus::Failed.id())
        .bind(ImportJobStatus::Processing.id())
        .bind(error)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<ImportJobRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM import_jobs WHERE id = $1");
        sqlx::query_as::<_, ImportJobRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List jobs, newest first, with optional status filter and pagination.
    pub async fn list(pool: &PgPool, params: &JobListQuery) -> Result<Vec<ImportJobRow>, sqlx::Error> {
        let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
        let offset = params.offset.unwrap_or(0).max(0);

        // The status filter, when present, takes the first bind slot.
        let (where_clause, limit_idx) = match params.status {
            Some(_) => ("WHERE status_id = $1", 2),
            None => ("", 1),
        };

        let query = format!(
            "SELECT {COLUMNS} FROM import_jobs \
             {where_clause} \
             ORDER BY id DESC \
             LIMIT ${limit_idx} OFFSET ${}",
            limit_idx + 1,
        );

        let mut q = sqlx::query_as::<_, ImportJobRow>(&query);
        if let Some(status) = params.status {
            q = q.bind(status.id());
        }
        q.bind(limit).bind(offset).fetch_all(pool).await
    }
}
