//! Database operations for `ingestion_runs` and `ingestion_run_influencers`.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `ingestion_runs` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct IngestionRunRow {
    pub id: i64,
    pub public_id: Uuid,
    pub trigger_source: String,
    pub status: String,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub influencers_succeeded: i32,
    pub influencers_skipped: i32,
    pub influencers_failed: i32,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A row from the `ingestion_run_influencers` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct IngestionRunInfluencerRow {
    pub id: i64,
    pub ingestion_run_id: i64,
    pub influencer_id: i64,
    pub status: String,
    pub stage: Option<String>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Outcome counts recorded when a run completes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunCounts {
    pub succeeded: i32,
    pub skipped: i32,
    pub failed: i32,
}

const RUN_COLUMNS: &str = "id, public_id, trigger_source, status, started_at, completed_at, \
                           influencers_succeeded, influencers_skipped, influencers_failed, \
                           error_message, created_at";

// ---------------------------------------------------------------------------
// ingestion_runs operations
// ---------------------------------------------------------------------------

/// Creates a new ingestion run in `queued` status.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn create_ingestion_run(
    pool: &PgPool,
    trigger_source: &str,
) -> Result<IngestionRunRow, DbError> {
    let row = sqlx::query_as::<_, IngestionRunRow>(&format!(
        "INSERT INTO ingestion_runs (public_id, trigger_source, status) \
         VALUES ($1, $2, 'queued') \
         RETURNING {RUN_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(trigger_source)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Marks a `queued` run as `running` and sets `started_at = NOW()`.
///
/// # Errors
///
/// Returns [`DbError::InvalidRunTransition`] if the run is not `queued`, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn start_ingestion_run(pool: &PgPool, id: i64) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE ingestion_runs \
         SET status = 'running', started_at = NOW() \
         WHERE id = $1 AND status = 'queued'",
    )
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidRunTransition {
            id,
            expected_status: "queued",
        });
    }

    Ok(())
}

/// Marks a `running` run as `succeeded` and records its outcome counts.
///
/// # Errors
///
/// Returns [`DbError::InvalidRunTransition`] if the run is not `running`, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn complete_ingestion_run(
    pool: &PgPool,
    id: i64,
    counts: RunCounts,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE ingestion_runs \
         SET status = 'succeeded', completed_at = NOW(), \
             influencers_succeeded = $1, influencers_skipped = $2, influencers_failed = $3 \
         WHERE id = $4 AND status = 'running'",
    )
    .bind(counts.succeeded)
    .bind(counts.skipped)
    .bind(counts.failed)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidRunTransition {
            id,
            expected_status: "running",
        });
    }

    Ok(())
}

/// Marks a `running` run as `failed` with an error message and whatever
/// counts were reached.
///
/// # Errors
///
/// Returns [`DbError::InvalidRunTransition`] if the run is not `running`, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn fail_ingestion_run(
    pool: &PgPool,
    id: i64,
    counts: RunCounts,
    error_message: &str,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE ingestion_runs \
         SET status = 'failed', completed_at = NOW(), error_message = $1, \
             influencers_succeeded = $2, influencers_skipped = $3, influencers_failed = $4 \
         WHERE id = $5 AND status = 'running'",
    )
    .bind(error_message)
    .bind(counts.succeeded)
    .bind(counts.skipped)
    .bind(counts.failed)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidRunTransition {
            id,
            expected_status: "running",
        });
    }

    Ok(())
}

/// Fetches one run by id.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no run has this id, or [`DbError::Sqlx`]
/// if the query fails.
pub async fn get_ingestion_run(pool: &PgPool, id: i64) -> Result<IngestionRunRow, DbError> {
    let row = sqlx::query_as::<_, IngestionRunRow>(&format!(
        "SELECT {RUN_COLUMNS} FROM ingestion_runs WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    Ok(row)
}

/// Returns the most recent `limit` runs, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_ingestion_runs(pool: &PgPool, limit: i64) -> Result<Vec<IngestionRunRow>, DbError> {
    let rows = sqlx::query_as::<_, IngestionRunRow>(&format!(
        "SELECT {RUN_COLUMNS} \
         FROM ingestion_runs \
         ORDER BY created_at DESC, id DESC \
         LIMIT $1"
    ))
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

// ---------------------------------------------------------------------------
// ingestion_run_influencers operations
// ---------------------------------------------------------------------------

/// Inserts or updates the per-influencer result of a run.
///
/// Conflicts on `(ingestion_run_id, influencer_id)` overwrite the status,
/// stage, and error message.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn record_run_influencer(
    pool: &PgPool,
    run_id: i64,
    influencer_id: i64,
    status: &str,
    stage: Option<&str>,
    error_message: Option<&str>,
) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO ingestion_run_influencers \
             (ingestion_run_id, influencer_id, status, stage, error_message) \
         VALUES ($1, $2, $3, $4, $5) \
         ON CONFLICT (ingestion_run_id, influencer_id) DO UPDATE SET \
             status        = EXCLUDED.status, \
             stage         = EXCLUDED.stage, \
             error_message = EXCLUDED.error_message",
    )
    .bind(run_id)
    .bind(influencer_id)
    .bind(status)
    .bind(stage)
    .bind(error_message)
    .execute(pool)
    .await?;

    Ok(())
}

/// Returns the per-influencer results of one run, ordered by influencer id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_ingestion_run_influencers(
    pool: &PgPool,
    run_id: i64,
) -> Result<Vec<IngestionRunInfluencerRow>, DbError> {
    let rows = sqlx::query_as::<_, IngestionRunInfluencerRow>(
        "SELECT id, ingestion_run_id, influencer_id, status, stage, error_message, created_at \
         FROM ingestion_run_influencers \
         WHERE ingestion_run_id = $1 \
         ORDER BY influencer_id",
    )
    .bind(run_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
