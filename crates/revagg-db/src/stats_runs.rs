//! Database operations for `stats_runs`, the audit trail of pipeline runs.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// A row from the `stats_runs` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StatsRunRow {
    pub id: i64,
    pub public_id: Uuid,
    pub product_id: Uuid,
    pub trigger_source: String,
    /// One of `running`, `succeeded`, `partial`, `failed`.
    pub status: String,
    pub total_units: i32,
    pub failed_units: i32,
    pub error_message: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Final state written by [`complete_stats_run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatsRunOutcome {
    /// Every unit persisted.
    Succeeded,
    /// Some units persisted, some failed.
    Partial,
    /// Nothing persisted.
    Failed,
}

impl StatsRunOutcome {
    /// Classify a finished run from its unit counts.
    ///
    /// A run with zero units (rejected before dispatch) is `Failed`.
    #[must_use]
    pub fn from_counts(total_units: usize, failed_units: usize) -> Self {
        if total_units == 0 || failed_units >= total_units {
            StatsRunOutcome::Failed
        } else if failed_units == 0 {
            StatsRunOutcome::Succeeded
        } else {
            StatsRunOutcome::Partial
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            StatsRunOutcome::Succeeded => "succeeded",
            StatsRunOutcome::Partial => "partial",
            StatsRunOutcome::Failed => "failed",
        }
    }
}

const RUN_COLUMNS: &str = "id, public_id, product_id, trigger_source, status, total_units, \
                           failed_units, error_message, started_at, completed_at, created_at";

/// Creates a run in `running` status and returns the new row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn create_stats_run(
    pool: &PgPool,
    product_id: Uuid,
    trigger_source: &str,
) -> Result<StatsRunRow, DbError> {
    let row = sqlx::query_as::<_, StatsRunRow>(&format!(
        "INSERT INTO stats_runs (public_id, product_id, trigger_source, status) \
         VALUES ($1, $2, $3, 'running') \
         RETURNING {RUN_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(product_id)
    .bind(trigger_source)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Moves a `running` run to its final status and records unit counts.
///
/// # Errors
///
/// Returns [`DbError::InvalidStatsRunTransition`] if the run is not
/// `running`, or [`DbError::Sqlx`] if the update fails.
pub async fn complete_stats_run(
    pool: &PgPool,
    id: i64,
    outcome: StatsRunOutcome,
    total_units: i32,
    failed_units: i32,
    error_message: Option<&str>,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE stats_runs \
         SET status = $1, total_units = $2, failed_units = $3, error_message = $4, \
             completed_at = NOW() \
         WHERE id = $5 AND status = 'running'",
    )
    .bind(outcome.as_str())
    .bind(total_units)
    .bind(failed_units)
    .bind(error_message)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidStatsRunTransition {
            id,
            expected_status: "running",
        });
    }

    Ok(())
}

/// Fetches a single run by its internal `id`.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row exists with the given `id`, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn get_stats_run(pool: &PgPool, id: i64) -> Result<StatsRunRow, DbError> {
    let row = sqlx::query_as::<_, StatsRunRow>(&format!(
        "SELECT {RUN_COLUMNS} FROM stats_runs WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    Ok(row)
}

/// Returns the most recent `limit` runs, optionally for one product.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_stats_runs(
    pool: &PgPool,
    product_id: Option<Uuid>,
    limit: i64,
) -> Result<Vec<StatsRunRow>, DbError> {
    let rows = match product_id {
        Some(id) => {
            sqlx::query_as::<_, StatsRunRow>(&format!(
                "SELECT {RUN_COLUMNS} FROM stats_runs \
                 WHERE product_id = $1 \
                 ORDER BY created_at DESC, id DESC \
                 LIMIT $2"
            ))
            .bind(id)
            .bind(limit)
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query_as::<_, StatsRunRow>(&format!(
                "SELECT {RUN_COLUMNS} FROM stats_runs \
                 ORDER BY created_at DESC, id DESC \
                 LIMIT $1"
            ))
            .bind(limit)
            .fetch_all(pool)
            .await?
        }
    };

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::StatsRunOutcome;

    #[test]
    fn outcome_classifies_unit_counts() {
        assert_eq!(StatsRunOutcome::from_counts(3, 0), StatsRunOutcome::Succeeded);
        assert_eq!(StatsRunOutcome::from_counts(3, 1), StatsRunOutcome::Partial);
        assert_eq!(StatsRunOutcome::from_counts(3, 3), StatsRunOutcome::Failed);
        assert_eq!(StatsRunOutcome::from_counts(0, 0), StatsRunOutcome::Failed);
    }
}
