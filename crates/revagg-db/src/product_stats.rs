//! Database operations for the `product_stats` table.

use chrono::{DateTime, Utc};
use revagg_core::{ProductStats, SentimentCount, TimePeriod};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row type
// ---------------------------------------------------------------------------

/// A row from the `product_stats` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProductStatsRow {
    pub product_id: Uuid,
    pub platform: String,
    pub time_period: String,
    pub key_highlights: Vec<String>,
    pub pain_points: Vec<String>,
    pub overall_sentiment: String,
    pub sentiment_counts: Json<Vec<SentimentCount>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<ProductStatsRow> for ProductStats {
    type Error = DbError;

    fn try_from(row: ProductStatsRow) -> Result<Self, Self::Error> {
        let time_period =
            row.time_period
                .parse::<TimePeriod>()
                .map_err(|e| DbError::InvalidColumn {
                    column: "product_stats.time_period",
                    reason: e.to_string(),
                })?;

        Ok(Self {
            product_id: row.product_id,
            platform: row.platform,
            time_period,
            key_highlights: row.key_highlights,
            pain_points: row.pain_points,
            overall_sentiment: row.overall_sentiment,
            sentiment_counts: row.sentiment_counts.0,
        })
    }
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Inserts or fully replaces the stats row for
/// `(product_id, platform, time_period)`.
///
/// Every value column is overwritten on conflict; `created_at` is kept and
/// `updated_at` is bumped.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_product_stats(pool: &PgPool, stats: &ProductStats) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO product_stats \
             (product_id, platform, time_period, key_highlights, pain_points, \
              overall_sentiment, sentiment_counts) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) \
         ON CONFLICT (product_id, platform, time_period) DO UPDATE SET \
             key_highlights    = EXCLUDED.key_highlights, \
             pain_points       = EXCLUDED.pain_points, \
             overall_sentiment = EXCLUDED.overall_sentiment, \
             sentiment_counts  = EXCLUDED.sentiment_counts, \
             updated_at        = NOW()",
    )
    .bind(stats.product_id)
    .bind(&stats.platform)
    .bind(stats.time_period.as_str())
    .bind(&stats.key_highlights)
    .bind(&stats.pain_points)
    .bind(&stats.overall_sentiment)
    .bind(Json(&stats.sentiment_counts))
    .execute(pool)
    .await?;

    Ok(())
}

/// Returns the stats row for one key, or `None` if it has not been computed.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_product_stats(
    pool: &PgPool,
    product_id: Uuid,
    platform: &str,
    time_period: TimePeriod,
) -> Result<Option<ProductStatsRow>, DbError> {
    let row = sqlx::query_as::<_, ProductStatsRow>(
        "SELECT product_id, platform, time_period, key_highlights, pain_points, \
                overall_sentiment, sentiment_counts, created_at, updated_at \
         FROM product_stats \
         WHERE product_id = $1 AND platform = $2 AND time_period = $3",
    )
    .bind(product_id)
    .bind(platform)
    .bind(time_period.as_str())
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Lists every stats row of a product, `all` first, then by platform and period.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_product_stats(
    pool: &PgPool,
    product_id: Uuid,
) -> Result<Vec<ProductStatsRow>, DbError> {
    let rows = sqlx::query_as::<_, ProductStatsRow>(
        "SELECT product_id, platform, time_period, key_highlights, pain_points, \
                overall_sentiment, sentiment_counts, created_at, updated_at \
         FROM product_stats \
         WHERE product_id = $1 \
         ORDER BY (platform = 'all') DESC, platform, time_period",
    )
    .bind(product_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
