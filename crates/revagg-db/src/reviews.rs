//! Database operations for the `reviews` table.
//!
//! Window queries compare on the UTC calendar date of `published_at` over a
//! half-open range: `date_from` is included, `date_to` is not.

use chrono::{DateTime, NaiveDate, Utc};
use revagg_core::DateWindow;
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// A row from the `reviews` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ReviewRow {
    pub id: Uuid,
    pub platform_id: Uuid,
    pub url: Option<String>,
    pub author_name: Option<String>,
    pub published_at: DateTime<Utc>,
    pub headline: Option<String>,
    pub review_body: String,
    pub rating_value: f64,
    pub language: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<ReviewRow> for revagg_core::Review {
    fn from(row: ReviewRow) -> Self {
        Self {
            id: row.id,
            platform_id: row.platform_id,
            rating_value: row.rating_value,
            headline: row.headline,
            review_body: row.review_body,
            published_at: row.published_at,
        }
    }
}

/// Fields for a review scraped from a platform.
#[derive(Debug, Clone)]
pub struct NewReview<'a> {
    pub url: Option<&'a str>,
    pub author_name: Option<&'a str>,
    pub published_at: DateTime<Utc>,
    pub headline: Option<&'a str>,
    pub review_body: &'a str,
    pub rating_value: f64,
    pub language: Option<&'a str>,
}

/// Inserts a review, ignoring it when a review with the same `url` exists.
///
/// Returns `true` when a new row was written.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_review(
    pool: &PgPool,
    platform_id: Uuid,
    review: &NewReview<'_>,
) -> Result<bool, DbError> {
    let result = sqlx::query(
        "INSERT INTO reviews \
             (id, platform_id, url, author_name, published_at, headline, \
              review_body, rating_value, language) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
         ON CONFLICT (url) DO NOTHING",
    )
    .bind(Uuid::new_v4())
    .bind(platform_id)
    .bind(review.url)
    .bind(review.author_name)
    .bind(review.published_at)
    .bind(review.headline)
    .bind(review.review_body)
    .bind(review.rating_value)
    .bind(review.language)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Lists every review of a product (across all its platforms) published in
/// `[date_from, date_to)`, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_reviews_for_product(
    pool: &PgPool,
    product_id: Uuid,
    user_id: Uuid,
    date_from: NaiveDate,
    date_to: NaiveDate,
) -> Result<Vec<ReviewRow>, DbError> {
    let rows = sqlx::query_as::<_, ReviewRow>(
        "SELECT r.id, r.platform_id, r.url, r.author_name, r.published_at, r.headline, \
                r.review_body, r.rating_value, r.language, r.created_at \
         FROM reviews r \
         INNER JOIN platforms p ON p.id = r.platform_id \
         INNER JOIN products pr ON pr.id = p.product_id \
         WHERE pr.id = $1 AND pr.user_id = $2 \
           AND (r.published_at AT TIME ZONE 'UTC')::date >= $3 \
           AND (r.published_at AT TIME ZONE 'UTC')::date < $4 \
         ORDER BY r.published_at DESC, r.id",
    )
    .bind(product_id)
    .bind(user_id)
    .bind(date_from)
    .bind(date_to)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Lists the reviews of the given platforms of a product published in
/// `[date_from, date_to)`, newest first.
///
/// Platforms that belong to another product or user contribute nothing.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_reviews_for_platforms(
    pool: &PgPool,
    product_id: Uuid,
    user_id: Uuid,
    platform_ids: &[Uuid],
    date_from: NaiveDate,
    date_to: NaiveDate,
) -> Result<Vec<ReviewRow>, DbError> {
    let rows = sqlx::query_as::<_, ReviewRow>(
        "SELECT r.id, r.platform_id, r.url, r.author_name, r.published_at, r.headline, \
                r.review_body, r.rating_value, r.language, r.created_at \
         FROM reviews r \
         INNER JOIN platforms p ON p.id = r.platform_id \
         INNER JOIN products pr ON pr.id = p.product_id \
         WHERE pr.id = $1 AND pr.user_id = $2 AND p.id = ANY($3) \
           AND (r.published_at AT TIME ZONE 'UTC')::date >= $4 \
           AND (r.published_at AT TIME ZONE 'UTC')::date < $5 \
         ORDER BY r.published_at DESC, r.id",
    )
    .bind(product_id)
    .bind(user_id)
    .bind(platform_ids)
    .bind(date_from)
    .bind(date_to)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Number of reviews per whole-star rating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::FromRow)]
pub struct RatingBucket {
    pub rating: i32,
    pub count: i64,
}

/// Rating histogram of a product's reviews published in `window`, lowest
/// rating first.
///
/// `platform` restricts the count to platforms with that name tag; `None`
/// counts every platform of the product. Ratings are rounded to the nearest
/// whole star.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_rating_distribution(
    pool: &PgPool,
    product_id: Uuid,
    platform: Option<&str>,
    window: DateWindow,
) -> Result<Vec<RatingBucket>, DbError> {
    let rows = sqlx::query_as::<_, RatingBucket>(
        "SELECT CAST(r.rating_value AS INTEGER) AS rating, COUNT(*) AS count \
         FROM reviews r \
         INNER JOIN platforms p ON p.id = r.platform_id \
         WHERE p.product_id = $1 \
           AND ($2::text IS NULL OR p.name = $2) \
           AND (r.published_at AT TIME ZONE 'UTC')::date >= $3 \
           AND (r.published_at AT TIME ZONE 'UTC')::date < $4 \
         GROUP BY CAST(r.rating_value AS INTEGER) \
         ORDER BY rating",
    )
    .bind(product_id)
    .bind(platform)
    .bind(window.from)
    .bind(window.to)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
