//! Production collaborators: Postgres-backed catalog, review source and
//! stats store, plus the LLM client as the analysis backend.

use async_trait::async_trait;
use revagg_analysis::{LlmClient, Prompt, ResponseShape};
use revagg_core::{DateWindow, Platform, PlatformSelector, Product, ProductStats, Review};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::BackendError;
use crate::traits::{AnalysisClient, Catalog, ReviewSource, StatsStore};

#[derive(Clone)]
pub struct PgCatalog {
    pool: PgPool,
}

impl PgCatalog {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Catalog for PgCatalog {
    async fn product_for_user(
        &self,
        product_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Product>, BackendError> {
        let row = revagg_db::get_product_for_user(&self.pool, product_id, user_id).await?;
        Ok(row.map(Product::from))
    }

    async fn platforms_for_product(
        &self,
        product_id: Uuid,
        user_id: Uuid,
    ) -> Result<Vec<Platform>, BackendError> {
        let rows = revagg_db::list_platforms_for_product(&self.pool, product_id, user_id).await?;
        Ok(rows.into_iter().map(Platform::from).collect())
    }

    async fn all_products(&self) -> Result<Vec<Product>, BackendError> {
        let rows = revagg_db::list_products(&self.pool).await?;
        Ok(rows.into_iter().map(Product::from).collect())
    }
}

#[derive(Clone)]
pub struct PgReviewSource {
    pool: PgPool,
}

impl PgReviewSource {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReviewSource for PgReviewSource {
    async fn fetch_reviews(
        &self,
        product_id: Uuid,
        user_id: Uuid,
        selector: &PlatformSelector,
        window: DateWindow,
    ) -> Result<Vec<Review>, BackendError> {
        let rows = match selector {
            PlatformSelector::All => {
                revagg_db::list_reviews_for_product(
                    &self.pool,
                    product_id,
                    user_id,
                    window.from,
                    window.to,
                )
                .await?
            }
            PlatformSelector::Platform { platform_ids, .. } => {
                revagg_db::list_reviews_for_platforms(
                    &self.pool,
                    product_id,
                    user_id,
                    platform_ids,
                    window.from,
                    window.to,
                )
                .await?
            }
        };
        Ok(rows.into_iter().map(Review::from).collect())
    }
}

#[derive(Clone)]
pub struct PgStatsStore {
    pool: PgPool,
}

impl PgStatsStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StatsStore for PgStatsStore {
    async fn upsert_stats(&self, stats: &ProductStats) -> Result<(), BackendError> {
        revagg_db::upsert_product_stats(&self.pool, stats).await?;
        Ok(())
    }
}

#[async_trait]
impl AnalysisClient for LlmClient {
    async fn analyze(&self, prompt: &Prompt, shape: ResponseShape) -> Result<String, BackendError> {
        Ok(self.complete(prompt, shape).await?)
    }
}
