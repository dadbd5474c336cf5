// Collaborator seams of the stats pipeline.
//
// The pipeline only talks to these traits, so tests drive it with in-memory
// fakes and production wires the Postgres and LLM adapters from
// `crate::postgres`.

use async_trait::async_trait;
use revagg_analysis::{Prompt, ResponseShape};
use revagg_core::{DateWindow, Platform, PlatformSelector, Product, ProductStats, Review};
use uuid::Uuid;

use crate::error::BackendError;

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

#[async_trait]
pub trait Catalog: Send + Sync {
    /// The product, if it exists and belongs to `user_id`.
    async fn product_for_user(
        &self,
        product_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Product>, BackendError>;

    async fn platforms_for_product(
        &self,
        product_id: Uuid,
        user_id: Uuid,
    ) -> Result<Vec<Platform>, BackendError>;

    /// Every product, for scheduled runs.
    async fn all_products(&self) -> Result<Vec<Product>, BackendError>;
}

// ---------------------------------------------------------------------------
// ReviewSource
// ---------------------------------------------------------------------------

#[async_trait]
pub trait ReviewSource: Send + Sync {
    /// Reviews of the selected platforms published inside `window`.
    ///
    /// An empty list is a valid answer.
    async fn fetch_reviews(
        &self,
        product_id: Uuid,
        user_id: Uuid,
        selector: &PlatformSelector,
        window: DateWindow,
    ) -> Result<Vec<Review>, BackendError>;
}

// ---------------------------------------------------------------------------
// AnalysisClient
// ---------------------------------------------------------------------------

#[async_trait]
pub trait AnalysisClient: Send + Sync {
    /// Raw model output for `prompt`. Parsing is the caller's job.
    async fn analyze(&self, prompt: &Prompt, shape: ResponseShape) -> Result<String, BackendError>;
}

// ---------------------------------------------------------------------------
// StatsStore
// ---------------------------------------------------------------------------

#[async_trait]
pub trait StatsStore: Send + Sync {
    /// Insert or fully replace the row keyed by
    /// `(product_id, platform, time_period)`.
    async fn upsert_stats(&self, stats: &ProductStats) -> Result<(), BackendError>;
}
