//! Recorded pipeline runs for the CLI and the scheduler.
//!
//! Every product run is bracketed by a `stats_runs` row. Per-product failures
//! in a batch are logged and counted rather than propagated so one bad
//! product does not stop the others.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use revagg_analysis::LlmClient;
use revagg_core::{AppConfig, Platform, Product};
use revagg_db::StatsRunOutcome;
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::PipelineError;
use crate::executor::UnitExecutor;
use crate::pipeline::{PipelineConfig, RunSummary, StatsPipeline};
use crate::postgres::{PgCatalog, PgReviewSource, PgStatsStore};

/// What started a run; stored in `stats_runs.trigger_source`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunTrigger {
    Cli,
    Scheduler,
}

impl RunTrigger {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            RunTrigger::Cli => "cli",
            RunTrigger::Scheduler => "scheduler",
        }
    }
}

/// Per-product tallies of a [`StatsService::run_for_all_products`] batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub products: usize,
    pub succeeded: usize,
    pub partial: usize,
    pub failed: usize,
    /// Products without platforms, or not started because of cancellation.
    pub skipped: usize,
}

impl BatchSummary {
    #[must_use]
    pub fn attempted(&self) -> usize {
        self.succeeded + self.partial + self.failed
    }
}

enum ProductOutcome {
    Succeeded,
    Partial,
    Failed,
    Skipped,
}

pub struct StatsService {
    pool: PgPool,
    pipeline: StatsPipeline,
    max_concurrent_products: usize,
}

impl StatsService {
    #[must_use]
    pub fn new(pool: PgPool, pipeline: StatsPipeline, max_concurrent_products: usize) -> Self {
        Self {
            pool,
            pipeline,
            max_concurrent_products,
        }
    }

    /// Wires the Postgres collaborators and `llm` into a pipeline.
    #[must_use]
    pub fn from_app_config(pool: PgPool, llm: LlmClient, config: &AppConfig) -> Self {
        let executor = UnitExecutor::new(
            Arc::new(PgReviewSource::new(pool.clone())),
            Arc::new(llm),
        );
        let pipeline = StatsPipeline::new(
            Arc::new(PgCatalog::new(pool.clone())),
            executor,
            Arc::new(PgStatsStore::new(pool.clone())),
            PipelineConfig::from_app_config(config),
        );
        Self::new(pool, pipeline, config.stats_max_concurrent_products)
    }

    /// Runs the pipeline for one product and records the run.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::ProductNotFound`] or [`PipelineError::Catalog`]
    /// before any run is recorded, [`PipelineError::RunRecord`] if the run
    /// row cannot be created, and otherwise whatever the pipeline returns.
    pub async fn run_for_product(
        &self,
        product_id: Uuid,
        user_id: Uuid,
        trigger: RunTrigger,
        cancel: &CancellationToken,
    ) -> Result<RunSummary, PipelineError> {
        let catalog = self.pipeline.catalog();
        let product = catalog
            .product_for_user(product_id, user_id)
            .await
            .map_err(PipelineError::Catalog)?
            .ok_or(PipelineError::ProductNotFound {
                product_id,
                user_id,
            })?;
        let platforms = catalog
            .platforms_for_product(product_id, user_id)
            .await
            .map_err(PipelineError::Catalog)?;

        self.run_recorded(&product, &platforms, trigger, cancel).await
    }

    /// Runs the pipeline for every product, `max_concurrent_products` at a time.
    ///
    /// Products without platforms are skipped. Once `cancel` fires, products
    /// not yet started are skipped too.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Catalog`] if the product list cannot be loaded.
    pub async fn run_for_all_products(
        &self,
        trigger: RunTrigger,
        cancel: &CancellationToken,
    ) -> Result<BatchSummary, PipelineError> {
        let products = self
            .pipeline
            .catalog()
            .all_products()
            .await
            .map_err(PipelineError::Catalog)?;

        tracing::info!(
            products = products.len(),
            max_concurrent = self.max_concurrent_products,
            trigger = trigger.as_str(),
            "starting stats batch"
        );

        let product_runs: Vec<_> = products
            .iter()
            .map(|product| self.run_batch_product(product, trigger, cancel))
            .collect();
        let outcomes: Vec<ProductOutcome> = stream::iter(product_runs)
            .buffer_unordered(self.max_concurrent_products.max(1))
            .collect()
            .await;

        let mut summary = BatchSummary {
            products: products.len(),
            ..BatchSummary::default()
        };
        for outcome in outcomes {
            match outcome {
                ProductOutcome::Succeeded => summary.succeeded += 1,
                ProductOutcome::Partial => summary.partial += 1,
                ProductOutcome::Failed => summary.failed += 1,
                ProductOutcome::Skipped => summary.skipped += 1,
            }
        }

        tracing::info!(
            succeeded = summary.succeeded,
            partial = summary.partial,
            failed = summary.failed,
            skipped = summary.skipped,
            "stats batch finished"
        );

        Ok(summary)
    }

    async fn run_batch_product(
        &self,
        product: &Product,
        trigger: RunTrigger,
        cancel: &CancellationToken,
    ) -> ProductOutcome {
        if cancel.is_cancelled() {
            return ProductOutcome::Skipped;
        }

        let platforms = match self
            .pipeline
            .catalog()
            .platforms_for_product(product.id, product.user_id)
            .await
        {
            Ok(platforms) => platforms,
            Err(e) => {
                tracing::warn!(product_id = %product.id, error = %e, "loading platforms failed");
                return ProductOutcome::Failed;
            }
        };
        if platforms.is_empty() {
            tracing::info!(product_id = %product.id, "skipping product without platforms");
            return ProductOutcome::Skipped;
        }

        match self.run_recorded(product, &platforms, trigger, cancel).await {
            Ok(_) => ProductOutcome::Succeeded,
            Err(PipelineError::UnitsFailed { failed, total, .. }) if failed < total => {
                ProductOutcome::Partial
            }
            Err(e) => {
                tracing::warn!(product_id = %product.id, error = %e, "stats run failed");
                ProductOutcome::Failed
            }
        }
    }

    async fn run_recorded(
        &self,
        product: &Product,
        platforms: &[Platform],
        trigger: RunTrigger,
        cancel: &CancellationToken,
    ) -> Result<RunSummary, PipelineError> {
        let run = revagg_db::create_stats_run(&self.pool, product.id, trigger.as_str())
            .await
            .map_err(PipelineError::RunRecord)?;

        let result = self.pipeline.run_product(product, platforms, cancel).await;

        let (total, failed, message) = match &result {
            Ok(summary) => (summary.total_units, 0, None),
            Err(err) => {
                let (total, failed) = err.unit_counts();
                (total, failed, Some(err.to_string()))
            }
        };
        let outcome = StatsRunOutcome::from_counts(total, failed);
        complete_run_best_effort(&self.pool, run.id, outcome, total, failed, message.as_deref())
            .await;

        result
    }
}

/// Completes a run row, logging instead of failing if the update fails.
async fn complete_run_best_effort(
    pool: &PgPool,
    run_id: i64,
    outcome: StatsRunOutcome,
    total: usize,
    failed: usize,
    message: Option<&str>,
) {
    let total = i32::try_from(total).unwrap_or(i32::MAX);
    let failed = i32::try_from(failed).unwrap_or(i32::MAX);
    if let Err(e) =
        revagg_db::complete_stats_run(pool, run_id, outcome, total, failed, message).await
    {
        tracing::error!(
            run_id,
            status = outcome.as_str(),
            error = %e,
            "failed to record stats run completion"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trigger_names_match_stored_values() {
        assert_eq!(RunTrigger::Cli.as_str(), "cli");
        assert_eq!(RunTrigger::Scheduler.as_str(), "scheduler");
    }

    #[test]
    fn attempted_excludes_skipped_products() {
        let summary = BatchSummary {
            products: 6,
            succeeded: 2,
            partial: 1,
            failed: 1,
            skipped: 2,
        };
        assert_eq!(summary.attempted(), 4);
    }
}
