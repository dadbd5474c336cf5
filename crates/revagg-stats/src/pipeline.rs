//! The aggregation pipeline: expand a product into analysis units, run them
//! concurrently, persist each success, and report every failure by key.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use revagg_core::{
    AppConfig, Platform, PlatformSelector, Product, TimePeriod, UnitKey, ALL_PLATFORMS_TAG,
};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::{PipelineError, UnitError};
use crate::executor::{AnalysisUnit, UnitExecutor};
use crate::traits::{Catalog, StatsStore};

/// Scheduling knobs for [`StatsPipeline`].
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub time_periods: Vec<TimePeriod>,
    pub max_concurrent_units: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            time_periods: vec![TimePeriod::AllTime],
            max_concurrent_units: 8,
        }
    }
}

impl PipelineConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            time_periods: config.stats_time_periods.clone(),
            max_concurrent_units: config.stats_max_concurrent_units,
        }
    }
}

/// Outcome of a run in which every unit persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub product_id: Uuid,
    pub total_units: usize,
    /// Keys written by this run, sorted.
    pub persisted: Vec<UnitKey>,
}

/// Builds the full unit set of a product.
///
/// Platforms sharing a name tag are merged into a single selector. A product
/// with one distinct tag gets only the `all` selector; otherwise `all` plus
/// one selector per tag, each crossed with every period.
///
/// # Errors
///
/// - [`PipelineError::NoPlatforms`] when `platforms` is empty.
/// - [`PipelineError::ReservedPlatformTag`] when a platform is named `all`.
pub fn expand_units(
    product: &Product,
    platforms: &[Platform],
    periods: &[TimePeriod],
) -> Result<Vec<AnalysisUnit>, PipelineError> {
    if platforms.is_empty() {
        return Err(PipelineError::NoPlatforms {
            product_id: product.id,
        });
    }

    // (tag, platform ids) in first-seen order
    let mut tags: Vec<(String, Vec<Uuid>)> = Vec::new();
    for platform in platforms {
        let tag = platform.name.trim().to_lowercase();
        if tag == ALL_PLATFORMS_TAG {
            return Err(PipelineError::ReservedPlatformTag {
                product_id: product.id,
                tag: platform.name.clone(),
            });
        }
        match tags.iter_mut().find(|(existing, _)| *existing == tag) {
            Some((_, ids)) => ids.push(platform.id),
            None => tags.push((tag, vec![platform.id])),
        }
    }

    let mut selectors = vec![PlatformSelector::All];
    if tags.len() > 1 {
        selectors.extend(
            tags.into_iter()
                .map(|(tag, platform_ids)| PlatformSelector::Platform { tag, platform_ids }),
        );
    }

    Ok(selectors
        .iter()
        .flat_map(|selector| {
            periods.iter().map(move |&time_period| AnalysisUnit {
                product_id: product.id,
                selector: selector.clone(),
                time_period,
            })
        })
        .collect())
}

pub struct StatsPipeline {
    catalog: Arc<dyn Catalog>,
    executor: Arc<UnitExecutor>,
    store: Arc<dyn StatsStore>,
    config: PipelineConfig,
    reference_date: Option<NaiveDate>,
}

impl StatsPipeline {
    #[must_use]
    pub fn new(
        catalog: Arc<dyn Catalog>,
        executor: UnitExecutor,
        store: Arc<dyn StatsStore>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            catalog,
            executor: Arc::new(executor),
            store,
            config,
            reference_date: None,
        }
    }

    /// Pins the date time windows are resolved against instead of today (UTC).
    #[must_use]
    pub fn with_reference_date(mut self, today: NaiveDate) -> Self {
        self.reference_date = Some(today);
        self
    }

    #[must_use]
    pub fn catalog(&self) -> &Arc<dyn Catalog> {
        &self.catalog
    }

    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Loads the product and its platforms, then runs every unit.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::ProductNotFound`] when the product does not exist
    ///   for `user_id`.
    /// - [`PipelineError::Catalog`] when loading fails.
    /// - Everything [`StatsPipeline::run_product`] returns.
    pub async fn run(
        &self,
        product_id: Uuid,
        user_id: Uuid,
        cancel: &CancellationToken,
    ) -> Result<RunSummary, PipelineError> {
        let product = self
            .catalog
            .product_for_user(product_id, user_id)
            .await
            .map_err(PipelineError::Catalog)?
            .ok_or(PipelineError::ProductNotFound {
                product_id,
                user_id,
            })?;
        let platforms = self
            .catalog
            .platforms_for_product(product_id, user_id)
            .await
            .map_err(PipelineError::Catalog)?;

        self.run_product(&product, &platforms, cancel).await
    }

    /// Runs every unit of an already-loaded product.
    ///
    /// Units run as independent tasks bounded by `max_concurrent_units`. A
    /// unit counts as done only once its row is upserted. Units still waiting
    /// for a slot when `cancel` fires are abandoned as
    /// [`UnitError::Cancelled`]; units already executing finish normally.
    ///
    /// # Errors
    ///
    /// - Input errors from [`expand_units`]; nothing is dispatched.
    /// - [`PipelineError::UnitsFailed`] when at least one unit failed. Rows of
    ///   the units that succeeded are already persisted.
    pub async fn run_product(
        &self,
        product: &Product,
        platforms: &[Platform],
        cancel: &CancellationToken,
    ) -> Result<RunSummary, PipelineError> {
        let units = expand_units(product, platforms, &self.config.time_periods)?;
        let total = units.len();
        let today = self
            .reference_date
            .unwrap_or_else(|| Utc::now().date_naive());

        tracing::info!(
            product_id = %product.id,
            units = total,
            max_concurrent = self.config.max_concurrent_units,
            "dispatching analysis units"
        );

        let permits = Arc::new(Semaphore::new(self.config.max_concurrent_units.max(1)));
        let product = Arc::new(product.clone());
        let mut tasks = JoinSet::new();
        let mut keys_by_task = HashMap::with_capacity(total);

        for unit in units {
            let key = unit.key();
            let handle = tasks.spawn(run_unit(
                unit,
                Arc::clone(&product),
                Arc::clone(&self.executor),
                Arc::clone(&self.store),
                Arc::clone(&permits),
                cancel.clone(),
                today,
            ));
            keys_by_task.insert(handle.id(), key);
        }

        let mut succeeded = Vec::with_capacity(total);
        let mut failures = Vec::new();

        while let Some(joined) = tasks.join_next_with_id().await {
            let (key, outcome) = match joined {
                Ok((id, outcome)) => (keys_by_task.remove(&id), outcome),
                Err(join_err) => (
                    keys_by_task.remove(&join_err.id()),
                    Err(UnitError::Panicked(join_err.to_string())),
                ),
            };
            let Some(key) = key else {
                tracing::error!("finished analysis task has no recorded unit key");
                continue;
            };

            match outcome {
                Ok(()) => succeeded.push(key),
                Err(err) => {
                    tracing::warn!(unit = %key, error = %err, "analysis unit failed");
                    failures.push((key, err));
                }
            }
        }

        succeeded.sort();
        failures.sort_by(|a, b| a.0.cmp(&b.0));

        if failures.is_empty() {
            tracing::info!(product_id = %product.id, units = total, "all analysis units persisted");
            return Ok(RunSummary {
                product_id: product.id,
                total_units: total,
                persisted: succeeded,
            });
        }

        Err(PipelineError::UnitsFailed {
            failed: failures.len(),
            total,
            succeeded,
            failures,
        })
    }
}

async fn run_unit(
    unit: AnalysisUnit,
    product: Arc<Product>,
    executor: Arc<UnitExecutor>,
    store: Arc<dyn StatsStore>,
    permits: Arc<Semaphore>,
    cancel: CancellationToken,
    today: NaiveDate,
) -> Result<(), UnitError> {
    let _permit = tokio::select! {
        biased;
        () = cancel.cancelled() => return Err(UnitError::Cancelled),
        permit = permits.acquire_owned() => permit.map_err(|_| UnitError::Cancelled)?,
    };

    let stats = executor.execute(&product, &unit, today).await?;
    store.upsert_stats(&stats).await.map_err(UnitError::Persist)?;

    tracing::debug!(unit = %unit.key(), "analysis unit persisted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product() -> Product {
        Product {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            name: "Trail Runner".to_string(),
            description: "Running shoe".to_string(),
        }
    }

    fn platform(product: &Product, name: &str) -> Platform {
        Platform {
            id: Uuid::new_v4(),
            product_id: product.id,
            name: name.to_string(),
            url: None,
        }
    }

    fn tags(units: &[AnalysisUnit]) -> Vec<String> {
        units.iter().map(|u| u.selector.tag().to_string()).collect()
    }

    #[test]
    fn single_platform_expands_to_all_only() {
        let p = product();
        let units = expand_units(&p, &[platform(&p, "amazon")], &TimePeriod::ALL).unwrap();
        assert_eq!(units.len(), TimePeriod::ALL.len());
        assert!(units.iter().all(|u| u.selector == PlatformSelector::All));
    }

    #[test]
    fn k_platforms_expand_to_k_plus_one_selectors_per_period() {
        let p = product();
        let platforms = [
            platform(&p, "trustpilot"),
            platform(&p, "amazon"),
            platform(&p, "google"),
        ];
        let periods = [TimePeriod::ThisWeek, TimePeriod::AllTime];
        let units = expand_units(&p, &platforms, &periods).unwrap();

        assert_eq!(units.len(), 4 * 2);
        assert_eq!(
            tags(&units),
            vec!["all", "all", "trustpilot", "trustpilot", "amazon", "amazon", "google", "google"]
        );
    }

    #[test]
    fn platforms_sharing_a_tag_are_merged() {
        let p = product();
        let first = platform(&p, "amazon");
        let second = platform(&p, "Amazon");
        let other = platform(&p, "trustpilot");
        let units = expand_units(
            &p,
            &[first.clone(), other.clone(), second.clone()],
            &[TimePeriod::AllTime],
        )
        .unwrap();

        assert_eq!(tags(&units), vec!["all", "amazon", "trustpilot"]);
        assert_eq!(
            units[1].selector,
            PlatformSelector::Platform {
                tag: "amazon".to_string(),
                platform_ids: vec![first.id, second.id],
            }
        );
    }

    #[test]
    fn duplicate_tag_alone_counts_as_one_platform() {
        let p = product();
        let units = expand_units(
            &p,
            &[platform(&p, "amazon"), platform(&p, "amazon")],
            &[TimePeriod::AllTime],
        )
        .unwrap();
        assert_eq!(tags(&units), vec!["all"]);
    }

    #[test]
    fn no_platforms_is_rejected() {
        let p = product();
        let err = expand_units(&p, &[], &[TimePeriod::AllTime]).unwrap_err();
        assert!(matches!(err, PipelineError::NoPlatforms { .. }));
    }

    #[test]
    fn platform_named_all_is_rejected() {
        let p = product();
        let err = expand_units(
            &p,
            &[platform(&p, "amazon"), platform(&p, " ALL ")],
            &[TimePeriod::AllTime],
        )
        .unwrap_err();
        assert!(matches!(err, PipelineError::ReservedPlatformTag { .. }));
    }
}
