//! Product statistics generation.
//!
//! A product is expanded into one analysis unit per platform selector and
//! time period. Units run concurrently; each one fetches its reviews, asks
//! the analysis backend for a summary and per-category sentiment counts, and
//! upserts a complete `product_stats` row. A failing unit never affects its
//! siblings; failures are reported together once every unit has finished.

pub mod analysis;
pub mod extract;
pub mod postgres;
pub mod prompt;

mod error;
mod executor;
mod pipeline;
mod runner;
mod traits;

pub use error::{AnalysisKind, BackendError, PipelineError, UnitError};
pub use executor::{empty_stats, AnalysisUnit, UnitExecutor, EMPTY_PERIOD_SENTIMENT};
pub use pipeline::{expand_units, PipelineConfig, RunSummary, StatsPipeline};
pub use postgres::{PgCatalog, PgReviewSource, PgStatsStore};
pub use runner::{BatchSummary, RunTrigger, StatsService};
pub use traits::{AnalysisClient, Catalog, ReviewSource, StatsStore};
