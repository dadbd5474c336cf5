//! Shared domain types and configuration for the review aggregator.

pub mod app_config;
pub mod catalog;
pub mod config;
pub mod period;
pub mod stats;

mod error;

pub use app_config::{AppConfig, Environment, LlmProvider};
pub use catalog::{Platform, PlatformSelector, Product, Review, ALL_PLATFORMS_TAG};
pub use config::{load_app_config, load_app_config_from_env};
pub use error::{ConfigError, CoreError};
pub use period::{DateWindow, TimePeriod};
pub use stats::{ProductStats, SentimentCount, UnitKey, SENTIMENT_CATEGORIES};
