//! Offline unit tests for revagg-db pool configuration and row conversions.
//! These tests do not require a live database connection.

use chrono::Utc;
use revagg_core::{AppConfig, Environment, LlmProvider, ProductStats, TimePeriod};
use revagg_db::{DbError, PlatformRow, PoolConfig, ProductStatsRow, ProductRow};
use sqlx::types::Json;
use uuid::Uuid;

fn app_config() -> AppConfig {
    AppConfig {
        database_url: "postgres://example".to_string(),
        env: Environment::Test,
        log_level: "info".to_string(),
        db_max_connections: 42,
        db_min_connections: 7,
        db_acquire_timeout_secs: 9,
        llm_provider: LlmProvider::Ollama,
        llm_base_url: "http://localhost:11434".to_string(),
        llm_model: "deepseek-r1".to_string(),
        llm_api_key: None,
        llm_request_timeout_secs: 60,
        llm_max_concurrent: 2,
        llm_min_interval_ms: 0,
        llm_max_retries: 3,
        llm_retry_backoff_base_ms: 1000,
        stats_time_periods: vec![TimePeriod::AllTime],
        stats_max_concurrent_units: 8,
        stats_max_concurrent_products: 1,
        stats_cron: "0 0 3 * * *".to_string(),
    }
}

#[test]
fn pool_config_from_app_config_uses_core_values() {
    let pool_config = PoolConfig::from_app_config(&app_config());
    assert_eq!(pool_config.max_connections, 42);
    assert_eq!(pool_config.min_connections, 7);
    assert_eq!(pool_config.acquire_timeout_secs, 9);
}

#[test]
fn product_row_converts_to_domain_product() {
    let row = ProductRow {
        id: Uuid::new_v4(),
        user_id: Uuid::new_v4(),
        name: "Trail Runner 2".to_string(),
        description: "Lightweight running shoe".to_string(),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    };
    let (id, user_id) = (row.id, row.user_id);

    let product = revagg_core::Product::from(row);
    assert_eq!(product.id, id);
    assert_eq!(product.user_id, user_id);
    assert_eq!(product.description, "Lightweight running shoe");
}

#[test]
fn platform_row_converts_to_domain_platform() {
    let row = PlatformRow {
        id: Uuid::new_v4(),
        product_id: Uuid::new_v4(),
        name: "trustpilot".to_string(),
        url: Some("https://www.trustpilot.com/review/example.com".to_string()),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    };

    let platform = revagg_core::Platform::from(row);
    assert_eq!(platform.name, "trustpilot");
    assert!(platform.url.is_some());
}

fn stats_row(time_period: &str) -> ProductStatsRow {
    ProductStatsRow {
        product_id: Uuid::new_v4(),
        platform: "amazon".to_string(),
        time_period: time_period.to_string(),
        key_highlights: vec!["Comfortable".to_string()],
        pain_points: vec!["Runs small".to_string()],
        overall_sentiment: "Mostly positive".to_string(),
        sentiment_counts: Json(vec![revagg_core::SentimentCount::zero("Price Value")]),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

#[test]
fn stats_row_converts_with_known_period() {
    let stats = ProductStats::try_from(stats_row("last_week")).expect("valid row");
    assert_eq!(stats.time_period, TimePeriod::LastWeek);
    assert_eq!(stats.platform, "amazon");
    assert_eq!(stats.key_highlights, vec!["Comfortable".to_string()]);
    assert_eq!(stats.sentiment_counts.len(), 1);
}

#[test]
fn stats_row_with_unknown_period_is_rejected() {
    let err = ProductStats::try_from(stats_row("fortnight")).unwrap_err();
    assert!(
        matches!(
            err,
            DbError::InvalidColumn {
                column: "product_stats.time_period",
                ..
            }
        ),
        "expected InvalidColumn, got {err:?}"
    );
}
