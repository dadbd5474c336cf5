use crate::app_config::{AppConfig, Environment, LlmProvider};
use crate::{ConfigError, TimePeriod};

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so it can be tested with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_positive_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        let value = or_default(var, default)
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))?;
        if value == 0 {
            return Err(invalid(var, "must be at least 1".to_string()));
        }
        Ok(value)
    };

    let database_url = require("DATABASE_URL")?;
    let env = parse_environment(&or_default("REVAGG_ENV", "development"));
    let log_level = or_default("REVAGG_LOG_LEVEL", "info");

    let db_max_connections = parse_u32("REVAGG_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("REVAGG_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("REVAGG_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let llm_provider = or_default("REVAGG_LLM_PROVIDER", "groq")
        .parse::<LlmProvider>()
        .map_err(|e| invalid("REVAGG_LLM_PROVIDER", e.to_string()))?;
    let llm_base_url = or_default("REVAGG_LLM_BASE_URL", llm_provider.default_base_url());
    let llm_model = or_default("REVAGG_LLM_MODEL", llm_provider.default_model());
    let llm_api_key = match llm_provider {
        LlmProvider::Groq => Some(require("GROQ_API_KEY")?),
        LlmProvider::Ollama => lookup("GROQ_API_KEY").ok(),
    };
    let llm_request_timeout_secs = parse_u64("REVAGG_LLM_TIMEOUT_SECS", "60")?;
    let llm_max_concurrent = parse_positive_usize("REVAGG_LLM_MAX_CONCURRENT", "2")?;
    let llm_min_interval_ms = parse_u64("REVAGG_LLM_MIN_INTERVAL_MS", "0")?;
    let llm_max_retries = parse_u32("REVAGG_LLM_MAX_RETRIES", "3")?;
    let llm_retry_backoff_base_ms = parse_u64("REVAGG_LLM_RETRY_BACKOFF_BASE_MS", "1000")?;

    let stats_time_periods = parse_time_periods(&or_default("REVAGG_STATS_TIME_PERIODS", "all_time"))
        .map_err(|reason| invalid("REVAGG_STATS_TIME_PERIODS", reason))?;
    let stats_max_concurrent_units =
        parse_positive_usize("REVAGG_STATS_MAX_CONCURRENT_UNITS", "8")?;
    let stats_max_concurrent_products =
        parse_positive_usize("REVAGG_STATS_MAX_CONCURRENT_PRODUCTS", "1")?;
    let stats_cron = or_default("REVAGG_STATS_CRON", "0 0 3 * * *");

    Ok(AppConfig {
        database_url,
        env,
        log_level,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        llm_provider,
        llm_base_url,
        llm_model,
        llm_api_key,
        llm_request_timeout_secs,
        llm_max_concurrent,
        llm_min_interval_ms,
        llm_max_retries,
        llm_retry_backoff_base_ms,
        stats_time_periods,
        stats_max_concurrent_units,
        stats_max_concurrent_products,
        stats_cron,
    })
}

/// Parse a string into an `Environment` variant.
///
/// Unrecognized values default to `Environment::Development`.
fn parse_environment(s: &str) -> Environment {
    match s {
        "production" => Environment::Production,
        "test" => Environment::Test,
        _ => Environment::Development,
    }
}

/// Parse a comma-separated list of period tags, dropping duplicates while
/// keeping first-seen order. An empty list is rejected.
fn parse_time_periods(raw: &str) -> Result<Vec<TimePeriod>, String> {
    let mut periods = Vec::new();
    for tag in raw.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        let period = tag.parse::<TimePeriod>().map_err(|e| e.to_string())?;
        if !periods.contains(&period) {
            periods.push(period);
        }
    }
    if periods.is_empty() {
        return Err("at least one time period is required".to_string());
    }
    Ok(periods)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
