//! Statistics command handlers for the CLI.
//!
//! These are called from `main` after the database pool and config are
//! established. `run` and `run-all` record a `stats_runs` row per product;
//! `show` and `runs` are read-only queries.

use std::fmt::Write as _;

use clap::Subcommand;
use revagg_core::{AppConfig, ProductStats, TimePeriod, ALL_PLATFORMS_TAG};
use revagg_db::RatingBucket;
use revagg_stats::{PipelineError, RunTrigger, StatsService};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Sub-commands available under `stats`.
#[derive(Debug, Subcommand)]
pub enum StatsCommands {
    /// Generate statistics for one product
    Run {
        /// Product id
        #[arg(long)]
        product: Uuid,
        /// Owning user id
        #[arg(long)]
        user: Uuid,
    },
    /// Generate statistics for every product
    RunAll,
    /// Print the stored statistics and rating histogram of a product
    Show {
        /// Product id
        #[arg(long)]
        product: Uuid,
        /// Only show one period (e.g. `all_time`)
        #[arg(long)]
        period: Option<TimePeriod>,
    },
    /// List recent stats runs
    Runs {
        /// Filter to a specific product
        #[arg(long)]
        product: Option<Uuid>,
        /// Maximum number of runs to show
        #[arg(long, default_value = "20")]
        limit: i64,
    },
}

/// Dispatch a `stats` sub-command.
///
/// # Errors
///
/// Returns an error if the LLM client cannot be built, a query fails, or a
/// run finishes with failed units.
pub(crate) async fn run(
    pool: &sqlx::PgPool,
    config: &AppConfig,
    command: StatsCommands,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    match command {
        StatsCommands::Run { product, user } => {
            let service = build_service(pool, config)?;
            run_product(&service, product, user, cancel).await
        }
        StatsCommands::RunAll => {
            let service = build_service(pool, config)?;
            run_all(&service, cancel).await
        }
        StatsCommands::Show { product, period } => show(pool, product, period).await,
        StatsCommands::Runs { product, limit } => list_runs(pool, product, limit).await,
    }
}

fn build_service(pool: &sqlx::PgPool, config: &AppConfig) -> anyhow::Result<StatsService> {
    let llm = revagg_analysis::LlmClient::new(revagg_analysis::LlmConfig::from_app_config(config))
        .map_err(|e| anyhow::anyhow!("failed to build LLM client: {e}"))?;
    Ok(StatsService::from_app_config(pool.clone(), llm, config))
}

async fn run_product(
    service: &StatsService,
    product_id: Uuid,
    user_id: Uuid,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    match service
        .run_for_product(product_id, user_id, RunTrigger::Cli, cancel)
        .await
    {
        Ok(summary) => {
            println!(
                "stats run complete: {} of {} units persisted",
                summary.persisted.len(),
                summary.total_units
            );
            for key in &summary.persisted {
                println!("  ok    {key}");
            }
            Ok(())
        }
        Err(PipelineError::UnitsFailed {
            failed,
            total,
            succeeded,
            failures,
        }) => {
            for key in &succeeded {
                println!("  ok    {key}");
            }
            for (key, err) in &failures {
                println!("  FAIL  {key}: {err}");
            }
            anyhow::bail!("{failed} of {total} analysis units failed")
        }
        Err(e) => Err(e.into()),
    }
}

async fn run_all(service: &StatsService, cancel: &CancellationToken) -> anyhow::Result<()> {
    let summary = service
        .run_for_all_products(RunTrigger::Cli, cancel)
        .await?;

    println!(
        "stats batch complete: products={} succeeded={} partial={} failed={} skipped={}",
        summary.products, summary.succeeded, summary.partial, summary.failed, summary.skipped
    );

    if summary.partial + summary.failed > 0 {
        anyhow::bail!(
            "{} of {} attempted products did not fully succeed",
            summary.partial + summary.failed,
            summary.attempted()
        );
    }
    Ok(())
}

async fn show(
    pool: &sqlx::PgPool,
    product_id: Uuid,
    period: Option<TimePeriod>,
) -> anyhow::Result<()> {
    let rows = revagg_db::list_product_stats(pool, product_id).await?;
    let mut shown = 0usize;
    for row in rows {
        let stats = ProductStats::try_from(row)?;
        if period.is_some_and(|p| p != stats.time_period) {
            continue;
        }
        let platform = (stats.platform != ALL_PLATFORMS_TAG).then_some(stats.platform.as_str());
        let ratings = revagg_db::list_rating_distribution(
            pool,
            product_id,
            platform,
            stats.time_period.current_window(),
        )
        .await?;
        print!("{}", format_stats(&stats));
        print!("{}", format_ratings(&ratings));
        shown += 1;
    }

    if shown == 0 {
        println!("no statistics stored for product {product_id}");
    }
    Ok(())
}

async fn list_runs(pool: &sqlx::PgPool, product_id: Option<Uuid>, limit: i64) -> anyhow::Result<()> {
    let runs = revagg_db::list_stats_runs(pool, product_id, limit).await?;
    if runs.is_empty() {
        println!("no stats runs recorded");
        return Ok(());
    }

    println!(
        "{:<6} {:<36} {:<10} {:<9} {:>5} {:>6}  started",
        "id", "product", "trigger", "status", "units", "failed"
    );
    for run in runs {
        println!(
            "{:<6} {:<36} {:<10} {:<9} {:>5} {:>6}  {}",
            run.id,
            run.product_id,
            run.trigger_source,
            run.status,
            run.total_units,
            run.failed_units,
            run.started_at.format("%Y-%m-%d %H:%M:%S")
        );
    }
    Ok(())
}

/// Human-readable block for one stats row.
fn format_stats(stats: &ProductStats) -> String {
    let mut out = format!("[{} / {}]\n", stats.platform, stats.time_period);
    let _ = writeln!(out, "  overall: {}", stats.overall_sentiment);
    write_list(&mut out, "highlights", &stats.key_highlights);
    write_list(&mut out, "pain points", &stats.pain_points);
    let _ = writeln!(out, "  sentiment (positive/negative/no opinion):");
    for count in &stats.sentiment_counts {
        let _ = writeln!(
            out,
            "    {:<16} {}/{}/{}",
            count.category, count.positive_count, count.negative_count, count.no_opinion_count
        );
    }
    out
}

/// One line per whole-star rating, most stars first.
fn format_ratings(buckets: &[RatingBucket]) -> String {
    if buckets.is_empty() {
        return "  ratings: none\n".to_string();
    }
    let mut out = String::from("  ratings:\n");
    for bucket in buckets.iter().rev() {
        let _ = writeln!(out, "    {} stars: {}", bucket.rating, bucket.count);
    }
    out
}

fn write_list(out: &mut String, label: &str, items: &[String]) {
    if items.is_empty() {
        let _ = writeln!(out, "  {label}: none");
        return;
    }
    let _ = writeln!(out, "  {label}:");
    for item in items {
        let _ = writeln!(out, "    - {item}");
    }
}
