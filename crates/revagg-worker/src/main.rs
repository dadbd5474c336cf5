mod scheduler;

use std::sync::Arc;

use revagg_analysis::{LlmClient, LlmConfig};
use revagg_stats::StatsService;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use crate::scheduler::StatsJob;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = revagg_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = revagg_db::PoolConfig::from_app_config(&config);
    let pool = revagg_db::connect_pool(&config.database_url, pool_config).await?;
    revagg_db::run_migrations(&pool).await?;

    let llm = LlmClient::new(LlmConfig::from_app_config(&config))?;
    let service = Arc::new(StatsService::from_app_config(pool, llm, &config));
    let cancel = CancellationToken::new();
    let job = StatsJob::new(service, cancel.clone());

    let mut scheduler = scheduler::build_scheduler(&config.stats_cron, job.clone()).await?;
    tracing::info!(env = ?config.env, cron = %config.stats_cron, "revagg worker started");

    shutdown_signal().await;

    cancel.cancel();
    job.drain().await;
    scheduler.shutdown().await?;
    tracing::info!("revagg worker stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, finishing in-flight stats units");
}
