mod stats;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use crate::stats::StatsCommands;

#[derive(Debug, Parser)]
#[command(name = "revagg")]
#[command(about = "Review aggregation command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Database maintenance
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
    /// Generate and inspect product statistics
    Stats {
        #[command(subcommand)]
        command: StatsCommands,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Apply pending migrations
    Migrate,
    /// Check that the database is reachable
    Ping,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("revagg: no command given; run with --help for usage");
        return Ok(());
    };

    let config = revagg_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = revagg_db::PoolConfig::from_app_config(&config);
    let pool = revagg_db::connect_pool(&config.database_url, pool_config).await?;

    match command {
        Commands::Db { command } => match command {
            DbCommands::Migrate => {
                let applied = revagg_db::run_migrations(&pool).await?;
                println!("migrations applied: {applied}");
            }
            DbCommands::Ping => {
                revagg_db::ping(&pool).await?;
                println!("database ok");
            }
        },
        Commands::Stats { command } => {
            let cancel = cancel_on_ctrl_c();
            stats::run(&pool, &config, command, &cancel).await?;
        }
    }

    Ok(())
}

/// Token cancelled on the first ctrl-c. Units already executing still finish
/// and persist; units not yet started are abandoned.
fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("ctrl-c received, finishing in-flight units");
            token.cancel();
        }
    });
    cancel
}

#[cfg(test)]
mod tests;
