//! Background job scheduler.
//!
//! Registers the recurring stats batch with a [`JobScheduler`]. Only one
//! batch runs at a time; a tick that fires while the previous batch is still
//! running is skipped.

use std::sync::Arc;

use revagg_stats::{RunTrigger, StatsService};
use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};
use tokio_util::sync::CancellationToken;

/// Shared state of the stats job.
#[derive(Clone)]
pub struct StatsJob {
    service: Arc<StatsService>,
    cancel: CancellationToken,
    running: Arc<Mutex<()>>,
}

impl StatsJob {
    pub fn new(service: Arc<StatsService>, cancel: CancellationToken) -> Self {
        Self {
            service,
            cancel,
            running: Arc::new(Mutex::new(())),
        }
    }

    /// Waits for an in-flight batch to finish.
    pub async fn drain(&self) {
        let _guard = self.running.lock().await;
    }

    async fn run_once(&self) {
        if self.cancel.is_cancelled() {
            tracing::info!("scheduler: shutting down; skipping stats batch");
            return;
        }
        let Ok(_guard) = self.running.try_lock() else {
            tracing::warn!("scheduler: previous stats batch still running; skipping tick");
            return;
        };

        tracing::info!("scheduler: starting stats batch");
        match self
            .service
            .run_for_all_products(RunTrigger::Scheduler, &self.cancel)
            .await
        {
            Ok(summary) => tracing::info!(
                products = summary.products,
                succeeded = summary.succeeded,
                partial = summary.partial,
                failed = summary.failed,
                skipped = summary.skipped,
                "scheduler: stats batch complete"
            ),
            Err(e) => tracing::error!(error = %e, "scheduler: stats batch failed"),
        }
    }
}

/// Builds and starts the background job scheduler.
///
/// Returns the running [`JobScheduler`] handle, which must be kept alive for
/// the lifetime of the process.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised,
/// `cron` is not a valid schedule, or the scheduler fails to start.
pub async fn build_scheduler(cron: &str, job: StatsJob) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;
    register_stats_job(&scheduler, cron, job).await?;
    scheduler.start().await?;
    Ok(scheduler)
}

/// Register the stats batch on `cron` (six-field, UTC).
async fn register_stats_job(
    scheduler: &JobScheduler,
    cron: &str,
    job: StatsJob,
) -> Result<(), JobSchedulerError> {
    let cron_job = Job::new_async(cron, move |_uuid, _lock| {
        let job = job.clone();
        Box::pin(async move {
            job.run_once().await;
        })
    })?;

    scheduler.add(cron_job).await?;
    tracing::info!(cron = %cron, "scheduler: registered stats job");
    Ok(())
}
