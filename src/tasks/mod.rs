use anyhow::Result;
use tokio_cron_scheduler::{Job, JobScheduler};

use crate::state::AppState;

pub mod cleanup;

/// Hourly, on the hour.
const CLEANUP_SCHEDULE: &str = "0 0 * * * *";

pub async fn start_scheduler(state: AppState) -> Result<JobScheduler> {
    let scheduler = JobScheduler::new().await?;

    let cleanup_job = Job::new_async(CLEANUP_SCHEDULE, move |_uuid, _lock| {
        let state = state.clone();
        Box::pin(async move {
            if let Err(e) = cleanup::cleanup_expired_jobs(
                &state.db,
                &state.storage,
                state.config.file_retention_days,
            )
            .await
            {
                tracing::error!("Scheduled cleanup failed: {}", e);
            }
        })
    })?;
    scheduler.add(cleanup_job).await?;

    scheduler.start().await?;

    Ok(scheduler)
}
