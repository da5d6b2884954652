use std::sync::{Arc, Weak};

use chrono::Utc;
use lib_paperstream::{StartStatus, StreamManager};
use tokio_cron_scheduler::{JobBuilder, JobScheduler};
use tracing::{debug, info};

/// Starts a cron job that calls `start` on every tick. A running stream makes
/// the call a no-op; a dead one gets reopened.
pub async fn start_self_heal(manager: &Arc<StreamManager>, schedule: &str) -> anyhow::Result<JobScheduler> {
    let scheduler = JobScheduler::new().await?;
    let manager: Weak<StreamManager> = Arc::downgrade(manager);

    let job = JobBuilder::new()
        .with_timezone(Utc)
        .with_cron_job_type()
        .with_schedule(schedule)?
        .with_run_async(Box::new(move |_uuid, _lock| {
            let manager = manager.clone();
            Box::pin(async move {
                let Some(manager) = manager.upgrade() else {
                    return;
                };
                match manager.start() {
                    StartStatus::Starting => info!("Self-heal restarted the stream"),
                    StartStatus::AlreadyRunning => debug!("Self-heal: stream already running"),
                }
            })
        }))
        .build()?;

    scheduler.add(job).await?;
    scheduler.start().await?;
    info!(schedule, "Self-heal job scheduled");
    Ok(scheduler)
}
