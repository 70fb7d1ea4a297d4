// fanwatch-core/src/tasks/heartbeat.rs

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{error, info, trace};

use fanwatch_common::error::Error;
use fanwatch_common::models::ServiceStatus;
use fanwatch_common::traits::repository_traits::StatsRepository;

pub const HEARTBEAT_SERVICE: &str = "discord_bot";
pub const STATUS_OPERATIONAL: &str = "operational";

pub async fn write_heartbeat(stats_repo: &dyn StatsRepository) -> Result<(), Error> {
    let status = ServiceStatus {
        service_name: HEARTBEAT_SERVICE.to_string(),
        status: STATUS_OPERATIONAL.to_string(),
        last_heartbeat: Utc::now(),
        details: None,
    };
    stats_repo.upsert_service_status(&status).await
}

/// Upserts the liveness row immediately and then every `period`.
pub fn spawn_heartbeat_task(
    stats_repo: Arc<dyn StatsRepository>,
    period: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(period);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match write_heartbeat(stats_repo.as_ref()).await {
                        Ok(()) => trace!("Heartbeat written."),
                        Err(e) => error!("Error writing heartbeat: {:?}", e),
                    }
                }
                Ok(_) = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        break;
                    }
                }
            }
        }
        info!("Heartbeat task exited.");
    })
}
