// fanwatch-core/src/tasks/health_flush.rs

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::info;

use fanwatch_common::traits::repository_traits::StatsRepository;

use crate::health::HealthAggregator;

/// Periodically drains the upstream call counters into `api_health_stats`, with one last
/// flush on shutdown.
pub fn spawn_health_flush_task(
    aggregator: Arc<HealthAggregator>,
    stats_repo: Arc<dyn StatsRepository>,
    service_name: String,
    period: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately and there is nothing to flush yet.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let _ = aggregator.flush(&service_name, stats_repo.as_ref()).await;
                }
                Ok(_) = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        break;
                    }
                }
            }
        }

        let _ = aggregator.flush(&service_name, stats_repo.as_ref()).await;
        info!("Health flush task exited.");
    })
}
