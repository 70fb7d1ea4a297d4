//! fanwatch-core/src/eventbus/stats_recorder.rs
//!
//! Single consumer that turns `NotificationSent` events into counter increments.
//! Drains whatever is still queued when shutdown is signalled.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use fanwatch_common::traits::repository_traits::StatsRepository;

use crate::eventbus::{EventBus, MonitorEvent};

pub async fn spawn_stats_recorder_task(
    event_bus: &EventBus,
    stats_repo: Arc<dyn StatsRepository>,
    buffer_size: usize,
) -> JoinHandle<()> {
    let rx = event_bus.subscribe(Some(buffer_size)).await;
    let shutdown_rx = event_bus.shutdown_rx.clone();

    tokio::spawn(run_stats_recorder(rx, shutdown_rx, stats_repo))
}

async fn run_stats_recorder(
    mut rx: mpsc::Receiver<MonitorEvent>,
    mut shutdown_rx: tokio::sync::watch::Receiver<bool>,
    stats_repo: Arc<dyn StatsRepository>,
) {
    info!("Stats recorder started.");

    loop {
        tokio::select! {
            biased;
            maybe_event = rx.recv() => {
                match maybe_event {
                    Some(event) => record(stats_repo.as_ref(), &event).await,
                    None => {
                        info!("Stats recorder channel closed => break from loop.");
                        break;
                    }
                }
            },
            Ok(_) = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    info!("Stats recorder shutting down => break from loop.");
                    break;
                }
            }
        }
    }

    while let Ok(event) = rx.try_recv() {
        record(stats_repo.as_ref(), &event).await;
    }

    info!("Stats recorder exited.");
}

async fn record(stats_repo: &dyn StatsRepository, event: &MonitorEvent) {
    if let MonitorEvent::NotificationSent { kind, guild_id, entity_id } = event {
        debug!("Counting {} notification for guild={} entity={}", kind, guild_id, entity_id);
        if let Err(e) = stats_repo.increment_stat(kind.stat_key()).await {
            error!("Failed to increment {}: {:?}", kind.stat_key(), e);
        }
    }
}
