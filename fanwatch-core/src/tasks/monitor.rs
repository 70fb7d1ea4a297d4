// fanwatch-core/src/tasks/monitor.rs
//
// The polling driver. A scheduler task groups the enabled registrations by entity on every
// tick (the first tick fires immediately) and pushes one work item per entity into a bounded
// queue; a fixed pool of workers drains it. The scheduler does not wait for the workers, so
// cycles may overlap; the watermark writes make that harmless.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info};

use fanwatch_common::traits::repository_traits::WatchRepository;

use crate::Error;
use crate::services::grouping::{group_by_entity, EntityWorkItem};
use crate::services::monitor_service::MonitorService;

type SharedQueue = Arc<Mutex<mpsc::Receiver<EntityWorkItem>>>;

/// Loads, groups and enqueues one cycle. Blocks while the queue is full.
/// Returns the number of enqueued entities.
pub async fn dispatch_cycle(
    watch_repo: &dyn WatchRepository,
    tx: &mpsc::Sender<EntityWorkItem>,
) -> Result<usize, Error> {
    let registrations = watch_repo.list_enabled().await?;
    let items = group_by_entity(registrations);
    let count = items.len();

    for item in items {
        tx.send(item)
            .await
            .map_err(|_| Error::Platform("monitor queue closed".into()))?;
    }

    debug!("Dispatched {} entity work item(s)", count);
    Ok(count)
}

async fn wait_for_shutdown(rx: &mut watch::Receiver<bool>) {
    while !*rx.borrow() {
        if rx.changed().await.is_err() {
            return;
        }
    }
}

/// Spawns `count` workers sharing one queue. A worker stops when the queue closes or shutdown
/// is signalled; an item it already took is always finished.
pub fn spawn_workers(
    service: Arc<MonitorService>,
    queue: SharedQueue,
    count: usize,
    shutdown_rx: watch::Receiver<bool>,
) -> Vec<JoinHandle<()>> {
    (0..count.max(1))
        .map(|worker_id| {
            let service = service.clone();
            let queue = queue.clone();
            let mut shutdown_rx = shutdown_rx.clone();

            tokio::spawn(async move {
                debug!("[Worker {worker_id}] started");
                loop {
                    let next = tokio::select! {
                        biased;
                        _ = wait_for_shutdown(&mut shutdown_rx) => None,
                        item = async { queue.lock().await.recv().await } => item,
                    };
                    let Some(item) = next else { break };

                    let entity = item.entity_id.clone();
                    let outcome = service.process_item(item).await;
                    debug!("[Worker {worker_id}] entity {entity} => {:?}", outcome);
                }
                debug!("[Worker {worker_id}] exited");
            })
        })
        .collect()
}

/// Handles of the running monitor.
pub struct MonitorHandle {
    pub scheduler: JoinHandle<()>,
    pub workers: Vec<JoinHandle<()>>,
}

impl MonitorHandle {
    /// Waits for the scheduler and every worker to exit (after shutdown was signalled).
    pub async fn join(self) {
        let _ = self.scheduler.await;
        for w in self.workers {
            let _ = w.await;
        }
    }
}

pub fn spawn_monitor_task(
    watch_repo: Arc<dyn WatchRepository>,
    service: Arc<MonitorService>,
    period: Duration,
    worker_count: usize,
    queue_capacity: usize,
    shutdown_rx: watch::Receiver<bool>,
) -> MonitorHandle {
    let (tx, rx) = mpsc::channel::<EntityWorkItem>(queue_capacity.max(1));
    let workers = spawn_workers(service, Arc::new(Mutex::new(rx)), worker_count, shutdown_rx.clone());

    let mut shutdown_rx = shutdown_rx;
    let scheduler = tokio::spawn(async move {
        info!(
            "Monitor started: interval={}s workers={} queue={}",
            period.as_secs(),
            worker_count.max(1),
            queue_capacity.max(1)
        );
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = wait_for_shutdown(&mut shutdown_rx) => break,
                _ = ticker.tick() => {
                    tokio::select! {
                        biased;
                        _ = wait_for_shutdown(&mut shutdown_rx) => break,
                        res = dispatch_cycle(watch_repo.as_ref(), &tx) => {
                            if let Err(e) = res {
                                error!("Monitor cycle dispatch failed: {:?}", e);
                            }
                        }
                    }
                }
            }
        }
        info!("Monitor scheduler stopped.");
    });

    MonitorHandle { scheduler, workers }
}

/// One cycle start to finish: dispatch everything, then wait for the workers to drain it.
pub async fn run_single_cycle(
    watch_repo: &dyn WatchRepository,
    service: Arc<MonitorService>,
    worker_count: usize,
    queue_capacity: usize,
) -> Result<usize, Error> {
    let (tx, rx) = mpsc::channel::<EntityWorkItem>(queue_capacity.max(1));
    // Never signalled: the workers stop when the queue closes.
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);
    let workers = spawn_workers(service, Arc::new(Mutex::new(rx)), worker_count, shutdown_rx);

    let dispatched = dispatch_cycle(watch_repo, &tx).await;
    drop(tx);

    for w in workers {
        let _ = w.await;
    }
    dispatched
}
