// tests/health_tests.rs

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::timeout;
use tokio_test::{assert_err, assert_ok};

use fanwatch_core::health::{HealthAggregator, HealthSnapshot};
use fanwatch_core::tasks::health_flush::spawn_health_flush_task;
use fanwatch_core::tasks::heartbeat::{spawn_heartbeat_task, write_heartbeat, HEARTBEAT_SERVICE, STATUS_OPERATIONAL};
use fanwatch_core::test_utils::InMemoryStore;

const SERVICE: &str = "creator_api";

#[tokio::test]
async fn test_flush_without_calls_writes_nothing() {
    let store = InMemoryStore::new();
    let agg = HealthAggregator::new();

    let snap = assert_ok!(agg.flush(SERVICE, &store).await);

    assert_eq!(snap, HealthSnapshot::default());
    assert_eq!(store.api_health(SERVICE), (0, 0));
}

#[tokio::test]
async fn test_flushes_accumulate_deltas() {
    let store = InMemoryStore::new();
    let agg = HealthAggregator::new();

    agg.record_call(true);
    agg.record_call(true);
    agg.record_call(false);
    agg.flush(SERVICE, &store).await.unwrap();

    agg.record_call(false);
    let second = assert_ok!(agg.flush(SERVICE, &store).await);

    assert_eq!(second, HealthSnapshot { total: 1, successful: 0 });
    assert_eq!(store.api_health(SERVICE), (4, 2));
    assert_eq!(agg.snapshot(), HealthSnapshot::default());
}

#[tokio::test]
async fn test_failed_flush_drops_the_interval() {
    let store = InMemoryStore::new();
    let agg = HealthAggregator::new();

    agg.record_call(true);
    agg.record_call(false);
    store.set_fail_health_writes(true);
    assert_err!(agg.flush(SERVICE, &store).await);
    assert_eq!(agg.snapshot(), HealthSnapshot::default());

    store.set_fail_health_writes(false);
    agg.record_call(true);
    agg.flush(SERVICE, &store).await.unwrap();

    assert_eq!(store.api_health(SERVICE), (1, 1));
}

#[tokio::test]
async fn test_flush_task_flushes_once_more_on_shutdown() {
    let store = Arc::new(InMemoryStore::new());
    let agg = HealthAggregator::new();
    agg.record_call(true);
    agg.record_call(true);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = spawn_health_flush_task(
        agg.clone(),
        store.clone(),
        SERVICE.to_string(),
        Duration::from_secs(3600),
        shutdown_rx,
    );

    shutdown_tx.send(true).unwrap();
    timeout(Duration::from_secs(2), handle).await.unwrap().unwrap();

    assert_eq!(store.api_health(SERVICE), (2, 2));
}

#[tokio::test]
async fn test_heartbeat_upserts_operational_row() {
    let store = InMemoryStore::new();

    write_heartbeat(&store).await.unwrap();
    let first = store.service_status(HEARTBEAT_SERVICE).expect("row written");
    assert_eq!(first.status, STATUS_OPERATIONAL);

    tokio::time::sleep(Duration::from_millis(5)).await;
    write_heartbeat(&store).await.unwrap();
    let second = store.service_status(HEARTBEAT_SERVICE).unwrap();
    assert!(second.last_heartbeat > first.last_heartbeat);
}

#[tokio::test]
async fn test_heartbeat_task_writes_immediately() {
    let store = Arc::new(InMemoryStore::new());
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let handle = spawn_heartbeat_task(store.clone(), Duration::from_secs(3600), shutdown_rx);

    let mut written = false;
    for _ in 0..100 {
        if store.service_status(HEARTBEAT_SERVICE).is_some() {
            written = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(written);

    shutdown_tx.send(true).unwrap();
    timeout(Duration::from_secs(2), handle).await.unwrap().unwrap();
}
