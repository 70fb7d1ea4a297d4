// tests/test_utils/mod.rs
//
// Fixtures shared by the integration tests. Every test builds its own harness, so nothing
// leaks between tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use fanwatch_common::models::{AccountInfo, ContentItem, StreamState, StreamStatus, WatchRegistration};
use fanwatch_core::eventbus::EventBus;
use fanwatch_core::services::detectors::DetectorContext;
use fanwatch_core::services::monitor_service::MonitorService;
use fanwatch_core::services::registration_service::RegistrationService;
use fanwatch_core::test_utils::{FakeUpstream, InMemoryStore, RecordingSink};

pub const WEB_URL: &str = "https://creators.example.test";
pub const DAY: Duration = Duration::from_secs(24 * 3600);

pub struct Harness {
    pub store: Arc<InMemoryStore>,
    pub upstream: Arc<FakeUpstream>,
    pub sink: Arc<RecordingSink>,
    pub event_bus: EventBus,
}

impl Harness {
    pub fn new() -> Self {
        let store = Arc::new(InMemoryStore::new());
        Self {
            sink: Arc::new(RecordingSink::with_store(store.clone())),
            store,
            upstream: Arc::new(FakeUpstream::new()),
            event_bus: EventBus::new(),
        }
    }

    pub fn detector_context(&self) -> DetectorContext {
        DetectorContext {
            watch_repo: self.store.clone(),
            override_repo: self.store.clone(),
            sink: self.sink.clone(),
            event_bus: self.event_bus.clone(),
            web_url: WEB_URL.to_string(),
        }
    }

    pub fn monitor_service(&self) -> MonitorService {
        MonitorService::new(self.upstream.clone(), self.detector_context(), DAY)
    }

    pub fn registration_service(&self, default_limit: i64) -> RegistrationService {
        RegistrationService::new(
            self.store.clone(),
            self.store.clone(),
            self.store.clone(),
            self.upstream.clone(),
            default_limit,
        )
    }
}

/// A stored registration with both kinds enabled and a fresh avatar.
pub fn registration(guild_id: &str, entity_id: &str, username: &str, channel_id: &str) -> WatchRegistration {
    WatchRegistration::new(guild_id, entity_id, username, channel_id)
}

pub fn live_stream(started_at: i64) -> StreamState {
    StreamState {
        status: StreamStatus::Live,
        started_at,
        title: Some("late night stream".into()),
        viewer_count: Some(12),
    }
}

pub fn post(id: &str, created_at: i64) -> ContentItem {
    ContentItem {
        id: id.to_string(),
        content: format!("post {id}"),
        created_at,
    }
}

pub fn account(entity_id: &str, username: &str, avatar: Option<&str>) -> AccountInfo {
    AccountInfo {
        entity_id: entity_id.to_string(),
        username: username.to_string(),
        display_name: None,
        avatar_refs: avatar.map(|a| vec![a.to_string()]).unwrap_or_default(),
    }
}

/// Polls `check` until it holds or a second has passed.
pub async fn eventually<F>(mut check: F) -> bool
where
    F: FnMut() -> bool,
{
    for _ in 0..100 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}
