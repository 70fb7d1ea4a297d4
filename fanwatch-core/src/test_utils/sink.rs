// fanwatch-core/src/test_utils/sink.rs

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use dashmap::DashSet;

use fanwatch_common::error::Error;
use fanwatch_common::models::{RichContent, WatchRegistration};
use fanwatch_common::traits::api::NotificationSink;

use crate::test_utils::store::InMemoryStore;

#[derive(Debug, Clone)]
pub struct SentNotification {
    pub channel_id: String,
    pub text: String,
    pub rich: RichContent,
    /// Store contents at the moment of the send, when the sink was built with a store.
    pub stored_at_send: Vec<WatchRegistration>,
}

/// Records every send. Sends to channels marked with `fail_channel` return an error and are
/// not recorded.
#[derive(Default)]
pub struct RecordingSink {
    sent: Mutex<Vec<SentNotification>>,
    failing_channels: DashSet<String>,
    store: Option<Arc<InMemoryStore>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_store(store: Arc<InMemoryStore>) -> Self {
        Self {
            store: Some(store),
            ..Default::default()
        }
    }

    pub fn fail_channel(&self, channel_id: &str) {
        self.failing_channels.insert(channel_id.to_string());
    }

    pub fn sent(&self) -> Vec<SentNotification> {
        self.sent.lock().map(|g| g.clone()).unwrap_or_default()
    }

    pub fn sent_to(&self, channel_id: &str) -> Vec<SentNotification> {
        self.sent()
            .into_iter()
            .filter(|n| n.channel_id == channel_id)
            .collect()
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn send(&self, channel_id: &str, text: &str, rich: &RichContent) -> Result<(), Error> {
        if self.failing_channels.contains(channel_id) {
            return Err(Error::Discord(format!("Missing access to channel {channel_id}")));
        }
        let stored_at_send = self
            .store
            .as_ref()
            .map(|s| s.all_registrations())
            .unwrap_or_default();
        if let Ok(mut guard) = self.sent.lock() {
            guard.push(SentNotification {
                channel_id: channel_id.to_string(),
                text: text.to_string(),
                rich: rich.clone(),
                stored_at_send,
            });
        }
        Ok(())
    }
}
