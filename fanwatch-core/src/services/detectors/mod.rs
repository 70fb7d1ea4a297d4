// fanwatch-core/src/services/detectors/mod.rs
//
// Change detectors compare one fetched snapshot against every registration's watermark.
// The watermark is advanced before the send, and only a write that actually changed the row
// leads to a send, so re-running a detector on the same snapshot sends nothing new.

pub mod content;
pub mod live;

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{error, warn};

use fanwatch_common::models::{NotificationKind, NotificationOverride, OutboundNotification, WatchRegistration};
use fanwatch_common::traits::api::NotificationSink;
use fanwatch_common::traits::repository_traits::{NotificationOverrideRepository, WatchRepository};

use crate::eventbus::EventBus;

pub use content::ContentDetector;
pub use live::LiveDetector;

/// What one detector pass did for one entity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DetectionReport {
    /// Registrations whose watermark said "new".
    pub fired: usize,
    pub sent: usize,
    pub failed: usize,
    /// Candidates dropped because the watermark write failed or had already been applied.
    pub skipped: usize,
}

/// Collaborators shared by both detectors.
#[derive(Clone)]
pub struct DetectorContext {
    pub watch_repo: Arc<dyn WatchRepository>,
    pub override_repo: Arc<dyn NotificationOverrideRepository>,
    pub sink: Arc<dyn NotificationSink>,
    pub event_bus: EventBus,
    pub web_url: String,
}

impl DetectorContext {
    /// Customizations for every guild watching `entity_id`. A lookup failure only costs the
    /// customization, never the notification.
    pub(crate) async fn overrides_for(&self, entity_id: &str) -> HashMap<String, NotificationOverride> {
        match self.override_repo.list_overrides_for_entity(entity_id).await {
            Ok(map) => map,
            Err(e) => {
                warn!("Could not load notification overrides for entity {}: {:?}", entity_id, e);
                HashMap::new()
            }
        }
    }

    /// Sends one rendered notification. A failure is logged with its full addressing and
    /// reported back; it never propagates.
    pub(crate) async fn deliver(
        &self,
        kind: NotificationKind,
        reg: &WatchRegistration,
        notification: &OutboundNotification,
    ) -> bool {
        match self
            .sink
            .send(&notification.channel_id, &notification.text, &notification.rich)
            .await
        {
            Ok(()) => {
                self.event_bus.publish_sent(kind, &reg.guild_id, &reg.entity_id).await;
                true
            }
            Err(e) => {
                error!(
                    "Failed to send {} notification for {} (guild={}, entity={}, channel={}): {:?}",
                    kind, reg.username, reg.guild_id, reg.entity_id, notification.channel_id, e
                );
                false
            }
        }
    }
}
