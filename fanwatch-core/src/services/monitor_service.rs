// fanwatch-core/src/services/monitor_service.rs
//
// Per-entity work done by a monitor worker: avatar refresh, then live detection, then
// content detection. Each step logs its own failures and never aborts the next one.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, warn};

use fanwatch_common::models::{NotificationKind, UpstreamSnapshot};
use fanwatch_common::traits::api::UpstreamApi;
use fanwatch_common::traits::repository_traits::WatchRepository;

use crate::services::detectors::{ContentDetector, DetectionReport, DetectorContext, LiveDetector};
use crate::services::grouping::EntityWorkItem;

/// Result of processing one work item. `None` means the detector did not run, either because
/// no registration had the kind enabled or because the upstream fetch failed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ItemOutcome {
    pub avatar_refreshed: bool,
    pub live: Option<DetectionReport>,
    pub content: Option<DetectionReport>,
}

pub struct MonitorService {
    upstream: Arc<dyn UpstreamApi>,
    watch_repo: Arc<dyn WatchRepository>,
    live: LiveDetector,
    content: ContentDetector,
    avatar_refresh_interval: Duration,
}

impl MonitorService {
    pub fn new(
        upstream: Arc<dyn UpstreamApi>,
        detectors: DetectorContext,
        avatar_refresh_interval: Duration,
    ) -> Self {
        Self {
            upstream,
            watch_repo: detectors.watch_repo.clone(),
            live: LiveDetector::new(detectors.clone()),
            content: ContentDetector::new(detectors),
            avatar_refresh_interval,
        }
    }

    pub async fn process_item(&self, mut item: EntityWorkItem) -> ItemOutcome {
        let mut outcome = ItemOutcome {
            avatar_refreshed: self.refresh_avatar_if_stale(&mut item).await,
            ..Default::default()
        };

        let mut snapshot = UpstreamSnapshot {
            entity_id: item.entity_id.clone(),
            stream: None,
            content: Vec::new(),
        };

        if !item.enabled_for(NotificationKind::Live).is_empty() {
            match self.upstream.fetch_stream_state(&item.entity_id).await {
                Ok(state) => {
                    snapshot.stream = Some(state);
                    outcome.live = Some(self.live.detect(&item, &snapshot).await);
                }
                Err(e) => warn!(
                    "Error fetching stream info for {} ({}): {:?}",
                    item.primary().username, item.entity_id, e
                ),
            }
        }

        if !item.enabled_for(NotificationKind::Post).is_empty() {
            match self.upstream.fetch_latest_content(&item.entity_id).await {
                Ok(items) => {
                    snapshot.content = items;
                    outcome.content = Some(self.content.detect(&item, &snapshot).await);
                }
                Err(e) => warn!(
                    "Error fetching posts for {} ({}): {:?}",
                    item.primary().username, item.entity_id, e
                ),
            }
        }

        outcome
    }

    /// Refreshes the cached avatar of every registration in the group when the primary's copy
    /// is older than the refresh interval. Returns whether a refresh was written.
    async fn refresh_avatar_if_stale(&self, item: &mut EntityWorkItem) -> bool {
        let now = Utc::now().timestamp();
        let max_age = self.avatar_refresh_interval.as_secs() as i64;
        if !item.primary().avatar_is_stale(now, max_age) {
            return false;
        }

        let username = item.primary().username.clone();
        let account = match self.upstream.fetch_account_info(&username).await {
            Ok(a) => a,
            Err(e) => {
                warn!("Error refreshing avatar for {}: {:?}", username, e);
                return false;
            }
        };

        // No avatar upstream: keep what is cached but still stamp the refresh time.
        let location = account
            .primary_avatar()
            .map(str::to_string)
            .or_else(|| item.primary().avatar_location.clone())
            .unwrap_or_default();

        let mut wrote_any = false;
        for reg in item.registrations.iter_mut() {
            match self
                .watch_repo
                .update_avatar(&reg.guild_id, &reg.entity_id, &location, now)
                .await
            {
                Ok(()) => {
                    reg.avatar_location = Some(location.clone()).filter(|l| !l.is_empty());
                    reg.avatar_location_updated_at = now;
                    wrote_any = true;
                }
                Err(e) => warn!(
                    "Error updating avatar for {} in guild {}: {:?}",
                    reg.username, reg.guild_id, e
                ),
            }
        }

        debug!("Avatar refresh for {} done (written={})", username, wrote_any);
        wrote_any
    }
}
