// fanwatch-core/src/services/detectors/content.rs

use tracing::{debug, error, info};

use fanwatch_common::models::{NotificationKind, UpstreamSnapshot, WatchRegistration};

use crate::services::detectors::{DetectionReport, DetectorContext};
use crate::services::formatter::NotificationContext;
use crate::services::grouping::EntityWorkItem;

/// Announces the newest content item once per registration.
pub struct ContentDetector {
    ctx: DetectorContext,
}

impl ContentDetector {
    pub fn new(ctx: DetectorContext) -> Self {
        Self { ctx }
    }

    /// Looks only at the newest item in `snapshot`. No items means nothing to do.
    pub async fn detect(&self, item: &EntityWorkItem, snapshot: &UpstreamSnapshot) -> DetectionReport {
        let mut report = DetectionReport::default();
        let Some(newest) = snapshot.newest_item() else {
            return report;
        };

        let candidates: Vec<&WatchRegistration> = item
            .enabled_for(NotificationKind::Post)
            .into_iter()
            .filter(|r| r.last_post_id != newest.id)
            .collect();
        if candidates.is_empty() {
            return report;
        }

        let overrides = self.ctx.overrides_for(&item.entity_id).await;

        for reg in candidates {
            report.fired += 1;

            match self
                .ctx
                .watch_repo
                .advance_last_post_id(&reg.guild_id, &reg.entity_id, &newest.id)
                .await
            {
                Ok(true) => {}
                Ok(false) => {
                    debug!(
                        "Post {} already recorded for guild={} entity={}",
                        newest.id, reg.guild_id, reg.entity_id
                    );
                    report.skipped += 1;
                    continue;
                }
                Err(e) => {
                    error!(
                        "Error updating last post id for {} in guild {}: {:?}",
                        reg.username, reg.guild_id, e
                    );
                    report.skipped += 1;
                    continue;
                }
            }

            let first_post = reg.never_notified_post();
            info!(
                "Sending post notification for {} to guild {}. First post: {}",
                reg.username, reg.guild_id, first_post
            );

            let rendered = NotificationContext::new(reg, overrides.get(&reg.guild_id), &self.ctx.web_url)
                .render_post(newest, first_post);

            if self.ctx.deliver(NotificationKind::Post, reg, &rendered).await {
                report.sent += 1;
            } else {
                report.failed += 1;
            }
        }

        report
    }
}
