// fanwatch-core/src/services/detectors/live.rs

use tracing::{debug, error, info};

use fanwatch_common::models::{NotificationKind, StreamState, UpstreamSnapshot, WatchRegistration};

use crate::services::detectors::{DetectionReport, DetectorContext};
use crate::services::formatter::NotificationContext;
use crate::services::grouping::EntityWorkItem;

/// Announces a stream once per start timestamp per registration.
pub struct LiveDetector {
    ctx: DetectorContext,
}

/// True when the stream is live and started after the registration's last announced start.
pub fn is_new_stream(stream: &StreamState, reg: &WatchRegistration) -> bool {
    stream.is_live() && stream.started_at > reg.last_stream_start
}

impl LiveDetector {
    pub fn new(ctx: DetectorContext) -> Self {
        Self { ctx }
    }

    /// Runs against the stream state in `snapshot`; a snapshot without stream state is a no-op.
    pub async fn detect(&self, item: &EntityWorkItem, snapshot: &UpstreamSnapshot) -> DetectionReport {
        let mut report = DetectionReport::default();
        let Some(stream) = snapshot.stream.as_ref() else {
            return report;
        };

        let candidates: Vec<&WatchRegistration> = item
            .enabled_for(NotificationKind::Live)
            .into_iter()
            .filter(|r| is_new_stream(stream, r))
            .collect();
        if candidates.is_empty() {
            return report;
        }

        info!(
            "Entity {} went live (started_at={}), {} registration(s) to notify",
            item.entity_id,
            stream.started_at,
            candidates.len()
        );
        let overrides = self.ctx.overrides_for(&item.entity_id).await;

        for reg in candidates {
            report.fired += 1;

            match self
                .ctx
                .watch_repo
                .advance_last_stream_start(&reg.guild_id, &reg.entity_id, stream.started_at)
                .await
            {
                Ok(true) => {}
                Ok(false) => {
                    debug!(
                        "Stream start {} already recorded for guild={} entity={}",
                        stream.started_at, reg.guild_id, reg.entity_id
                    );
                    report.skipped += 1;
                    continue;
                }
                Err(e) => {
                    error!(
                        "Error updating last stream start for {} in guild {}: {:?}",
                        reg.username, reg.guild_id, e
                    );
                    report.skipped += 1;
                    continue;
                }
            }

            let rendered = NotificationContext::new(reg, overrides.get(&reg.guild_id), &self.ctx.web_url)
                .render_live(stream);

            if self.ctx.deliver(NotificationKind::Live, reg, &rendered).await {
                report.sent += 1;
            } else {
                report.failed += 1;
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fanwatch_common::models::StreamStatus;

    fn stream(status: StreamStatus, started_at: i64) -> StreamState {
        StreamState { status, started_at, title: None, viewer_count: None }
    }

    #[test]
    fn test_is_new_stream_boundary() {
        let mut reg = WatchRegistration::new("g", "e", "u", "c");
        reg.last_stream_start = 100;

        assert!(!is_new_stream(&stream(StreamStatus::Live, 100), &reg));
        assert!(is_new_stream(&stream(StreamStatus::Live, 101), &reg));
        assert!(!is_new_stream(&stream(StreamStatus::Starting, 101), &reg));
        assert!(!is_new_stream(&stream(StreamStatus::Offline, 500), &reg));
    }
}
