// tests/detector_tests.rs

mod test_utils;

use fanwatch_common::models::{NotificationOverride, StreamState, UpstreamSnapshot};
use fanwatch_common::traits::repository_traits::NotificationOverrideRepository;
use fanwatch_core::services::detectors::{ContentDetector, DetectionReport, LiveDetector};
use fanwatch_core::services::grouping::EntityWorkItem;

use test_utils::{live_stream, post, registration, Harness};

fn item_from_store(h: &Harness, entity_id: &str) -> EntityWorkItem {
    let regs = h
        .store
        .all_registrations()
        .into_iter()
        .filter(|r| r.entity_id == entity_id)
        .collect();
    EntityWorkItem::new(regs).expect("at least one registration")
}

fn live_snapshot(entity_id: &str, stream: StreamState) -> UpstreamSnapshot {
    UpstreamSnapshot {
        entity_id: entity_id.to_string(),
        stream: Some(stream),
        content: vec![],
    }
}

#[tokio::test]
async fn test_live_fires_only_for_newer_start() {
    let h = Harness::new();
    let mut reg = registration("g1", "e1", "alice", "c1");
    reg.last_stream_start = 100;
    h.store.put_registration(reg);

    let detector = LiveDetector::new(h.detector_context());

    let same = detector
        .detect(&item_from_store(&h, "e1"), &live_snapshot("e1", live_stream(100)))
        .await;
    assert_eq!(same, DetectionReport::default());
    assert!(h.sink.sent().is_empty());

    let newer = detector
        .detect(&item_from_store(&h, "e1"), &live_snapshot("e1", live_stream(101)))
        .await;
    assert_eq!(newer.sent, 1);
    assert_eq!(h.store.registration("g1", "e1").unwrap().last_stream_start, 101);

    let sent = h.sink.sent_to("c1");
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].rich.title, "alice is now live!");
    assert_eq!(
        sent[0].rich.url.as_deref(),
        Some("https://creators.example.test/live/alice")
    );
}

#[tokio::test]
async fn test_live_watermark_is_persisted_before_send() {
    let h = Harness::new();
    h.store.put_registration(registration("g1", "e1", "alice", "c1"));

    LiveDetector::new(h.detector_context())
        .detect(&item_from_store(&h, "e1"), &live_snapshot("e1", live_stream(5_000)))
        .await;

    let sent = h.sink.sent();
    assert_eq!(sent.len(), 1);
    let stored = sent[0]
        .stored_at_send
        .iter()
        .find(|r| r.guild_id == "g1")
        .expect("registration visible at send time");
    assert_eq!(stored.last_stream_start, 5_000);
}

#[tokio::test]
async fn test_live_rerun_with_stale_item_sends_nothing() {
    let h = Harness::new();
    h.store.put_registration(registration("g1", "e1", "alice", "c1"));
    let detector = LiveDetector::new(h.detector_context());

    // Both runs see the watermark as it was before the first send, like two overlapping cycles.
    let stale = item_from_store(&h, "e1");
    let snapshot = live_snapshot("e1", live_stream(42));

    let first = detector.detect(&stale, &snapshot).await;
    let second = detector.detect(&stale, &snapshot).await;

    assert_eq!(first.sent, 1);
    assert_eq!(second, DetectionReport { fired: 1, sent: 0, failed: 0, skipped: 1 });
    assert_eq!(h.sink.sent().len(), 1);
}

#[tokio::test]
async fn test_live_ignores_disabled_and_not_live() {
    let h = Harness::new();
    let mut off = registration("g1", "e1", "alice", "c1");
    off.live_enabled = false;
    h.store.put_registration(off);
    h.store.put_registration(registration("g2", "e1", "alice", "c2"));

    let detector = LiveDetector::new(h.detector_context());

    let mut starting = live_stream(10);
    starting.status = fanwatch_common::models::StreamStatus::Starting;
    let r = detector
        .detect(&item_from_store(&h, "e1"), &live_snapshot("e1", starting))
        .await;
    assert_eq!(r.fired, 0);

    let r = detector
        .detect(&item_from_store(&h, "e1"), &live_snapshot("e1", live_stream(10)))
        .await;
    assert_eq!(r.sent, 1);
    assert!(h.sink.sent_to("c1").is_empty());
    assert_eq!(h.sink.sent_to("c2").len(), 1);
}

#[tokio::test]
async fn test_watermark_failure_skips_only_that_guild() {
    let h = Harness::new();
    h.store.put_registration(registration("g1", "e1", "alice", "c1"));
    h.store.put_registration(registration("g2", "e1", "alice", "c2"));
    h.store.fail_watermarks_for("g2");

    let r = LiveDetector::new(h.detector_context())
        .detect(&item_from_store(&h, "e1"), &live_snapshot("e1", live_stream(77)))
        .await;

    assert_eq!(r, DetectionReport { fired: 2, sent: 1, failed: 0, skipped: 1 });
    assert_eq!(h.sink.sent_to("c1").len(), 1);
    assert!(h.sink.sent_to("c2").is_empty());
}

#[tokio::test]
async fn test_content_first_post_then_no_refire() {
    let h = Harness::new();
    h.store.put_registration(registration("g1", "e1", "alice", "c1"));
    let detector = ContentDetector::new(h.detector_context());

    let snapshot = UpstreamSnapshot {
        entity_id: "e1".into(),
        stream: None,
        content: vec![post("p2", 200), post("p1", 100)],
    };

    let first = detector.detect(&item_from_store(&h, "e1"), &snapshot).await;
    assert_eq!(first.sent, 1);
    assert_eq!(h.store.registration("g1", "e1").unwrap().last_post_id, "p2");

    let sent = h.sink.sent();
    assert_eq!(sent[0].rich.title, "alice posted (first update for this server)");
    assert_eq!(
        sent[0].rich.url.as_deref(),
        Some("https://creators.example.test/post/p2")
    );

    let again = detector.detect(&item_from_store(&h, "e1"), &snapshot).await;
    assert_eq!(again, DetectionReport::default());

    let newer = UpstreamSnapshot {
        content: vec![post("p3", 300), post("p2", 200)],
        ..snapshot
    };
    let third = detector.detect(&item_from_store(&h, "e1"), &newer).await;
    assert_eq!(third.sent, 1);
    assert_eq!(h.sink.sent()[1].rich.title, "New post from alice");
}

#[tokio::test]
async fn test_content_legacy_sentinel_counts_as_first_post() {
    let h = Harness::new();
    let mut reg = registration("g1", "e1", "alice", "c1");
    reg.last_post_id = "0".into();
    h.store.put_registration(reg);

    let snapshot = UpstreamSnapshot {
        entity_id: "e1".into(),
        stream: None,
        content: vec![post("p9", 900)],
    };
    ContentDetector::new(h.detector_context())
        .detect(&item_from_store(&h, "e1"), &snapshot)
        .await;

    assert!(h.sink.sent()[0].rich.title.contains("first update"));
}

#[tokio::test]
async fn test_content_empty_timeline_is_a_no_op() {
    let h = Harness::new();
    h.store.put_registration(registration("g1", "e1", "alice", "c1"));

    let snapshot = UpstreamSnapshot { entity_id: "e1".into(), stream: None, content: vec![] };
    let r = ContentDetector::new(h.detector_context())
        .detect(&item_from_store(&h, "e1"), &snapshot)
        .await;

    assert_eq!(r, DetectionReport::default());
    assert_eq!(h.store.registration("g1", "e1").unwrap().last_post_id, "");
}

#[tokio::test]
async fn test_overrides_apply_per_guild() {
    let h = Harness::new();
    let mut reg = registration("g1", "e1", "alice", "c1");
    reg.post_mention_role = Some("R9".into());
    reg.post_notification_channel = Some("posts".into());
    h.store.put_registration(reg);
    h.store.put_registration(registration("g2", "e1", "alice", "c2"));

    let mut ov = NotificationOverride::new("g1", "e1");
    ov.post_message_format = Some("{postMention} {username} dropped something".into());
    ov.post_embed_color = Some(0x00FF00);
    h.store.upsert_override(&ov).await.unwrap();

    let snapshot = UpstreamSnapshot {
        entity_id: "e1".into(),
        stream: None,
        content: vec![post("p1", 1)],
    };
    ContentDetector::new(h.detector_context())
        .detect(&item_from_store(&h, "e1"), &snapshot)
        .await;

    let customized = h.sink.sent_to("posts");
    assert_eq!(customized.len(), 1);
    assert_eq!(customized[0].text, "<@&R9> alice dropped something");
    assert_eq!(customized[0].rich.color, 0x00FF00);

    let plain = h.sink.sent_to("c2");
    assert_eq!(plain.len(), 1);
    assert_eq!(plain[0].text, "");
    assert_eq!(plain[0].rich.color, fanwatch_core::services::formatter::DEFAULT_POST_COLOR);
}
