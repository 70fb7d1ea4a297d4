// tests/registration_tests.rs

mod test_utils;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::timeout;

use fanwatch_common::error::Error;
use fanwatch_common::models::{GuildSubscription, NotificationKind};
use fanwatch_common::traits::api::BotPresence;
use fanwatch_common::traits::repository_traits::{
    GuildSubscriptionRepository, NotificationOverrideRepository, WatchRepository,
};
use fanwatch_core::eventbus::stats_recorder::spawn_stats_recorder_task;
use fanwatch_core::eventbus::MonitorEvent;
use fanwatch_core::services::formatter::NotificationContext;
use fanwatch_core::tasks::guild_events::{handle_guild_event, spawn_guild_events_task};
use fanwatch_core::test_utils::FakePresence;

use test_utils::{account, eventually, live_stream, post, registration, Harness, WEB_URL};

fn harness_with_creators(names: &[(&str, &str)]) -> Harness {
    let h = Harness::new();
    for (entity, name) in names {
        h.upstream.set_account(account(entity, name, Some("https://cdn.example.test/a.png")));
    }
    h
}

#[tokio::test]
async fn test_add_registration_stores_account_details() {
    let h = harness_with_creators(&[("e1", "alice")]);
    let svc = h.registration_service(0);

    let out = svc
        .add_registration("g1", "https://fansly.com/alice/posts", "c1", Some("R1"))
        .await
        .unwrap();

    assert!(out.content_accessible);
    assert!(!out.replaced_existing);
    let stored = h.store.registration("g1", "e1").unwrap();
    assert_eq!(stored.username, "alice");
    assert_eq!(stored.notification_channel, "c1");
    assert_eq!(stored.mention_role.as_deref(), Some("R1"));
    assert_eq!(stored.mention_for(NotificationKind::Live), Some("R1"));
    assert_eq!(stored.mention_for(NotificationKind::Post), Some("R1"));
    assert_eq!(stored.avatar_location.as_deref(), Some("https://cdn.example.test/a.png"));
    assert!(stored.posts_enabled && stored.live_enabled);
    assert!(stored.never_notified_post());
}

#[tokio::test]
async fn test_invalid_username_never_reaches_upstream() {
    let h = Harness::new();
    let svc = h.registration_service(0);

    let res = svc.add_registration("g1", "not a name", "c1", None).await;

    assert!(matches!(res, Err(Error::InvalidInput(_))));
    assert_eq!(h.upstream.calls("account", "not a name"), 0);
}

#[tokio::test]
async fn test_unknown_creator_is_not_found() {
    let h = Harness::new();
    let res = h
        .registration_service(0)
        .add_registration("g1", "ghost", "c1", None)
        .await;
    assert!(matches!(res, Err(Error::NotFound(_))));
    assert!(h.store.all_registrations().is_empty());
}

#[tokio::test]
async fn test_guild_limit_blocks_new_creators_only() {
    let h = harness_with_creators(&[("e1", "alice"), ("e2", "bob")]);
    let svc = h.registration_service(1);

    svc.add_registration("g1", "alice", "c1", None).await.unwrap();

    let blocked = svc.add_registration("g1", "bob", "c1", None).await;
    assert!(matches!(blocked, Err(Error::LimitReached { limit: 1, .. })));

    let again = svc.add_registration("g1", "alice", "c2", None).await.unwrap();
    assert!(again.replaced_existing);
    assert_eq!(h.store.registration("g1", "e1").unwrap().notification_channel, "c2");

    // Other guilds have their own budget.
    svc.add_registration("g2", "bob", "c9", None).await.unwrap();
}

#[tokio::test]
async fn test_active_subscription_raises_limit_and_expired_does_not() {
    let h = harness_with_creators(&[("e1", "alice"), ("e2", "bob")]);
    let svc = h.registration_service(1);

    h.store
        .upsert_subscription(&GuildSubscription {
            guild_id: "g-old".into(),
            subscription_tier: "premium".into(),
            user_limit: 10,
            expires_at: Utc::now().timestamp() - 60,
        })
        .await
        .unwrap();
    assert_eq!(svc.effective_limit("g-old").await, 1);

    let sub = svc.set_guild_limit("g1", 2, 30).await.unwrap();
    assert_eq!(sub.subscription_tier, "manual-override");
    assert_eq!(svc.effective_limit("g1").await, 2);

    svc.add_registration("g1", "alice", "c1", None).await.unwrap();
    svc.add_registration("g1", "bob", "c1", None).await.unwrap();
    assert_eq!(h.store.count_for_guild("g1").await.unwrap(), 2);
}

#[tokio::test]
async fn test_permanent_override_outlives_a_decade() {
    let h = Harness::new();
    let sub = h.registration_service(1).set_guild_limit("g1", 0, 0).await.unwrap();
    assert!(sub.expires_at > Utc::now().timestamp() + 10 * 365 * 24 * 3600);
    assert_eq!(sub.user_limit, 0);
}

#[tokio::test]
async fn test_inaccessible_timeline_is_followed_then_probed_again() {
    let h = harness_with_creators(&[("e1", "alice")]);
    h.upstream.set_self_account(account("me", "service", None));
    h.upstream.gate_content_on_follow("e1");

    let out = h
        .registration_service(0)
        .add_registration("g1", "alice", "c1", None)
        .await
        .unwrap();

    assert!(out.content_accessible);
    assert_eq!(h.upstream.calls("follow", "e1"), 1);
    assert_eq!(h.upstream.calls("content", "e1"), 2);
    assert_eq!(h.upstream.following_list(), vec!["e1".to_string()]);
    assert!(h.store.registration("g1", "e1").unwrap().posts_enabled);
}

#[tokio::test]
async fn test_unfollowable_creator_is_added_live_only() {
    let h = harness_with_creators(&[("e1", "alice")]);
    h.upstream.set_self_account(account("me", "service", None));
    h.upstream.gate_content_on_follow("e1");
    h.upstream.reject_follow("e1");

    let out = h
        .registration_service(0)
        .add_registration("g1", "alice", "c1", None)
        .await
        .unwrap();

    assert!(!out.content_accessible);
    let stored = h.store.registration("g1", "e1").unwrap();
    assert!(!stored.posts_enabled);
    assert!(stored.live_enabled);
}

#[tokio::test]
async fn test_settings_changes_keep_watermarks() {
    let h = harness_with_creators(&[("e1", "alice")]);
    let svc = h.registration_service(0);
    svc.add_registration("g1", "alice", "c1", None).await.unwrap();

    h.store.advance_last_post_id("g1", "e1", "p7").await.unwrap();
    h.store.advance_last_stream_start("g1", "e1", 1234).await.unwrap();

    svc.set_channel("g1", "alice", NotificationKind::Live, "live-ch").await.unwrap();
    svc.set_mention_role("g1", "ALICE", NotificationKind::Post, Some("R2")).await.unwrap();
    svc.set_enabled("g1", "alice", NotificationKind::Post, false).await.unwrap();
    svc.set_live_image("g1", "alice", Some("https://img.example.test/banner.png")).await.unwrap();
    svc.add_registration("g1", "alice", "c5", None).await.unwrap();

    let stored = h.store.registration("g1", "e1").unwrap();
    assert_eq!(stored.last_post_id, "p7");
    assert_eq!(stored.last_stream_start, 1234);
    assert_eq!(stored.channel_for(NotificationKind::Live), "c5");
    assert_eq!(stored.notification_channel, "c5");
}

#[tokio::test]
async fn test_clearing_live_role_silences_live_pings_only() {
    let h = harness_with_creators(&[("e1", "alice")]);
    let svc = h.registration_service(0);
    svc.add_registration("g1", "alice", "c1", Some("R0")).await.unwrap();

    let stored = svc
        .set_mention_role("g1", "alice", NotificationKind::Live, None)
        .await
        .unwrap();

    assert_eq!(stored.mention_role.as_deref(), Some("R0"));
    let ctx = NotificationContext::new(&stored, None, WEB_URL);
    assert_eq!(ctx.render_live(&live_stream(1_700_000_000_000)).text, "");
    assert_eq!(ctx.render_post(&post("p1", 1_700_000_000), false).text, "<@&R0>");
}

#[tokio::test]
async fn test_setting_changes_on_unknown_creator_are_not_found() {
    let h = Harness::new();
    let res = h
        .registration_service(0)
        .set_enabled("g1", "nobody", NotificationKind::Live, false)
        .await;
    assert!(matches!(res, Err(Error::NotFound(_))));
}

#[tokio::test]
async fn test_invalid_live_image_is_rejected() {
    let h = harness_with_creators(&[("e1", "alice")]);
    let svc = h.registration_service(0);
    svc.add_registration("g1", "alice", "c1", None).await.unwrap();

    assert!(svc.set_live_image("g1", "alice", Some("not a url")).await.is_err());
    let cleared = svc.set_live_image("g1", "alice", None).await.unwrap();
    assert_eq!(cleared.live_image_url, None);
}

#[tokio::test]
async fn test_customization_and_removal() {
    let h = harness_with_creators(&[("e1", "alice")]);
    let svc = h.registration_service(0);
    svc.add_registration("g1", "alice", "c1", None).await.unwrap();

    svc.set_color("g1", "alice", NotificationKind::Live, "#0f0").await.unwrap();
    let ov = svc
        .set_message_template("g1", "alice", NotificationKind::Live, Some("{liveMention} on air"))
        .await
        .unwrap();
    assert_eq!(ov.live_embed_color, Some(0x00FF00));
    assert_eq!(ov.live_message_format.as_deref(), Some("{liveMention} on air"));

    assert!(svc.set_color("g1", "alice", NotificationKind::Post, "green").await.is_err());

    assert!(svc.remove_registration("g1", "@alice").await.unwrap());
    assert!(h.store.get_override("g1", "e1").await.unwrap().is_none());
    assert!(!svc.remove_registration("g1", "alice").await.unwrap());
}

#[tokio::test]
async fn test_guild_removal_tears_down_only_that_guild() {
    let h = Harness::new();
    h.store.put_registration(registration("g1", "e1", "alice", "c1"));
    h.store.put_registration(registration("g1", "e2", "bob", "c1"));
    h.store.put_registration(registration("g2", "e1", "alice", "c2"));
    let svc = h.registration_service(0);
    let presence = FakePresence::with_guilds(1);

    let event = MonitorEvent::GuildRemoved { guild_id: "g1".into() };
    handle_guild_event(&event, &svc, Some(&presence as &dyn BotPresence)).await;

    let left = h.store.all_registrations();
    assert_eq!(left.len(), 1);
    assert_eq!(left[0].guild_id, "g2");
    assert_eq!(presence.history(), vec!["1 server".to_string()]);
}

#[tokio::test]
async fn test_guild_events_task_reacts_to_published_events() {
    let h = Harness::new();
    h.store.put_registration(registration("g1", "e1", "alice", "c1"));
    let presence = Arc::new(FakePresence::with_guilds(3));

    let handle = spawn_guild_events_task(
        &h.event_bus,
        Arc::new(h.registration_service(0)),
        Some(presence.clone() as Arc<dyn BotPresence>),
    )
    .await;

    h.event_bus
        .publish(MonitorEvent::GuildJoined { guild_id: "g9".into() })
        .await;
    h.event_bus
        .publish(MonitorEvent::GuildRemoved { guild_id: "g1".into() })
        .await;

    let store = h.store.clone();
    assert!(eventually(|| store.all_registrations().is_empty()).await);
    let p = presence.clone();
    assert!(eventually(|| p.history().len() == 2).await);

    h.event_bus.shutdown();
    timeout(Duration::from_secs(2), handle).await.unwrap().unwrap();
}

#[tokio::test]
async fn test_stats_recorder_counts_sent_notifications() {
    let h = Harness::new();
    let handle = spawn_stats_recorder_task(&h.event_bus, h.store.clone(), 16).await;

    h.event_bus.publish_sent(NotificationKind::Live, "g1", "e1").await;
    h.event_bus.publish_sent(NotificationKind::Live, "g2", "e1").await;
    h.event_bus.publish_sent(NotificationKind::Post, "g1", "e1").await;
    h.event_bus
        .publish(MonitorEvent::GuildJoined { guild_id: "g3".into() })
        .await;

    h.event_bus.shutdown();
    timeout(Duration::from_secs(2), handle).await.unwrap().unwrap();

    assert_eq!(h.store.stat("total_live_sent"), 2);
    assert_eq!(h.store.stat("total_posts_sent"), 1);
}
