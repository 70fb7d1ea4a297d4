// File: fanwatch-common/src/models/watch.rs

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sentinel stored in `last_post_id` by older rows before the column became nullable text.
pub const LEGACY_POST_SENTINEL: &str = "0";

/// The two notification kinds a registration can opt into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Live,
    Post,
}

impl NotificationKind {
    /// The placeholder an operator can put into a custom template to position the mention.
    pub fn mention_placeholder(&self) -> &'static str {
        match self {
            NotificationKind::Live => "{liveMention}",
            NotificationKind::Post => "{postMention}",
        }
    }

    /// Key of the `system_stats` counter bumped after a successful send.
    pub fn stat_key(&self) -> &'static str {
        match self {
            NotificationKind::Live => "total_live_sent",
            NotificationKind::Post => "total_posts_sent",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotificationKind::Live => write!(f, "live stream"),
            NotificationKind::Post => write!(f, "post"),
        }
    }
}

/// One guild's monitoring of one creator. Keyed by `(guild_id, entity_id)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchRegistration {
    pub guild_id: String,
    pub entity_id: String,
    pub username: String,

    /// General fallback destination; always set.
    pub notification_channel: String,
    pub post_notification_channel: Option<String>,
    pub live_notification_channel: Option<String>,

    /// Empty (or the legacy `"0"`) until the first post notification went out.
    pub last_post_id: String,
    /// Start timestamp of the last announced stream, `0` if none.
    pub last_stream_start: i64,

    pub mention_role: Option<String>,
    pub post_mention_role: Option<String>,
    pub live_mention_role: Option<String>,

    pub avatar_location: Option<String>,
    /// Unix seconds of the last avatar refresh.
    pub avatar_location_updated_at: i64,
    pub live_image_url: Option<String>,

    pub posts_enabled: bool,
    pub live_enabled: bool,

    pub created_at: DateTime<Utc>,
}

impl WatchRegistration {
    /// A fresh registration with both kinds enabled and every notification going to `channel_id`.
    pub fn new(guild_id: &str, entity_id: &str, username: &str, channel_id: &str) -> Self {
        let now = Utc::now();
        Self {
            guild_id: guild_id.to_string(),
            entity_id: entity_id.to_string(),
            username: username.to_string(),
            notification_channel: channel_id.to_string(),
            post_notification_channel: None,
            live_notification_channel: None,
            last_post_id: String::new(),
            last_stream_start: 0,
            mention_role: None,
            post_mention_role: None,
            live_mention_role: None,
            avatar_location: None,
            avatar_location_updated_at: now.timestamp(),
            live_image_url: None,
            posts_enabled: true,
            live_enabled: true,
            created_at: now,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.posts_enabled || self.live_enabled
    }

    pub fn is_enabled_for(&self, kind: NotificationKind) -> bool {
        match kind {
            NotificationKind::Live => self.live_enabled,
            NotificationKind::Post => self.posts_enabled,
        }
    }

    /// True while no post notification has ever been sent for this registration.
    pub fn never_notified_post(&self) -> bool {
        self.last_post_id.is_empty() || self.last_post_id == LEGACY_POST_SENTINEL
    }

    /// Kind-specific channel, falling back to the general notification channel.
    pub fn channel_for(&self, kind: NotificationKind) -> &str {
        let specific = match kind {
            NotificationKind::Live => self.live_notification_channel.as_deref(),
            NotificationKind::Post => self.post_notification_channel.as_deref(),
        };
        match specific {
            Some(ch) if !ch.is_empty() => ch,
            _ => &self.notification_channel,
        }
    }

    /// Kind-specific mention role. The general `mention_role` only seeds both at
    /// registration, so clearing one kind's role silences pings for that kind alone.
    pub fn mention_for(&self, kind: NotificationKind) -> Option<&str> {
        match kind {
            NotificationKind::Live => self.live_mention_role.as_deref(),
            NotificationKind::Post => self.post_mention_role.as_deref(),
        }
        .filter(|r| !r.is_empty())
    }

    /// Whether the cached avatar is older than `max_age_secs` at `now_secs`.
    pub fn avatar_is_stale(&self, now_secs: i64, max_age_secs: i64) -> bool {
        now_secs - self.avatar_location_updated_at > max_age_secs
    }
}

/// Per-(guild, entity) customization of message templates and embed colours.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NotificationOverride {
    pub guild_id: String,
    pub entity_id: String,
    pub post_message_format: Option<String>,
    pub live_message_format: Option<String>,
    pub post_embed_color: Option<u32>,
    pub live_embed_color: Option<u32>,
}

impl NotificationOverride {
    pub fn new(guild_id: &str, entity_id: &str) -> Self {
        Self {
            guild_id: guild_id.to_string(),
            entity_id: entity_id.to_string(),
            ..Default::default()
        }
    }

    pub fn template_for(&self, kind: NotificationKind) -> Option<&str> {
        match kind {
            NotificationKind::Live => self.live_message_format.as_deref(),
            NotificationKind::Post => self.post_message_format.as_deref(),
        }
    }

    pub fn color_for(&self, kind: NotificationKind) -> Option<u32> {
        match kind {
            NotificationKind::Live => self.live_embed_color,
            NotificationKind::Post => self.post_embed_color,
        }
    }
}

/// Paid plan that raises a guild's creator limit until `expires_at` (unix seconds).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuildSubscription {
    pub guild_id: String,
    pub subscription_tier: String,
    pub user_limit: i64,
    pub expires_at: i64,
}

impl GuildSubscription {
    pub fn is_active(&self, now_secs: i64) -> bool {
        now_secs < self.expires_at
    }
}
