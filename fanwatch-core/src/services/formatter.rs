// fanwatch-core/src/services/formatter.rs
//
// Turns a detected event plus a registration's customization into an outbound message.
// Everything here is pure and cannot fail.

use chrono::{TimeZone, Utc};

use fanwatch_common::models::{
    ContentItem, NotificationKind, NotificationOverride, OutboundNotification, RichContent,
    StreamState, WatchRegistration,
};

pub const DEFAULT_LIVE_COLOR: u32 = 0xE9_1E_63;
pub const DEFAULT_POST_COLOR: u32 = 0x1D_A1_F2;

const USERNAME_PLACEHOLDER: &str = "{username}";
const MAX_DESCRIPTION_CHARS: usize = 300;

/// Renders the text part of a notification.
///
/// `template` and `mention_role` are empty when unset. Without a template the result is the
/// role mention alone. A template that contains the kind's mention placeholder gets the mention
/// substituted in place; otherwise the mention (if any) is prepended with one space.
pub fn format_notification_message(
    template: &str,
    mention_role: &str,
    username: &str,
    kind: NotificationKind,
) -> String {
    let mention = if mention_role.is_empty() {
        String::new()
    } else {
        format!("<@&{}>", mention_role)
    };

    if template.is_empty() {
        return mention;
    }

    let rendered = template.replace(USERNAME_PLACEHOLDER, username);
    let placeholder = kind.mention_placeholder();

    if template.contains(placeholder) {
        rendered.replace(placeholder, &mention)
    } else if mention.is_empty() {
        rendered
    } else {
        format!("{} {}", mention, rendered)
    }
}

/// Render input for one registration and one detected event.
#[derive(Debug, Clone, Copy)]
pub struct NotificationContext<'a> {
    pub registration: &'a WatchRegistration,
    pub customization: Option<&'a NotificationOverride>,
    /// Public web base of the creator platform, no trailing slash.
    pub web_url: &'a str,
}

impl<'a> NotificationContext<'a> {
    pub fn new(
        registration: &'a WatchRegistration,
        customization: Option<&'a NotificationOverride>,
        web_url: &'a str,
    ) -> Self {
        Self { registration, customization, web_url }
    }

    fn text(&self, kind: NotificationKind) -> String {
        let template = self
            .customization
            .and_then(|c| c.template_for(kind))
            .unwrap_or("");
        let mention = self.registration.mention_for(kind).unwrap_or("");
        format_notification_message(template, mention, &self.registration.username, kind)
    }

    fn color(&self, kind: NotificationKind) -> u32 {
        let default = match kind {
            NotificationKind::Live => DEFAULT_LIVE_COLOR,
            NotificationKind::Post => DEFAULT_POST_COLOR,
        };
        self.customization
            .and_then(|c| c.color_for(kind))
            .filter(|c| *c != 0)
            .unwrap_or(default)
    }

    pub fn render_live(&self, stream: &StreamState) -> OutboundNotification {
        let reg = self.registration;
        let kind = NotificationKind::Live;

        let mut footer = String::from("Live now");
        if let Some(viewers) = stream.viewer_count {
            footer = format!("{} · {} watching", footer, viewers);
        }

        let rich = RichContent {
            title: format!("{} is now live!", reg.username),
            url: Some(format!("{}/live/{}", self.web_url, reg.username)),
            description: stream.title.clone().filter(|t| !t.is_empty()),
            author_name: Some(reg.username.clone()),
            author_icon_url: reg.avatar_location.clone(),
            thumbnail_url: reg.avatar_location.clone(),
            image_url: reg.live_image_url.clone().filter(|u| !u.is_empty()),
            color: self.color(kind),
            footer: Some(footer),
            timestamp: Utc.timestamp_millis_opt(stream.started_at).single(),
        };

        OutboundNotification {
            channel_id: reg.channel_for(kind).to_string(),
            text: self.text(kind),
            rich,
        }
    }

    /// `first_post` selects the variant used when this registration has never been notified.
    pub fn render_post(&self, item: &ContentItem, first_post: bool) -> OutboundNotification {
        let reg = self.registration;
        let kind = NotificationKind::Post;

        let title = if first_post {
            format!("{} posted (first update for this server)", reg.username)
        } else {
            format!("New post from {}", reg.username)
        };

        let rich = RichContent {
            title,
            url: Some(format!("{}/post/{}", self.web_url, item.id)),
            description: excerpt(&item.content),
            author_name: Some(reg.username.clone()),
            author_icon_url: reg.avatar_location.clone(),
            thumbnail_url: reg.avatar_location.clone(),
            image_url: None,
            color: self.color(kind),
            footer: None,
            timestamp: Utc.timestamp_opt(item.created_at, 0).single(),
        };

        OutboundNotification {
            channel_id: reg.channel_for(kind).to_string(),
            text: self.text(kind),
            rich,
        }
    }
}

fn excerpt(content: &str) -> Option<String> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.chars().count() <= MAX_DESCRIPTION_CHARS {
        return Some(trimmed.to_string());
    }
    let cut: String = trimmed.chars().take(MAX_DESCRIPTION_CHARS).collect();
    Some(format!("{}…", cut.trim_end()))
}
