// fanwatch-core/src/services/registration_service.rs
//
// Administrative operations on watch registrations: add (with the guild limit and the
// follow fallback), remove, guild teardown, listing and per-registration settings.
// Settings writes go through `WatchRepository::upsert`, which never touches watermarks.

use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{info, warn};
use url::Url;

use fanwatch_common::error::Error;
use fanwatch_common::models::{
    GuildSubscription, NotificationKind, NotificationOverride, WatchRegistration,
};
use fanwatch_common::traits::api::UpstreamApi;
use fanwatch_common::traits::repository_traits::{
    GuildSubscriptionRepository, NotificationOverrideRepository, WatchRepository,
};

static TOKEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Za-z0-9]{40,}").expect("static regex"));
static USERNAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_.\-]{1,64}$").expect("static regex"));
static HEX_COLOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#([A-Fa-f0-9]{6}|[A-Fa-f0-9]{3})$").expect("static regex"));

const MANUAL_OVERRIDE_TIER: &str = "manual-override";
const PERMANENT_OVERRIDE_YEARS: i64 = 100;

/// Pulls a username out of a profile URL (`https://host/name/...`, scheme optional),
/// an `@name` handle, or a bare name.
pub fn extract_username(input: &str) -> String {
    let trimmed = input.trim();

    let as_url = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        Url::parse(trimmed).ok()
    } else if trimmed.contains('/') && trimmed.split('/').next().is_some_and(|h| h.contains('.')) {
        Url::parse(&format!("https://{}", trimmed)).ok()
    } else {
        None
    };

    if let Some(url) = as_url {
        if let Some(first) = url.path_segments().and_then(|mut s| s.next()) {
            if !first.is_empty() {
                return first.trim_start_matches('@').to_string();
            }
        }
    }

    trimmed.strip_prefix('@').unwrap_or(trimmed).to_string()
}

pub fn validate_username(username: &str) -> Result<(), Error> {
    if TOKEN_RE.is_match(username) {
        return Err(Error::InvalidInput(
            "username appears to contain a token".into(),
        ));
    }
    if !USERNAME_RE.is_match(username) {
        return Err(Error::InvalidInput(format!("'{}' is not a valid username", username)));
    }
    Ok(())
}

/// Parses `#RRGGBB` or the short `#RGB` form into a 24-bit colour.
pub fn parse_hex_color(input: &str) -> Result<u32, Error> {
    let trimmed = input.trim();
    if !HEX_COLOR_RE.is_match(trimmed) {
        return Err(Error::InvalidInput(format!(
            "invalid hex colour '{}', expected e.g. #5865F2",
            trimmed
        )));
    }
    let digits = &trimmed[1..];
    let full: String = if digits.len() == 3 {
        digits.chars().flat_map(|c| [c, c]).collect()
    } else {
        digits.to_string()
    };
    u32::from_str_radix(&full, 16).map_err(|e| Error::InvalidInput(e.to_string()))
}

/// What `add_registration` ended up storing.
#[derive(Debug, Clone, PartialEq)]
pub struct AddOutcome {
    pub registration: WatchRegistration,
    /// False when the timeline stayed inaccessible and the creator was added live-only.
    pub content_accessible: bool,
    pub replaced_existing: bool,
}

pub struct RegistrationService {
    watch_repo: Arc<dyn WatchRepository>,
    override_repo: Arc<dyn NotificationOverrideRepository>,
    subscription_repo: Arc<dyn GuildSubscriptionRepository>,
    upstream: Arc<dyn UpstreamApi>,
    /// 0 means unlimited.
    default_limit: i64,
}

impl RegistrationService {
    pub fn new(
        watch_repo: Arc<dyn WatchRepository>,
        override_repo: Arc<dyn NotificationOverrideRepository>,
        subscription_repo: Arc<dyn GuildSubscriptionRepository>,
        upstream: Arc<dyn UpstreamApi>,
        default_limit: i64,
    ) -> Self {
        Self {
            watch_repo,
            override_repo,
            subscription_repo,
            upstream,
            default_limit,
        }
    }

    /// The creator limit for `guild_id`: an unexpired subscription wins over the default.
    pub async fn effective_limit(&self, guild_id: &str) -> i64 {
        match self.subscription_repo.get_subscription(guild_id).await {
            Ok(Some(sub)) if sub.is_active(Utc::now().timestamp()) => sub.user_limit,
            Ok(_) => self.default_limit,
            Err(e) => {
                warn!("Could not read subscription for guild {}: {:?}", guild_id, e);
                self.default_limit
            }
        }
    }

    pub async fn add_registration(
        &self,
        guild_id: &str,
        raw_username: &str,
        channel_id: &str,
        mention_role: Option<&str>,
    ) -> Result<AddOutcome, Error> {
        let username = extract_username(raw_username);
        validate_username(&username)?;

        let existing = self.watch_repo.get_by_username(guild_id, &username).await?;

        let limit = self.effective_limit(guild_id).await;
        if limit > 0 && existing.is_none() {
            let count = self.watch_repo.count_for_guild(guild_id).await?;
            if count >= limit {
                return Err(Error::LimitReached { guild_id: guild_id.to_string(), limit });
            }
        }

        let account = self.upstream.fetch_account_info(&username).await?;
        if account.primary_avatar().is_none() {
            warn!("No avatar found for {}", username);
        }

        let content_accessible = self.ensure_content_access(&account.entity_id, &username).await;

        let mut reg = WatchRegistration::new(guild_id, &account.entity_id, &username, channel_id);
        reg.mention_role = mention_role.map(str::to_string).filter(|r| !r.is_empty());
        reg.post_mention_role = reg.mention_role.clone();
        reg.live_mention_role = reg.mention_role.clone();
        reg.avatar_location = account.primary_avatar().map(str::to_string);
        reg.posts_enabled = content_accessible;

        self.watch_repo.upsert(&reg).await?;
        info!(
            "Registered {} (entity={}) in guild {} (content_accessible={})",
            username, account.entity_id, guild_id, content_accessible
        );

        Ok(AddOutcome {
            registration: reg,
            content_accessible,
            replaced_existing: existing.is_some(),
        })
    }

    /// Probes the timeline; when it is not readable, follows the entity once from the
    /// service account and probes again.
    async fn ensure_content_access(&self, entity_id: &str, username: &str) -> bool {
        if self.upstream.fetch_latest_content(entity_id).await.is_ok() {
            return true;
        }

        match self.upstream.fetch_self_account().await {
            Ok(me) if !me.entity_id.is_empty() => {
                match self.upstream.fetch_following(&me.entity_id).await {
                    Ok(following) => {
                        if !following.iter().any(|id| id == entity_id) {
                            if let Err(e) = self.upstream.follow_entity(entity_id).await {
                                info!("Could not automatically follow {}: {:?}", username, e);
                            }
                        }
                    }
                    Err(e) => warn!("Could not read following list: {:?}", e),
                }
            }
            Ok(_) => warn!("Self account has no id; skipping follow fallback"),
            Err(e) => warn!("Could not read self account: {:?}", e),
        }

        self.upstream.fetch_latest_content(entity_id).await.is_ok()
    }

    pub async fn remove_registration(&self, guild_id: &str, username: &str) -> Result<bool, Error> {
        let username = extract_username(username);
        match self.watch_repo.get_by_username(guild_id, &username).await? {
            Some(reg) => {
                let removed = self.watch_repo.delete(guild_id, &reg.entity_id).await?;
                info!("Removed {} from guild {}", reg.username, guild_id);
                Ok(removed)
            }
            None => Ok(false),
        }
    }

    /// Teardown when the bot leaves a guild.
    pub async fn remove_guild(&self, guild_id: &str) -> Result<u64, Error> {
        let removed = self.watch_repo.delete_all_for_guild(guild_id).await?;
        info!("Removed {} registration(s) for guild {}", removed, guild_id);
        Ok(removed)
    }

    pub async fn list_for_guild(&self, guild_id: &str) -> Result<Vec<WatchRegistration>, Error> {
        self.watch_repo.list_for_guild(guild_id).await
    }

    async fn find(&self, guild_id: &str, username: &str) -> Result<WatchRegistration, Error> {
        let username = extract_username(username);
        self.watch_repo
            .get_by_username(guild_id, &username)
            .await?
            .ok_or_else(|| Error::NotFound(format!("{} is not monitored in guild {}", username, guild_id)))
    }

    async fn update_settings<F>(&self, guild_id: &str, username: &str, apply: F) -> Result<WatchRegistration, Error>
    where
        F: FnOnce(&mut WatchRegistration),
    {
        let mut reg = self.find(guild_id, username).await?;
        apply(&mut reg);
        self.watch_repo.upsert(&reg).await?;
        Ok(reg)
    }

    pub async fn set_enabled(
        &self,
        guild_id: &str,
        username: &str,
        kind: NotificationKind,
        enabled: bool,
    ) -> Result<WatchRegistration, Error> {
        self.update_settings(guild_id, username, |reg| match kind {
            NotificationKind::Live => reg.live_enabled = enabled,
            NotificationKind::Post => reg.posts_enabled = enabled,
        })
        .await
    }

    pub async fn set_channel(
        &self,
        guild_id: &str,
        username: &str,
        kind: NotificationKind,
        channel_id: &str,
    ) -> Result<WatchRegistration, Error> {
        let channel = Some(channel_id.to_string()).filter(|c| !c.is_empty());
        self.update_settings(guild_id, username, |reg| match kind {
            NotificationKind::Live => reg.live_notification_channel = channel,
            NotificationKind::Post => reg.post_notification_channel = channel,
        })
        .await
    }

    /// `None` clears the role for that kind only; its notifications then carry no mention.
    pub async fn set_mention_role(
        &self,
        guild_id: &str,
        username: &str,
        kind: NotificationKind,
        role_id: Option<&str>,
    ) -> Result<WatchRegistration, Error> {
        let role = role_id.map(str::to_string).filter(|r| !r.is_empty());
        self.update_settings(guild_id, username, |reg| match kind {
            NotificationKind::Live => reg.live_mention_role = role,
            NotificationKind::Post => reg.post_mention_role = role,
        })
        .await
    }

    pub async fn set_live_image(
        &self,
        guild_id: &str,
        username: &str,
        image_url: Option<&str>,
    ) -> Result<WatchRegistration, Error> {
        let image = match image_url.map(str::trim).filter(|u| !u.is_empty()) {
            Some(raw) => Some(Url::parse(raw)?.to_string()),
            None => None,
        };
        self.update_settings(guild_id, username, |reg| reg.live_image_url = image)
            .await
    }

    async fn update_override<F>(&self, guild_id: &str, username: &str, apply: F) -> Result<NotificationOverride, Error>
    where
        F: FnOnce(&mut NotificationOverride),
    {
        let reg = self.find(guild_id, username).await?;
        let mut ov = self
            .override_repo
            .get_override(guild_id, &reg.entity_id)
            .await?
            .unwrap_or_else(|| NotificationOverride::new(guild_id, &reg.entity_id));
        apply(&mut ov);
        self.override_repo.upsert_override(&ov).await?;
        Ok(ov)
    }

    /// An empty or `None` template restores the default (mention only).
    pub async fn set_message_template(
        &self,
        guild_id: &str,
        username: &str,
        kind: NotificationKind,
        template: Option<&str>,
    ) -> Result<NotificationOverride, Error> {
        let template = template.map(str::to_string).filter(|t| !t.trim().is_empty());
        self.update_override(guild_id, username, |ov| match kind {
            NotificationKind::Live => ov.live_message_format = template,
            NotificationKind::Post => ov.post_message_format = template,
        })
        .await
    }

    pub async fn set_color(
        &self,
        guild_id: &str,
        username: &str,
        kind: NotificationKind,
        hex: &str,
    ) -> Result<NotificationOverride, Error> {
        let color = parse_hex_color(hex)?;
        self.update_override(guild_id, username, |ov| match kind {
            NotificationKind::Live => ov.live_embed_color = Some(color),
            NotificationKind::Post => ov.post_embed_color = Some(color),
        })
        .await
    }

    /// Operator override of a guild's limit. `duration_days <= 0` makes it effectively permanent.
    pub async fn set_guild_limit(
        &self,
        guild_id: &str,
        limit: i64,
        duration_days: i64,
    ) -> Result<GuildSubscription, Error> {
        let now = Utc::now();
        let expires_at = if duration_days > 0 {
            now + ChronoDuration::days(duration_days)
        } else {
            now + ChronoDuration::days(365 * PERMANENT_OVERRIDE_YEARS)
        };

        let sub = GuildSubscription {
            guild_id: guild_id.to_string(),
            subscription_tier: MANUAL_OVERRIDE_TIER.to_string(),
            user_limit: limit.max(0),
            expires_at: expires_at.timestamp(),
        };
        self.subscription_repo.upsert_subscription(&sub).await?;
        info!("Set creator limit for guild {} to {}", guild_id, sub.user_limit);
        Ok(sub)
    }
}
