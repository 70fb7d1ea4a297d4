// fanwatch-core/src/test_utils/store.rs
//
// In-memory stand-in for every repository trait, with the same upsert and watermark
// semantics as the Postgres implementations.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::{DashMap, DashSet};

use fanwatch_common::error::Error;
use fanwatch_common::models::{GuildSubscription, NotificationOverride, ServiceStatus, WatchRegistration};
use fanwatch_common::traits::repository_traits::{
    GuildSubscriptionRepository, NotificationOverrideRepository, StatsRepository, WatchRepository,
};

type Key = (String, String);

fn key(guild_id: &str, entity_id: &str) -> Key {
    (guild_id.to_string(), entity_id.to_string())
}

#[derive(Default)]
pub struct InMemoryStore {
    seq: AtomicU64,
    registrations: DashMap<Key, (u64, WatchRegistration)>,
    overrides: DashMap<Key, NotificationOverride>,
    stats: DashMap<String, i64>,
    api_health: DashMap<String, (u64, u64)>,
    service_status: DashMap<String, ServiceStatus>,
    subscriptions: DashMap<String, GuildSubscription>,

    failing_watermark_guilds: DashSet<String>,
    fail_health_writes: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every registration in creation order.
    pub fn all_registrations(&self) -> Vec<WatchRegistration> {
        let mut rows: Vec<(u64, WatchRegistration)> = self
            .registrations
            .iter()
            .map(|e| e.value().clone())
            .collect();
        rows.sort_by_key(|(seq, _)| *seq);
        rows.into_iter().map(|(_, r)| r).collect()
    }

    /// Inserts or fully replaces a row, watermarks included. Test setup only.
    pub fn put_registration(&self, reg: WatchRegistration) {
        let k = key(&reg.guild_id, &reg.entity_id);
        let seq = self
            .registrations
            .get(&k)
            .map(|e| e.0)
            .unwrap_or_else(|| self.seq.fetch_add(1, Ordering::SeqCst));
        self.registrations.insert(k, (seq, reg));
    }

    pub fn registration(&self, guild_id: &str, entity_id: &str) -> Option<WatchRegistration> {
        self.registrations.get(&key(guild_id, entity_id)).map(|e| e.1.clone())
    }

    pub fn stat(&self, stat_key: &str) -> i64 {
        self.stats.get(stat_key).map(|v| *v).unwrap_or(0)
    }

    pub fn api_health(&self, service_name: &str) -> (u64, u64) {
        self.api_health.get(service_name).map(|v| *v).unwrap_or((0, 0))
    }

    pub fn service_status(&self, service_name: &str) -> Option<ServiceStatus> {
        self.service_status.get(service_name).map(|v| v.clone())
    }

    /// Makes watermark writes for `guild_id` fail with a database-like error.
    pub fn fail_watermarks_for(&self, guild_id: &str) {
        self.failing_watermark_guilds.insert(guild_id.to_string());
    }

    pub fn set_fail_health_writes(&self, fail: bool) {
        self.fail_health_writes.store(fail, Ordering::SeqCst);
    }

    fn check_watermark(&self, guild_id: &str) -> Result<(), Error> {
        if self.failing_watermark_guilds.contains(guild_id) {
            return Err(Error::Platform(format!("watermark write rejected for guild {guild_id}")));
        }
        Ok(())
    }
}

#[async_trait]
impl WatchRepository for InMemoryStore {
    async fn list_enabled(&self) -> Result<Vec<WatchRegistration>, Error> {
        Ok(self
            .all_registrations()
            .into_iter()
            .filter(|r| r.is_enabled())
            .collect())
    }

    async fn list_for_guild(&self, guild_id: &str) -> Result<Vec<WatchRegistration>, Error> {
        let mut rows: Vec<_> = self
            .all_registrations()
            .into_iter()
            .filter(|r| r.guild_id == guild_id)
            .collect();
        rows.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(rows)
    }

    async fn get(&self, guild_id: &str, entity_id: &str) -> Result<Option<WatchRegistration>, Error> {
        Ok(self.registration(guild_id, entity_id))
    }

    async fn get_by_username(&self, guild_id: &str, username: &str) -> Result<Option<WatchRegistration>, Error> {
        Ok(self
            .all_registrations()
            .into_iter()
            .find(|r| r.guild_id == guild_id && r.username.eq_ignore_ascii_case(username)))
    }

    async fn count_for_guild(&self, guild_id: &str) -> Result<i64, Error> {
        Ok(self.registrations.iter().filter(|e| e.key().0 == guild_id).count() as i64)
    }

    async fn upsert(&self, reg: &WatchRegistration) -> Result<(), Error> {
        let k = key(&reg.guild_id, &reg.entity_id);
        if let Some(mut existing) = self.registrations.get_mut(&k) {
            let row = &mut existing.1;
            row.username = reg.username.clone();
            row.notification_channel = reg.notification_channel.clone();
            row.post_notification_channel = reg.post_notification_channel.clone();
            row.live_notification_channel = reg.live_notification_channel.clone();
            row.mention_role = reg.mention_role.clone();
            row.post_mention_role = reg.post_mention_role.clone();
            row.live_mention_role = reg.live_mention_role.clone();
            row.live_image_url = reg.live_image_url.clone();
            row.posts_enabled = reg.posts_enabled;
            row.live_enabled = reg.live_enabled;
            return Ok(());
        }
        let seq = self.seq.fetch_add(1, Ordering::SeqCst);
        self.registrations.insert(k, (seq, reg.clone()));
        Ok(())
    }

    async fn delete(&self, guild_id: &str, entity_id: &str) -> Result<bool, Error> {
        let k = key(guild_id, entity_id);
        self.overrides.remove(&k);
        Ok(self.registrations.remove(&k).is_some())
    }

    async fn delete_all_for_guild(&self, guild_id: &str) -> Result<u64, Error> {
        self.overrides.retain(|k, _| k.0 != guild_id);
        let before = self.registrations.len();
        self.registrations.retain(|k, _| k.0 != guild_id);
        Ok((before - self.registrations.len()) as u64)
    }

    async fn advance_last_post_id(&self, guild_id: &str, entity_id: &str, post_id: &str) -> Result<bool, Error> {
        self.check_watermark(guild_id)?;
        match self.registrations.get_mut(&key(guild_id, entity_id)) {
            Some(mut e) if e.1.last_post_id != post_id => {
                e.1.last_post_id = post_id.to_string();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn advance_last_stream_start(&self, guild_id: &str, entity_id: &str, started_at: i64) -> Result<bool, Error> {
        self.check_watermark(guild_id)?;
        match self.registrations.get_mut(&key(guild_id, entity_id)) {
            Some(mut e) if e.1.last_stream_start < started_at => {
                e.1.last_stream_start = started_at;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn update_avatar(&self, guild_id: &str, entity_id: &str, location: &str, refreshed_at: i64) -> Result<(), Error> {
        if let Some(mut e) = self.registrations.get_mut(&key(guild_id, entity_id)) {
            e.1.avatar_location = Some(location.to_string()).filter(|l| !l.is_empty());
            e.1.avatar_location_updated_at = refreshed_at;
        }
        Ok(())
    }
}

#[async_trait]
impl NotificationOverrideRepository for InMemoryStore {
    async fn get_override(&self, guild_id: &str, entity_id: &str) -> Result<Option<NotificationOverride>, Error> {
        Ok(self.overrides.get(&key(guild_id, entity_id)).map(|v| v.clone()))
    }

    async fn list_overrides_for_entity(&self, entity_id: &str) -> Result<HashMap<String, NotificationOverride>, Error> {
        Ok(self
            .overrides
            .iter()
            .filter(|e| e.key().1 == entity_id)
            .map(|e| (e.key().0.clone(), e.value().clone()))
            .collect())
    }

    async fn upsert_override(&self, item: &NotificationOverride) -> Result<(), Error> {
        self.overrides
            .insert(key(&item.guild_id, &item.entity_id), item.clone());
        Ok(())
    }

    async fn delete_override(&self, guild_id: &str, entity_id: &str) -> Result<(), Error> {
        self.overrides.remove(&key(guild_id, entity_id));
        Ok(())
    }
}

#[async_trait]
impl StatsRepository for InMemoryStore {
    async fn increment_stat(&self, stat_key: &str) -> Result<(), Error> {
        *self.stats.entry(stat_key.to_string()).or_insert(0) += 1;
        Ok(())
    }

    async fn get_stat(&self, stat_key: &str) -> Result<i64, Error> {
        Ok(self.stat(stat_key))
    }

    async fn add_api_health(&self, service_name: &str, total: u64, successful: u64) -> Result<(), Error> {
        if self.fail_health_writes.load(Ordering::SeqCst) {
            return Err(Error::Platform("api health write rejected".into()));
        }
        let mut entry = self.api_health.entry(service_name.to_string()).or_insert((0, 0));
        entry.0 += total;
        entry.1 += successful;
        Ok(())
    }

    async fn upsert_service_status(&self, status: &ServiceStatus) -> Result<(), Error> {
        self.service_status
            .insert(status.service_name.clone(), status.clone());
        Ok(())
    }
}

#[async_trait]
impl GuildSubscriptionRepository for InMemoryStore {
    async fn get_subscription(&self, guild_id: &str) -> Result<Option<GuildSubscription>, Error> {
        Ok(self.subscriptions.get(guild_id).map(|v| v.clone()))
    }

    async fn upsert_subscription(&self, sub: &GuildSubscription) -> Result<(), Error> {
        self.subscriptions.insert(sub.guild_id.clone(), sub.clone());
        Ok(())
    }
}
