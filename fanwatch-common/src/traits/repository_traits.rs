use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::Error;
use crate::models::{GuildSubscription, NotificationOverride, ServiceStatus, WatchRegistration};

#[async_trait]
pub trait WatchRepository: Send + Sync {
    /// Every registration with at least one kind enabled, oldest first.
    async fn list_enabled(&self) -> Result<Vec<WatchRegistration>, Error>;
    async fn list_for_guild(&self, guild_id: &str) -> Result<Vec<WatchRegistration>, Error>;
    async fn get(&self, guild_id: &str, entity_id: &str) -> Result<Option<WatchRegistration>, Error>;
    /// Case-insensitive lookup by creator username.
    async fn get_by_username(&self, guild_id: &str, username: &str) -> Result<Option<WatchRegistration>, Error>;
    async fn count_for_guild(&self, guild_id: &str) -> Result<i64, Error>;

    /// Inserts, or on an existing `(guild, entity)` key updates the settings columns.
    /// Watermark columns of an existing row are left alone.
    async fn upsert(&self, reg: &WatchRegistration) -> Result<(), Error>;
    /// Returns whether a row was removed.
    async fn delete(&self, guild_id: &str, entity_id: &str) -> Result<bool, Error>;
    /// Group teardown. Returns the number of removed rows.
    async fn delete_all_for_guild(&self, guild_id: &str) -> Result<u64, Error>;

    /// Stores `post_id` unless it is already the stored value.
    /// `Ok(true)` means the row changed and a notification may go out.
    async fn advance_last_post_id(&self, guild_id: &str, entity_id: &str, post_id: &str) -> Result<bool, Error>;
    /// Stores `started_at` only if it is newer than the stored value.
    /// `Ok(true)` means the row changed and a notification may go out.
    async fn advance_last_stream_start(&self, guild_id: &str, entity_id: &str, started_at: i64) -> Result<bool, Error>;
    async fn update_avatar(&self, guild_id: &str, entity_id: &str, location: &str, refreshed_at: i64) -> Result<(), Error>;
}

#[async_trait]
pub trait NotificationOverrideRepository: Send + Sync {
    async fn get_override(&self, guild_id: &str, entity_id: &str) -> Result<Option<NotificationOverride>, Error>;
    /// All overrides for one entity, keyed by guild id.
    async fn list_overrides_for_entity(&self, entity_id: &str) -> Result<HashMap<String, NotificationOverride>, Error>;
    async fn upsert_override(&self, item: &NotificationOverride) -> Result<(), Error>;
    async fn delete_override(&self, guild_id: &str, entity_id: &str) -> Result<(), Error>;
}

#[async_trait]
pub trait StatsRepository: Send + Sync {
    async fn increment_stat(&self, stat_key: &str) -> Result<(), Error>;
    async fn get_stat(&self, stat_key: &str) -> Result<i64, Error>;
    /// Adds the given deltas to the durable API health totals of `service_name`.
    async fn add_api_health(&self, service_name: &str, total: u64, successful: u64) -> Result<(), Error>;
    async fn upsert_service_status(&self, status: &ServiceStatus) -> Result<(), Error>;
}

#[async_trait]
pub trait GuildSubscriptionRepository: Send + Sync {
    async fn get_subscription(&self, guild_id: &str) -> Result<Option<GuildSubscription>, Error>;
    async fn upsert_subscription(&self, sub: &GuildSubscription) -> Result<(), Error>;
}
