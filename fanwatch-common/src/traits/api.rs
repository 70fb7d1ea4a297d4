use async_trait::async_trait;

use crate::error::Error;
use crate::models::{AccountInfo, ContentItem, RichContent, StreamState};

/// What the monitor needs from the creator platform.
#[async_trait]
pub trait UpstreamApi: Send + Sync {
    async fn fetch_account_info(&self, username: &str) -> Result<AccountInfo, Error>;
    /// The account the API token belongs to.
    async fn fetch_self_account(&self) -> Result<AccountInfo, Error>;
    async fn fetch_stream_state(&self, entity_id: &str) -> Result<StreamState, Error>;
    /// Newest first. An empty list is not an error.
    async fn fetch_latest_content(&self, entity_id: &str) -> Result<Vec<ContentItem>, Error>;
    /// Entity ids followed by `self_entity_id`.
    async fn fetch_following(&self, self_entity_id: &str) -> Result<Vec<String>, Error>;
    async fn follow_entity(&self, entity_id: &str) -> Result<(), Error>;
}

/// Outbound delivery of a rendered notification.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn send(&self, channel_id: &str, text: &str, rich: &RichContent) -> Result<(), Error>;
}

/// The bot's gateway presence, as far as the background tasks need it.
pub trait BotPresence: Send + Sync {
    /// Guilds currently known to the gateway cache.
    fn guild_count(&self) -> usize;
    /// Sets a "Watching <text>" activity on every shard.
    fn set_watching(&self, text: &str) -> Result<(), Error>;
}
