// fanwatch-core/src/platforms/discord/runtime.rs
//
// Gateway side of the bot: connects the recommended number of shards, keeps a guild cache
// and turns guild membership changes into event-bus events. Message delivery goes through
// `DiscordNotificationSink`, which only needs the HTTP client.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

use twilight_cache_inmemory::{InMemoryCache, ResourceType};
use twilight_gateway::{
    self as gateway,
    CloseFrame,
    Config,
    Event,
    EventTypeFlags,
    Intents,
    MessageSender,
    Shard,
    StreamExt,
};
use twilight_http::Client as HttpClient;
use twilight_http::client::ClientBuilder;
use twilight_model::gateway::payload::incoming::{GuildDelete, Ready as ReadyPayload};
use twilight_model::gateway::payload::outgoing::UpdatePresence;
use twilight_model::gateway::presence::{ActivityType, MinimalActivity, Status};

use fanwatch_common::traits::api::BotPresence;

use crate::Error;
use crate::eventbus::{EventBus, MonitorEvent};

/// `unavailable` is set during a Discord outage; `None` means the bot was removed.
fn is_guild_outage(gd: &GuildDelete) -> bool {
    gd.unavailable.unwrap_or(false)
}

async fn shard_runner(mut shard: Shard, event_bus: EventBus, cache: Arc<InMemoryCache>) {
    let shard_id = shard.id().number();
    info!("(ShardRunner) Shard {shard_id} started. Listening for events.");

    while let Some(item) = shard.next_event(EventTypeFlags::all()).await {
        match item {
            Ok(event) => {
                cache.update(&event);

                match &event {
                    Event::Ready(ready) => {
                        let data: &ReadyPayload = ready.as_ref();
                        info!(
                            "Shard {shard_id} => READY as {} (ID={}), {} guild(s)",
                            data.user.name,
                            data.user.id,
                            data.guilds.len()
                        );
                    }
                    Event::GuildCreate(gc) => {
                        let guild_id = gc.id().to_string();
                        debug!("Shard {shard_id} => guild available: {guild_id}");
                        event_bus.publish(MonitorEvent::GuildJoined { guild_id }).await;
                    }
                    Event::GuildDelete(gd) => {
                        if is_guild_outage(gd) {
                            warn!("Shard {shard_id} => guild {} became unavailable", gd.id);
                        } else {
                            info!("Shard {shard_id} => removed from guild {}", gd.id);
                            event_bus
                                .publish(MonitorEvent::GuildRemoved { guild_id: gd.id.to_string() })
                                .await;
                        }
                    }
                    _ => {
                        trace!("Shard {shard_id} => unhandled event: {:?}", event.kind());
                    }
                }
            }
            Err(err) => {
                error!("Shard {shard_id} => error receiving event: {err:?}");
            }
        }
    }

    warn!("(ShardRunner) Shard {shard_id} event loop ended.");
}

/// Cloneable handle used by background tasks to read the guild count and set presence.
#[derive(Clone)]
pub struct DiscordPresence {
    senders: Vec<MessageSender>,
    cache: Arc<InMemoryCache>,
}

impl BotPresence for DiscordPresence {
    fn guild_count(&self) -> usize {
        self.cache.stats().guilds()
    }

    fn set_watching(&self, text: &str) -> Result<(), Error> {
        let activity = MinimalActivity {
            kind: ActivityType::Watching,
            name: text.to_string(),
            url: None,
        };
        let presence = UpdatePresence::new(vec![activity.into()], false, None, Status::Online)
            .map_err(|e| Error::Discord(format!("invalid presence: {e}")))?;

        for sender in &self.senders {
            sender
                .command(&presence)
                .map_err(|e| Error::Discord(format!("presence update failed: {e}")))?;
        }
        Ok(())
    }
}

pub struct DiscordRuntime {
    token: String,
    http: Arc<HttpClient>,
    cache: Arc<InMemoryCache>,
    event_bus: EventBus,
    shard_tasks: Vec<JoinHandle<()>>,
    shard_senders: Vec<MessageSender>,
}

impl DiscordRuntime {
    pub fn new(token: &str, event_bus: EventBus) -> Self {
        let http = Arc::new(
            ClientBuilder::new()
                .token(token.to_string())
                .timeout(Duration::from_secs(30))
                .build(),
        );
        let cache = Arc::new(
            InMemoryCache::builder()
                .resource_types(ResourceType::GUILD)
                .build(),
        );

        Self {
            token: token.to_string(),
            http,
            cache,
            event_bus,
            shard_tasks: Vec::new(),
            shard_senders: Vec::new(),
        }
    }

    pub fn http(&self) -> Arc<HttpClient> {
        self.http.clone()
    }

    pub fn presence(&self) -> DiscordPresence {
        DiscordPresence {
            senders: self.shard_senders.clone(),
            cache: self.cache.clone(),
        }
    }

    pub fn is_connected(&self) -> bool {
        !self.shard_tasks.is_empty()
    }

    pub async fn connect(&mut self) -> Result<(), Error> {
        if self.is_connected() {
            info!("(DiscordRuntime) Already connected => skipping");
            return Ok(());
        }

        let config = Config::new(self.token.clone(), Intents::GUILDS);

        let shards = gateway::create_recommended(&self.http, config, |_, b| b.build())
            .await
            .map_err(|e| Error::Discord(format!("create_recommended error: {e}")))?;

        for shard in shards {
            self.shard_senders.push(shard.sender());

            let bus_for_shard = self.event_bus.clone();
            let cache_for_shard = self.cache.clone();
            let handle = tokio::spawn(async move {
                shard_runner(shard, bus_for_shard, cache_for_shard).await;
            });
            self.shard_tasks.push(handle);
        }

        info!("(DiscordRuntime) Connected with {} shard(s)", self.shard_tasks.len());
        Ok(())
    }

    /// Closes every shard and waits for the runners to finish.
    pub async fn disconnect(&mut self) {
        for sender in &self.shard_senders {
            let _ = sender.close(CloseFrame::NORMAL);
        }
        for task in &mut self.shard_tasks {
            let _ = task.await;
        }

        self.shard_senders.clear();
        self.shard_tasks.clear();
        info!("(DiscordRuntime) Disconnected.");
    }
}
