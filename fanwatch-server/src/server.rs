// fanwatch-server/src/server.rs
//
// Builds every collaborator from the config and runs either the long-lived service or a
// single monitor cycle.

use std::sync::Arc;

use tracing::{error, info, warn};

use fanwatch_common::traits::api::{BotPresence, NotificationSink, UpstreamApi};
use fanwatch_common::traits::repository_traits::{
    GuildSubscriptionRepository, NotificationOverrideRepository, StatsRepository, WatchRepository,
};
use fanwatch_core::config::MonitorConfig;
use fanwatch_core::eventbus::stats_recorder::spawn_stats_recorder_task;
use fanwatch_core::eventbus::EventBus;
use fanwatch_core::health::HealthAggregator;
use fanwatch_core::platforms::creator::CreatorApiClient;
use fanwatch_core::platforms::discord::{DiscordNotificationSink, DiscordRuntime};
use fanwatch_core::repositories::{
    PostgresGuildSubscriptionRepository, PostgresNotificationOverrideRepository,
    PostgresStatsRepository, PostgresWatchRepository,
};
use fanwatch_core::services::detectors::DetectorContext;
use fanwatch_core::services::{MonitorService, RegistrationService};
use fanwatch_core::tasks::guild_events::spawn_guild_events_task;
use fanwatch_core::tasks::health_flush::spawn_health_flush_task;
use fanwatch_core::tasks::heartbeat::spawn_heartbeat_task;
use fanwatch_core::tasks::monitor::{run_single_cycle, spawn_monitor_task};
use fanwatch_core::tasks::status_update::spawn_status_update_task;
use fanwatch_core::{Database, Error};

use crate::Args;

const STATS_RECORDER_BUFFER: usize = 1000;

/// Everything both run modes share.
struct ServerContext {
    config: MonitorConfig,
    watch_repo: Arc<dyn WatchRepository>,
    override_repo: Arc<dyn NotificationOverrideRepository>,
    subscription_repo: Arc<dyn GuildSubscriptionRepository>,
    stats_repo: Arc<dyn StatsRepository>,
    health: Arc<HealthAggregator>,
    upstream: Arc<dyn UpstreamApi>,
    event_bus: EventBus,
    discord: DiscordRuntime,
}

impl ServerContext {
    async fn build(args: &Args) -> Result<Self, Error> {
        let config = MonitorConfig::load(args.env_file.as_deref())?;

        info!("Using Postgres at {}", redact(&config.database_url));
        let db = Database::new(&config.database_url).await?;
        if args.skip_migrations {
            warn!("--skip-migrations given; assuming the schema is current.");
        } else {
            db.migrate().await?;
        }

        let health = HealthAggregator::new();
        let upstream = CreatorApiClient::new(
            &config.creator_api_url,
            &config.creator_api_token,
            &config.creator_user_agent,
            health.clone(),
        )?;

        let event_bus = EventBus::new();
        let discord = DiscordRuntime::new(&config.discord_token, event_bus.clone());

        Ok(Self {
            watch_repo: Arc::new(PostgresWatchRepository::new(db.pool().clone())),
            override_repo: Arc::new(PostgresNotificationOverrideRepository::new(db.pool().clone())),
            subscription_repo: Arc::new(PostgresGuildSubscriptionRepository::new(db.pool().clone())),
            stats_repo: Arc::new(PostgresStatsRepository::new(db.pool().clone())),
            health,
            upstream: Arc::new(upstream),
            event_bus,
            discord,
            config,
        })
    }

    fn monitor_service(&self) -> Arc<MonitorService> {
        let sink: Arc<dyn NotificationSink> = Arc::new(DiscordNotificationSink::new(self.discord.http()));
        let detectors = DetectorContext {
            watch_repo: self.watch_repo.clone(),
            override_repo: self.override_repo.clone(),
            sink,
            event_bus: self.event_bus.clone(),
            web_url: self.config.creator_web_url.clone(),
        };
        Arc::new(MonitorService::new(
            self.upstream.clone(),
            detectors,
            self.config.avatar_refresh_interval,
        ))
    }

    fn registration_service(&self) -> Arc<RegistrationService> {
        Arc::new(RegistrationService::new(
            self.watch_repo.clone(),
            self.override_repo.clone(),
            self.subscription_repo.clone(),
            self.upstream.clone(),
            self.config.max_monitored_per_guild,
        ))
    }
}

/// Connection strings carry credentials; only the part after `@` is logged.
fn redact(url: &str) -> &str {
    url.rsplit_once('@').map(|(_, host)| host).unwrap_or(url)
}

pub async fn run_server(args: Args) -> Result<(), Error> {
    let mut ctx = ServerContext::build(&args).await?;
    let cfg = ctx.config.clone();

    let stats_handle =
        spawn_stats_recorder_task(&ctx.event_bus, ctx.stats_repo.clone(), STATS_RECORDER_BUFFER).await;

    ctx.discord.connect().await?;
    let presence: Arc<dyn BotPresence> = Arc::new(ctx.discord.presence());

    let guild_events_handle = spawn_guild_events_task(
        &ctx.event_bus,
        ctx.registration_service(),
        Some(presence.clone()),
    )
    .await;

    let shutdown_rx = ctx.event_bus.shutdown_rx.clone();
    let monitor = spawn_monitor_task(
        ctx.watch_repo.clone(),
        ctx.monitor_service(),
        cfg.monitor_interval,
        cfg.worker_count,
        cfg.queue_capacity,
        shutdown_rx.clone(),
    );
    let health_handle = spawn_health_flush_task(
        ctx.health.clone(),
        ctx.stats_repo.clone(),
        cfg.health_service_name.clone(),
        cfg.health_flush_interval,
        shutdown_rx.clone(),
    );
    let heartbeat_handle = spawn_heartbeat_task(ctx.stats_repo.clone(), cfg.heartbeat_interval, shutdown_rx.clone());
    let status_handle = spawn_status_update_task(presence, cfg.status_update_interval, shutdown_rx);

    info!("fanwatch is running. Press Ctrl-C to stop.");
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl-C: {:?}", e);
    }
    info!("Ctrl-C detected; shutting down...");
    ctx.event_bus.shutdown();

    monitor.join().await;
    ctx.discord.disconnect().await;
    for handle in [guild_events_handle, health_handle, heartbeat_handle, status_handle, stats_handle] {
        let _ = handle.await;
    }

    info!("Shutdown complete.");
    Ok(())
}

/// One full monitor cycle, then a final health flush. Notifications go out over REST only.
pub async fn run_once(args: Args) -> Result<(), Error> {
    let ctx = ServerContext::build(&args).await?;
    let stats_handle =
        spawn_stats_recorder_task(&ctx.event_bus, ctx.stats_repo.clone(), STATS_RECORDER_BUFFER).await;

    let dispatched = run_single_cycle(
        ctx.watch_repo.as_ref(),
        ctx.monitor_service(),
        ctx.config.worker_count,
        ctx.config.queue_capacity,
    )
    .await?;
    info!("Single cycle processed {} entity group(s).", dispatched);

    if let Err(e) = ctx
        .health
        .flush(&ctx.config.health_service_name, ctx.stats_repo.as_ref())
        .await
    {
        warn!("Final health flush failed: {:?}", e);
    }

    ctx.event_bus.shutdown();
    let _ = stats_handle.await;
    Ok(())
}
