// fanwatch-core/src/tasks/guild_events.rs
//
// Reacts to guild membership changes published by the Discord runtime: removal tears down
// every registration of the guild, and any change refreshes the presence text.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{error, info};

use fanwatch_common::traits::api::BotPresence;

use crate::eventbus::{EventBus, MonitorEvent};
use crate::services::registration_service::RegistrationService;
use crate::tasks::status_update::refresh_presence;

pub async fn handle_guild_event(
    event: &MonitorEvent,
    registrations: &RegistrationService,
    presence: Option<&dyn BotPresence>,
) {
    match event {
        MonitorEvent::GuildRemoved { guild_id } => {
            match registrations.remove_guild(guild_id).await {
                Ok(n) => info!("Guild {} removed => deleted {} registration(s)", guild_id, n),
                Err(e) => error!("Error removing registrations for guild {}: {:?}", guild_id, e),
            }
            if let Some(p) = presence {
                refresh_presence(p);
            }
        }
        MonitorEvent::GuildJoined { .. } => {
            if let Some(p) = presence {
                refresh_presence(p);
            }
        }
        MonitorEvent::NotificationSent { .. } => {}
    }
}

pub async fn spawn_guild_events_task(
    event_bus: &EventBus,
    registrations: Arc<RegistrationService>,
    presence: Option<Arc<dyn BotPresence>>,
) -> JoinHandle<()> {
    let rx = event_bus.subscribe(None).await;
    let shutdown_rx = event_bus.shutdown_rx.clone();
    tokio::spawn(run_guild_events(rx, shutdown_rx, registrations, presence))
}

async fn run_guild_events(
    mut rx: mpsc::Receiver<MonitorEvent>,
    mut shutdown_rx: watch::Receiver<bool>,
    registrations: Arc<RegistrationService>,
    presence: Option<Arc<dyn BotPresence>>,
) {
    loop {
        tokio::select! {
            biased;
            maybe_event = rx.recv() => {
                match maybe_event {
                    Some(event) => handle_guild_event(&event, &registrations, presence.as_deref()).await,
                    None => break,
                }
            },
            Ok(_) = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    break;
                }
            }
        }
    }
    info!("Guild events task exited.");
}
