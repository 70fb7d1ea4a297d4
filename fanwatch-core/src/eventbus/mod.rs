//! fanwatch-core/src/eventbus/mod.rs
//!
//! In-process event bus with guaranteed delivery to every subscriber through
//! bounded MPSC queues, plus a shared shutdown signal.

pub mod stats_recorder;

use std::sync::Arc;
use tokio::sync::{mpsc, watch, Mutex};

use fanwatch_common::models::NotificationKind;

/// Events published by the monitor and the Discord runtime.
#[derive(Debug, Clone, PartialEq)]
pub enum MonitorEvent {
    /// A notification was delivered to a guild channel.
    NotificationSent {
        kind: NotificationKind,
        guild_id: String,
        entity_id: String,
    },

    /// The bot became a member of a guild (or the guild came back online).
    GuildJoined { guild_id: String },

    /// The bot was removed from a guild. Not sent for outages.
    GuildRemoved { guild_id: String },
}

impl MonitorEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            MonitorEvent::NotificationSent { .. } => "notification.sent",
            MonitorEvent::GuildJoined { .. } => "guild.joined",
            MonitorEvent::GuildRemoved { .. } => "guild.removed",
        }
    }
}

/// Each subscriber gets its own `mpsc::Sender<MonitorEvent>`.
///
/// - If a subscriber's buffer fills, `publish` awaits until there is space.
/// - A subscriber that dropped its `Receiver` is skipped silently.
#[derive(Clone)]
pub struct EventBus {
    subscribers: Arc<Mutex<Vec<mpsc::Sender<MonitorEvent>>>>,
    shutdown_tx: watch::Sender<bool>,
    pub shutdown_rx: watch::Receiver<bool>,
}

const DEFAULT_BUFFER_SIZE: usize = 1000;

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            subscribers: Arc::new(Mutex::new(vec![])),
            shutdown_tx: tx,
            shutdown_rx: rx,
        }
    }

    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    pub fn is_shutdown(&self) -> bool {
        *self.shutdown_rx.borrow()
    }

    /// Returns a receiver on which events will be delivered.
    pub async fn subscribe(&self, buffer_size: Option<usize>) -> mpsc::Receiver<MonitorEvent> {
        let size = buffer_size.unwrap_or(DEFAULT_BUFFER_SIZE);
        let (tx, rx) = mpsc::channel(size);
        let mut subs = self.subscribers.lock().await;
        subs.push(tx);
        rx
    }

    /// Publish an event to all subscribers.
    pub async fn publish(&self, event: MonitorEvent) {
        let senders = {
            let subs = self.subscribers.lock().await;
            subs.clone()
        };
        for s in senders {
            let _ = s.send(event.clone()).await;
        }
    }

    pub async fn publish_sent(&self, kind: NotificationKind, guild_id: &str, entity_id: &str) {
        self.publish(MonitorEvent::NotificationSent {
            kind,
            guild_id: guild_id.to_string(),
            entity_id: entity_id.to_string(),
        })
        .await;
    }
}
