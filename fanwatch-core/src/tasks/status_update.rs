// fanwatch-core/src/tasks/status_update.rs

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, info, warn};

use fanwatch_common::traits::api::BotPresence;

pub fn watching_text(guild_count: usize) -> String {
    if guild_count == 1 {
        "1 server".to_string()
    } else {
        format!("{} servers", guild_count)
    }
}

pub fn refresh_presence(presence: &dyn BotPresence) {
    let text = watching_text(presence.guild_count());
    match presence.set_watching(&text) {
        Ok(()) => debug!("Presence set to 'Watching {}'", text),
        Err(e) => warn!("Could not update presence: {:?}", e),
    }
}

/// Refreshes "Watching N servers" immediately and then every `period`.
pub fn spawn_status_update_task(
    presence: Arc<dyn BotPresence>,
    period: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(period);
        loop {
            tokio::select! {
                _ = ticker.tick() => refresh_presence(presence.as_ref()),
                Ok(_) = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        break;
                    }
                }
            }
        }
        info!("Status update task exited.");
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_watching_text() {
        assert_eq!(watching_text(0), "0 servers");
        assert_eq!(watching_text(1), "1 server");
        assert_eq!(watching_text(42), "42 servers");
    }
}
