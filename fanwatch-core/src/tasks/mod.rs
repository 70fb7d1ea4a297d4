// fanwatch-core/src/tasks/mod.rs

pub mod monitor;
pub mod health_flush;
pub mod heartbeat;
pub mod status_update;
pub mod guild_events;
