// fanwatch-core/src/repositories/postgres/mod.rs

pub mod watch;
pub mod overrides;
pub mod stats;
pub mod subscriptions;
