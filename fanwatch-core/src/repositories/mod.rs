// fanwatch-core/src/repositories/mod.rs

pub mod postgres;

pub use postgres::watch::PostgresWatchRepository;
pub use postgres::overrides::PostgresNotificationOverrideRepository;
pub use postgres::stats::PostgresStatsRepository;
pub use postgres::subscriptions::PostgresGuildSubscriptionRepository;
