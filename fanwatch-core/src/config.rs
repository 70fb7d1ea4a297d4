// fanwatch-core/src/config.rs
//
// Runtime configuration. Everything is a plain scalar read from the environment
// (optionally seeded from a `.env` file), with defaults and minimum clamps applied here
// so the rest of the crate never re-validates.

use std::path::Path;
use std::time::Duration;

use tracing::{info, warn};

use crate::Error;

pub const DEFAULT_DATABASE_URL: &str = "postgres://fanwatch@localhost:5432/fanwatch";
pub const DEFAULT_CREATOR_API_URL: &str = "https://apiv3.fansly.com";
pub const DEFAULT_CREATOR_WEB_URL: &str = "https://fansly.com";

const DEFAULT_MONITOR_INTERVAL_SECS: u64 = 60;
const MIN_MONITOR_INTERVAL_SECS: u64 = 10;
const DEFAULT_WORKER_COUNT: i64 = 5;
const DEFAULT_QUEUE_CAPACITY: i64 = 100;
const DEFAULT_AVATAR_REFRESH_HOURS: u64 = 24;
const DEFAULT_STATUS_UPDATE_MINUTES: u64 = 5;
const DEFAULT_HEALTH_FLUSH_SECS: u64 = 30;
const MIN_HEALTH_FLUSH_SECS: u64 = 5;
const DEFAULT_HEARTBEAT_SECS: u64 = 120;
const MIN_HEARTBEAT_SECS: u64 = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct MonitorConfig {
    pub discord_token: String,
    pub database_url: String,

    pub creator_api_token: String,
    pub creator_api_url: String,
    pub creator_web_url: String,
    pub creator_user_agent: String,

    pub monitor_interval: Duration,
    pub worker_count: usize,
    pub queue_capacity: usize,
    pub avatar_refresh_interval: Duration,
    /// 0 means unlimited.
    pub max_monitored_per_guild: i64,
    pub status_update_interval: Duration,
    pub health_flush_interval: Duration,
    pub heartbeat_interval: Duration,
    pub health_service_name: String,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            discord_token: String::new(),
            database_url: DEFAULT_DATABASE_URL.to_string(),
            creator_api_token: String::new(),
            creator_api_url: DEFAULT_CREATOR_API_URL.to_string(),
            creator_web_url: DEFAULT_CREATOR_WEB_URL.to_string(),
            creator_user_agent: default_user_agent(),
            monitor_interval: Duration::from_secs(DEFAULT_MONITOR_INTERVAL_SECS),
            worker_count: DEFAULT_WORKER_COUNT as usize,
            queue_capacity: DEFAULT_QUEUE_CAPACITY as usize,
            avatar_refresh_interval: Duration::from_secs(DEFAULT_AVATAR_REFRESH_HOURS * 3600),
            max_monitored_per_guild: 0,
            status_update_interval: Duration::from_secs(DEFAULT_STATUS_UPDATE_MINUTES * 60),
            health_flush_interval: Duration::from_secs(DEFAULT_HEALTH_FLUSH_SECS),
            heartbeat_interval: Duration::from_secs(DEFAULT_HEARTBEAT_SECS),
            health_service_name: "creator_api".to_string(),
        }
    }
}

fn default_user_agent() -> String {
    format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}

impl MonitorConfig {
    /// Loads `.env` (or the given file) into the process environment, then reads the config.
    pub fn load(env_file: Option<&Path>) -> Result<Self, Error> {
        match env_file {
            Some(path) => {
                dotenv::from_path(path)
                    .map_err(|e| Error::Config(format!("could not read {}: {}", path.display(), e)))?;
                info!("Loaded environment from {}", path.display());
            }
            None => {
                if dotenv::dotenv().is_ok() {
                    info!("Loaded environment from .env");
                }
            }
        }
        Self::from_env()
    }

    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup. Missing or unparseable values
    /// fall back to defaults; only the two tokens are required.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let text = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let discord_token = text("DISCORD_TOKEN")
            .ok_or_else(|| Error::Config("DISCORD_TOKEN is not set".into()))?;
        let creator_api_token = text("CREATOR_API_TOKEN")
            .ok_or_else(|| Error::Config("CREATOR_API_TOKEN is not set".into()))?;

        let monitor_secs = number(&lookup, "MONITOR_INTERVAL_SECONDS", DEFAULT_MONITOR_INTERVAL_SECS as i64)
            .max(MIN_MONITOR_INTERVAL_SECS as i64) as u64;
        let avatar_hours = number(&lookup, "AVATAR_REFRESH_INTERVAL_HOURS", DEFAULT_AVATAR_REFRESH_HOURS as i64)
            .max(1) as u64;
        let status_minutes = number(&lookup, "STATUS_UPDATE_INTERVAL_MINUTES", DEFAULT_STATUS_UPDATE_MINUTES as i64)
            .max(1) as u64;
        let flush_secs = number(&lookup, "HEALTH_FLUSH_INTERVAL_SECONDS", DEFAULT_HEALTH_FLUSH_SECS as i64)
            .max(MIN_HEALTH_FLUSH_SECS as i64) as u64;
        let heartbeat_secs = number(&lookup, "HEARTBEAT_INTERVAL_SECONDS", DEFAULT_HEARTBEAT_SECS as i64)
            .max(MIN_HEARTBEAT_SECS as i64) as u64;

        Ok(Self {
            discord_token,
            database_url: text("DATABASE_URL").unwrap_or(defaults.database_url),
            creator_api_token,
            creator_api_url: text("CREATOR_API_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or(defaults.creator_api_url),
            creator_web_url: text("CREATOR_WEB_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or(defaults.creator_web_url),
            creator_user_agent: text("CREATOR_USER_AGENT").unwrap_or(defaults.creator_user_agent),
            monitor_interval: Duration::from_secs(monitor_secs),
            worker_count: clamp_worker_count(number(&lookup, "MONITOR_WORKER_COUNT", DEFAULT_WORKER_COUNT)),
            queue_capacity: number(&lookup, "MONITOR_QUEUE_CAPACITY", DEFAULT_QUEUE_CAPACITY).max(1) as usize,
            avatar_refresh_interval: Duration::from_secs(avatar_hours * 3600),
            max_monitored_per_guild: number(&lookup, "MAX_MONITORED_USERS_PER_GUILD", 0).max(0),
            status_update_interval: Duration::from_secs(status_minutes * 60),
            health_flush_interval: Duration::from_secs(flush_secs),
            heartbeat_interval: Duration::from_secs(heartbeat_secs),
            health_service_name: text("HEALTH_SERVICE_NAME").unwrap_or(defaults.health_service_name),
        })
    }
}

/// Non-positive worker counts are clamped to a single worker.
pub fn clamp_worker_count(configured: i64) -> usize {
    if configured <= 0 { 1 } else { configured as usize }
}

fn number<F>(lookup: &F, key: &str, default: i64) -> i64
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => match raw.trim().parse::<i64>() {
            Ok(v) => v,
            Err(e) => {
                warn!("Invalid value '{}' for {}: {}. Using default {}.", raw, key, e, default);
                default
            }
        },
        _ => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_only_tokens_set() {
        let cfg = MonitorConfig::from_lookup(lookup_from(&[
            ("DISCORD_TOKEN", "d"),
            ("CREATOR_API_TOKEN", "c"),
        ]))
        .unwrap();

        assert_eq!(cfg.monitor_interval, Duration::from_secs(60));
        assert_eq!(cfg.worker_count, 5);
        assert_eq!(cfg.queue_capacity, 100);
        assert_eq!(cfg.avatar_refresh_interval, Duration::from_secs(24 * 3600));
        assert_eq!(cfg.max_monitored_per_guild, 0);
        assert_eq!(cfg.health_flush_interval, Duration::from_secs(30));
        assert_eq!(cfg.database_url, DEFAULT_DATABASE_URL);
    }

    #[test]
    fn test_missing_token_is_an_error() {
        let res = MonitorConfig::from_lookup(lookup_from(&[("DISCORD_TOKEN", "d")]));
        assert!(matches!(res, Err(Error::Config(_))));
    }

    #[test]
    fn test_clamps_apply() {
        let cfg = MonitorConfig::from_lookup(lookup_from(&[
            ("DISCORD_TOKEN", "d"),
            ("CREATOR_API_TOKEN", "c"),
            ("MONITOR_WORKER_COUNT", "-3"),
            ("MONITOR_INTERVAL_SECONDS", "1"),
            ("AVATAR_REFRESH_INTERVAL_HOURS", "0"),
            ("MONITOR_QUEUE_CAPACITY", "0"),
            ("HEALTH_FLUSH_INTERVAL_SECONDS", "1"),
            ("MAX_MONITORED_USERS_PER_GUILD", "-7"),
        ]))
        .unwrap();

        assert_eq!(cfg.worker_count, 1);
        assert_eq!(cfg.monitor_interval, Duration::from_secs(10));
        assert_eq!(cfg.avatar_refresh_interval, Duration::from_secs(3600));
        assert_eq!(cfg.queue_capacity, 1);
        assert_eq!(cfg.health_flush_interval, Duration::from_secs(5));
        assert_eq!(cfg.max_monitored_per_guild, 0);
    }

    #[test]
    fn test_garbage_numbers_fall_back_to_default() {
        let cfg = MonitorConfig::from_lookup(lookup_from(&[
            ("DISCORD_TOKEN", "d"),
            ("CREATOR_API_TOKEN", "c"),
            ("MONITOR_WORKER_COUNT", "lots"),
            ("CREATOR_API_URL", "https://api.example.test/"),
        ]))
        .unwrap();

        assert_eq!(cfg.worker_count, 5);
        assert_eq!(cfg.creator_api_url, "https://api.example.test");
    }

    #[test]
    fn test_clamp_worker_count() {
        assert_eq!(clamp_worker_count(0), 1);
        assert_eq!(clamp_worker_count(-1), 1);
        assert_eq!(clamp_worker_count(8), 8);
    }
}
