// File: fanwatch-common/src/models/notification.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Platform-neutral embed payload that accompanies the text of a notification.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RichContent {
    pub title: String,
    pub url: Option<String>,
    pub description: Option<String>,
    pub author_name: Option<String>,
    pub author_icon_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub image_url: Option<String>,
    pub color: u32,
    pub footer: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
}

/// A fully rendered notification, ready for the sink.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundNotification {
    pub channel_id: String,
    pub text: String,
    pub rich: RichContent,
}

/// Liveness row written by the heartbeat task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceStatus {
    pub service_name: String,
    pub status: String,
    pub last_heartbeat: DateTime<Utc>,
    pub details: Option<String>,
}
