// File: fanwatch-common/src/models/upstream.rs
//
// Values fetched from the creator platform. Read-only once fetched.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountInfo {
    pub entity_id: String,
    pub username: String,
    pub display_name: Option<String>,
    /// Avatar locations, best variant first.
    pub avatar_refs: Vec<String>,
}

impl AccountInfo {
    pub fn primary_avatar(&self) -> Option<&str> {
        self.avatar_refs.first().map(String::as_str)
    }

    /// Name shown to subscribers: display name when set, else the username.
    pub fn shown_name(&self) -> &str {
        match self.display_name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => &self.username,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamStatus {
    Offline,
    Starting,
    Live,
}

impl StreamStatus {
    /// Maps the platform's numeric channel status.
    pub fn from_code(code: i64) -> Self {
        match code {
            2 => StreamStatus::Live,
            1 => StreamStatus::Starting,
            _ => StreamStatus::Offline,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamState {
    pub status: StreamStatus,
    /// Stream start as reported upstream (milliseconds), `0` when unknown.
    pub started_at: i64,
    pub title: Option<String>,
    pub viewer_count: Option<u64>,
}

impl StreamState {
    pub fn offline() -> Self {
        Self {
            status: StreamStatus::Offline,
            started_at: 0,
            title: None,
            viewer_count: None,
        }
    }

    pub fn is_live(&self) -> bool {
        self.status == StreamStatus::Live
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: String,
    pub content: String,
    /// Unix seconds.
    pub created_at: i64,
}

/// Everything fetched for one entity in one cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamSnapshot {
    pub entity_id: String,
    pub stream: Option<StreamState>,
    /// Newest first.
    pub content: Vec<ContentItem>,
}

impl UpstreamSnapshot {
    pub fn newest_item(&self) -> Option<&ContentItem> {
        self.content.first()
    }
}
