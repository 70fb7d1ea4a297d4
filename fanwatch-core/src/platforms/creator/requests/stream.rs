// fanwatch-core/src/platforms/creator/requests/stream.rs

use serde::Deserialize;

use fanwatch_common::models::{StreamState, StreamStatus};

use crate::Error;
use crate::platforms::creator::client::{CreatorApiClient, Fetched};

#[derive(Debug, Deserialize)]
pub struct ChannelRecord {
    pub stream: Option<StreamRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamRecord {
    #[serde(default)]
    pub status: i64,
    /// Milliseconds.
    #[serde(default)]
    pub started_at: i64,
    pub title: Option<String>,
    pub viewer_count: Option<u64>,
}

impl From<StreamRecord> for StreamState {
    fn from(rec: StreamRecord) -> Self {
        StreamState {
            status: StreamStatus::from_code(rec.status),
            started_at: rec.started_at,
            title: rec.title,
            viewer_count: rec.viewer_count,
        }
    }
}

impl CreatorApiClient {
    /// A creator without a streaming channel is reported as offline, not as an error.
    pub async fn stream_state(&self, entity_id: &str) -> Result<StreamState, Error> {
        let url = self.endpoint(&format!("/api/v1/streaming/channel/{}", entity_id), &[])?;
        Ok(match self.get_envelope::<ChannelRecord>(url).await? {
            Fetched::Found(ChannelRecord { stream: Some(s) }) => s.into(),
            _ => StreamState::offline(),
        })
    }
}
