// fanwatch-core/src/platforms/creator/requests/timeline.rs

use serde::Deserialize;

use fanwatch_common::models::ContentItem;

use crate::Error;
use crate::platforms::creator::client::{CreatorApiClient, Fetched};

#[derive(Debug, Deserialize)]
pub struct TimelineRecord {
    #[serde(default)]
    pub posts: Vec<PostRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostRecord {
    pub id: String,
    #[serde(default)]
    pub content: String,
    /// Seconds.
    #[serde(default)]
    pub created_at: i64,
}

impl From<PostRecord> for ContentItem {
    fn from(rec: PostRecord) -> Self {
        ContentItem {
            id: rec.id,
            content: rec.content,
            created_at: rec.created_at,
        }
    }
}

impl CreatorApiClient {
    /// Newest posts first, as the timeline returns them.
    pub async fn latest_posts(&self, entity_id: &str) -> Result<Vec<ContentItem>, Error> {
        let url = self.endpoint(
            &format!("/api/v1/timelinenew/{}", entity_id),
            &[("before", "0"), ("after", "0"), ("wall_id", ""), ("contentSearch", "")],
        )?;
        Ok(match self.get_envelope::<TimelineRecord>(url).await? {
            Fetched::Found(t) => t.posts.into_iter().map(ContentItem::from).collect(),
            Fetched::Missing => Vec::new(),
        })
    }
}
