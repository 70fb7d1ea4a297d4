// fanwatch-core/src/platforms/creator/requests/follow.rs

use serde::Deserialize;
use tracing::info;

use crate::Error;
use crate::platforms::creator::client::{CreatorApiClient, Fetched};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowRecord {
    pub account_id: String,
}

impl CreatorApiClient {
    pub async fn following(&self, self_entity_id: &str) -> Result<Vec<String>, Error> {
        let url = self.endpoint(
            &format!("/api/v1/account/{}/following", self_entity_id),
            &[("before", "0"), ("after", "0"), ("limit", "100"), ("offset", "0")],
        )?;
        Ok(match self.get_envelope::<Vec<FollowRecord>>(url).await? {
            Fetched::Found(list) => list.into_iter().map(|f| f.account_id).collect(),
            Fetched::Missing => Vec::new(),
        })
    }

    pub async fn follow(&self, entity_id: &str) -> Result<(), Error> {
        let url = self.endpoint(&format!("/api/v1/account/{}/followers", entity_id), &[])?;
        match self
            .post_envelope::<serde_json::Value>(url, &serde_json::json!({}))
            .await?
        {
            Fetched::Found(_) => {
                info!("Followed entity {}", entity_id);
                Ok(())
            }
            Fetched::Missing => Err(Error::NotFound(format!("entity {} cannot be followed", entity_id))),
        }
    }
}
