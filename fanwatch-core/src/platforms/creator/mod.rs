// fanwatch-core/src/platforms/creator/mod.rs

pub mod client;
pub mod requests;

use async_trait::async_trait;

use fanwatch_common::models::{AccountInfo, ContentItem, StreamState};
use fanwatch_common::traits::api::UpstreamApi;

use crate::Error;
pub use client::CreatorApiClient;

#[async_trait]
impl UpstreamApi for CreatorApiClient {
    async fn fetch_account_info(&self, username: &str) -> Result<AccountInfo, Error> {
        self.account_by_username(username).await
    }

    async fn fetch_self_account(&self) -> Result<AccountInfo, Error> {
        self.self_account().await
    }

    async fn fetch_stream_state(&self, entity_id: &str) -> Result<StreamState, Error> {
        self.stream_state(entity_id).await
    }

    async fn fetch_latest_content(&self, entity_id: &str) -> Result<Vec<ContentItem>, Error> {
        self.latest_posts(entity_id).await
    }

    async fn fetch_following(&self, self_entity_id: &str) -> Result<Vec<String>, Error> {
        self.following(self_entity_id).await
    }

    async fn follow_entity(&self, entity_id: &str) -> Result<(), Error> {
        self.follow(entity_id).await
    }
}
