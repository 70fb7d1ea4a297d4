// fanwatch-core/src/test_utils/upstream.rs
//
// Scripted creator platform. Responses are set per entity; every call is counted so tests
// can assert how often each entity was fetched.

use std::sync::Mutex;

use async_trait::async_trait;
use dashmap::{DashMap, DashSet};

use fanwatch_common::error::Error;
use fanwatch_common::models::{AccountInfo, ContentItem, StreamState};
use fanwatch_common::traits::api::UpstreamApi;

#[derive(Default)]
pub struct FakeUpstream {
    accounts: DashMap<String, AccountInfo>,
    self_account: Mutex<Option<AccountInfo>>,
    streams: DashMap<String, StreamState>,
    content: DashMap<String, Vec<ContentItem>>,
    following: Mutex<Vec<String>>,

    failing_streams: DashSet<String>,
    failing_content: DashSet<String>,
    failing_accounts: DashSet<String>,
    /// Timeline errors until the entity is followed.
    follow_gated: DashSet<String>,
    unfollowable: DashSet<String>,

    calls: DashMap<String, usize>,
}

impl FakeUpstream {
    pub fn new() -> Self {
        Self::default()
    }

    fn count(&self, call: &str, id: &str) {
        *self.calls.entry(format!("{call}:{id}")).or_insert(0) += 1;
    }

    /// Number of calls of `call` (`account`, `self`, `stream`, `content`, `following`, `follow`)
    /// made for `id`.
    pub fn calls(&self, call: &str, id: &str) -> usize {
        self.calls.get(&format!("{call}:{id}")).map(|v| *v).unwrap_or(0)
    }

    pub fn set_account(&self, account: AccountInfo) {
        self.accounts.insert(account.username.to_lowercase(), account);
    }

    pub fn set_self_account(&self, account: AccountInfo) {
        if let Ok(mut guard) = self.self_account.lock() {
            *guard = Some(account);
        }
    }

    pub fn set_stream(&self, entity_id: &str, state: StreamState) {
        self.streams.insert(entity_id.to_string(), state);
    }

    pub fn set_content(&self, entity_id: &str, items: Vec<ContentItem>) {
        self.content.insert(entity_id.to_string(), items);
    }

    pub fn fail_stream(&self, entity_id: &str) {
        self.failing_streams.insert(entity_id.to_string());
    }

    pub fn fail_content(&self, entity_id: &str) {
        self.failing_content.insert(entity_id.to_string());
    }

    pub fn fail_account(&self, username: &str) {
        self.failing_accounts.insert(username.to_lowercase());
    }

    pub fn gate_content_on_follow(&self, entity_id: &str) {
        self.follow_gated.insert(entity_id.to_string());
    }

    pub fn reject_follow(&self, entity_id: &str) {
        self.unfollowable.insert(entity_id.to_string());
    }

    pub fn following_list(&self) -> Vec<String> {
        self.following.lock().map(|g| g.clone()).unwrap_or_default()
    }

    fn is_following(&self, entity_id: &str) -> bool {
        self.following_list().iter().any(|id| id == entity_id)
    }
}

#[async_trait]
impl UpstreamApi for FakeUpstream {
    async fn fetch_account_info(&self, username: &str) -> Result<AccountInfo, Error> {
        self.count("account", username);
        let lookup = username.to_lowercase();
        if self.failing_accounts.contains(&lookup) {
            return Err(Error::Upstream(format!("account lookup failed for {username}")));
        }
        self.accounts
            .get(&lookup)
            .map(|a| a.clone())
            .ok_or_else(|| Error::NotFound(format!("no account found for {username}")))
    }

    async fn fetch_self_account(&self) -> Result<AccountInfo, Error> {
        self.count("self", "");
        self.self_account
            .lock()
            .ok()
            .and_then(|g| g.clone())
            .ok_or_else(|| Error::NotFound("self account".into()))
    }

    async fn fetch_stream_state(&self, entity_id: &str) -> Result<StreamState, Error> {
        self.count("stream", entity_id);
        if self.failing_streams.contains(entity_id) {
            return Err(Error::Upstream(format!("stream fetch failed for {entity_id}")));
        }
        Ok(self
            .streams
            .get(entity_id)
            .map(|s| s.clone())
            .unwrap_or_else(StreamState::offline))
    }

    async fn fetch_latest_content(&self, entity_id: &str) -> Result<Vec<ContentItem>, Error> {
        self.count("content", entity_id);
        if self.failing_content.contains(entity_id)
            || (self.follow_gated.contains(entity_id) && !self.is_following(entity_id))
        {
            return Err(Error::Upstream(format!("timeline not accessible for {entity_id}")));
        }
        Ok(self
            .content
            .get(entity_id)
            .map(|c| c.clone())
            .unwrap_or_default())
    }

    async fn fetch_following(&self, self_entity_id: &str) -> Result<Vec<String>, Error> {
        self.count("following", self_entity_id);
        Ok(self.following_list())
    }

    async fn follow_entity(&self, entity_id: &str) -> Result<(), Error> {
        self.count("follow", entity_id);
        if self.unfollowable.contains(entity_id) {
            return Err(Error::Upstream(format!("cannot follow {entity_id}")));
        }
        if let Ok(mut guard) = self.following.lock() {
            if !guard.iter().any(|id| id == entity_id) {
                guard.push(entity_id.to_string());
            }
        }
        Ok(())
    }
}
