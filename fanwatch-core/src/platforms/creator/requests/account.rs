// fanwatch-core/src/platforms/creator/requests/account.rs

use serde::Deserialize;
use tracing::debug;

use fanwatch_common::models::AccountInfo;

use crate::Error;
use crate::platforms::creator::client::{CreatorApiClient, Fetched};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountRecord {
    pub id: String,
    pub username: String,
    pub display_name: Option<String>,
    pub avatar: Option<MediaRecord>,
}

#[derive(Debug, Deserialize)]
pub struct MediaRecord {
    #[serde(default)]
    pub variants: Vec<MediaVariant>,
    #[serde(default)]
    pub locations: Vec<MediaLocation>,
}

#[derive(Debug, Deserialize)]
pub struct MediaVariant {
    #[serde(default)]
    pub locations: Vec<MediaLocation>,
}

#[derive(Debug, Deserialize)]
pub struct MediaLocation {
    pub location: String,
}

impl AccountRecord {
    /// Variant locations first (best variant first), then the original upload.
    fn avatar_refs(&self) -> Vec<String> {
        let Some(avatar) = self.avatar.as_ref() else {
            return Vec::new();
        };
        avatar
            .variants
            .iter()
            .flat_map(|v| v.locations.iter())
            .chain(avatar.locations.iter())
            .map(|l| l.location.clone())
            .filter(|l| !l.is_empty())
            .collect()
    }
}

impl From<AccountRecord> for AccountInfo {
    fn from(rec: AccountRecord) -> Self {
        let avatar_refs = rec.avatar_refs();
        AccountInfo {
            entity_id: rec.id,
            username: rec.username,
            display_name: rec.display_name,
            avatar_refs,
        }
    }
}

impl CreatorApiClient {
    pub async fn account_by_username(&self, username: &str) -> Result<AccountInfo, Error> {
        let url = self.endpoint("/api/v1/account", &[("usernames", username)])?;
        match self.get_envelope::<Vec<AccountRecord>>(url).await? {
            Fetched::Found(mut list) if !list.is_empty() => {
                let rec = list.swap_remove(0);
                debug!("Resolved {} => {}", username, rec.id);
                Ok(rec.into())
            }
            _ => Err(Error::NotFound(format!("no account found for {}", username))),
        }
    }

    pub async fn self_account(&self) -> Result<AccountInfo, Error> {
        #[derive(Deserialize)]
        struct Me {
            account: AccountRecord,
        }

        let url = self.endpoint("/api/v1/account/me", &[])?;
        match self.get_envelope::<Me>(url).await? {
            Fetched::Found(me) => Ok(me.account.into()),
            Fetched::Missing => Err(Error::NotFound("self account".into())),
        }
    }
}
