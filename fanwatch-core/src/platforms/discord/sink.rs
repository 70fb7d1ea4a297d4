// fanwatch-core/src/platforms/discord/sink.rs

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;
use twilight_http::Client as HttpClient;
use twilight_model::id::Id;
use twilight_model::id::marker::ChannelMarker;

use fanwatch_common::models::RichContent;
use fanwatch_common::traits::api::NotificationSink;

use crate::Error;
use crate::platforms::discord::embed::build_embed;

pub fn parse_channel_id(channel: &str) -> Result<Id<ChannelMarker>, Error> {
    channel
        .parse::<u64>()
        .ok()
        .and_then(Id::<ChannelMarker>::new_checked)
        .ok_or_else(|| Error::Discord(format!("Invalid channel ID: {channel}")))
}

/// Delivers notifications as one message with text content and a single embed.
pub struct DiscordNotificationSink {
    http: Arc<HttpClient>,
}

impl DiscordNotificationSink {
    pub fn new(http: Arc<HttpClient>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl NotificationSink for DiscordNotificationSink {
    async fn send(&self, channel_id: &str, text: &str, rich: &RichContent) -> Result<(), Error> {
        let channel = parse_channel_id(channel_id)?;
        let embeds = [build_embed(rich)?];

        let mut request = self.http.create_message(channel).embeds(&embeds);
        if !text.is_empty() {
            request = request.content(text);
        }

        request
            .await
            .map_err(|e| Error::Discord(format!("Error sending Discord message: {e:?}")))?;

        debug!("Sent notification to channel {}", channel_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_channel_id() {
        assert_eq!(parse_channel_id("123456789").unwrap().get(), 123456789);
        assert!(parse_channel_id("0").is_err());
        assert!(parse_channel_id("general").is_err());
    }
}
