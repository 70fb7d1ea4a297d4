// fanwatch-core/src/platforms/discord/embed.rs

use tracing::warn;
use twilight_model::channel::message::Embed;
use twilight_model::util::Timestamp;
use twilight_util::builder::embed::{EmbedAuthorBuilder, EmbedBuilder, EmbedFooterBuilder, ImageSource};

use fanwatch_common::models::RichContent;

use crate::Error;

fn image(url: &str) -> Option<ImageSource> {
    match ImageSource::url(url) {
        Ok(src) => Some(src),
        Err(e) => {
            warn!("Dropping invalid embed image url '{}': {}", url, e);
            None
        }
    }
}

/// Converts the platform-neutral payload into a Discord embed. Unusable image URLs are
/// dropped rather than failing the whole notification.
pub fn build_embed(rich: &RichContent) -> Result<Embed, Error> {
    let mut builder = EmbedBuilder::new().title(rich.title.clone()).color(rich.color);

    if let Some(url) = &rich.url {
        builder = builder.url(url.clone());
    }
    if let Some(desc) = &rich.description {
        builder = builder.description(desc.clone());
    }
    if let Some(name) = &rich.author_name {
        let mut author = EmbedAuthorBuilder::new(name.clone());
        if let Some(icon) = rich.author_icon_url.as_deref().and_then(image) {
            author = author.icon_url(icon);
        }
        builder = builder.author(author);
    }
    if let Some(thumb) = rich.thumbnail_url.as_deref().and_then(image) {
        builder = builder.thumbnail(thumb);
    }
    if let Some(img) = rich.image_url.as_deref().and_then(image) {
        builder = builder.image(img);
    }
    if let Some(footer) = &rich.footer {
        builder = builder.footer(EmbedFooterBuilder::new(footer.clone()));
    }
    if let Some(ts) = rich.timestamp {
        match Timestamp::from_secs(ts.timestamp()) {
            Ok(t) => builder = builder.timestamp(t),
            Err(e) => warn!("Dropping embed timestamp {}: {}", ts, e),
        }
    }

    builder
        .validate()
        .map(|b| b.build())
        .map_err(|e| Error::Discord(format!("invalid embed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_build_embed_full() {
        let rich = RichContent {
            title: "alice is now live!".into(),
            url: Some("https://creator.test/live/alice".into()),
            description: Some("hello".into()),
            author_name: Some("alice".into()),
            author_icon_url: Some("https://cdn.test/a.png".into()),
            thumbnail_url: Some("https://cdn.test/a.png".into()),
            image_url: Some("not a url".into()),
            color: 0x123456,
            footer: Some("Live now".into()),
            timestamp: Utc.timestamp_opt(1_700_000_000, 0).single(),
        };

        let embed = build_embed(&rich).unwrap();
        assert_eq!(embed.title.as_deref(), Some("alice is now live!"));
        assert_eq!(embed.color, Some(0x123456));
        assert!(embed.thumbnail.is_some());
        assert!(embed.image.is_none());
        assert!(embed.timestamp.is_some());
        assert_eq!(embed.author.map(|a| a.name), Some("alice".to_string()));
    }
}
