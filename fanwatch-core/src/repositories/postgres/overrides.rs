// fanwatch-core/src/repositories/postgres/overrides.rs
//
// Message templates and embed colours per (guild, creator), in "notification_overrides".
// Colours are 24-bit RGB kept in a BIGINT column.

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row};

use fanwatch_common::error::Error;
use fanwatch_common::models::NotificationOverride;
use fanwatch_common::traits::repository_traits::NotificationOverrideRepository;

#[derive(Clone)]
pub struct PostgresNotificationOverrideRepository {
    pool: Pool<Postgres>,
}

impl PostgresNotificationOverrideRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn color_from_db(v: Option<i64>) -> Option<u32> {
    v.and_then(|c| u32::try_from(c).ok())
}

fn row_to_override(r: &PgRow) -> Result<NotificationOverride, Error> {
    Ok(NotificationOverride {
        guild_id:            r.try_get("guild_id")?,
        entity_id:           r.try_get("entity_id")?,
        post_message_format: r.try_get("post_message_format")?,
        live_message_format: r.try_get("live_message_format")?,
        post_embed_color:    color_from_db(r.try_get("post_embed_color")?),
        live_embed_color:    color_from_db(r.try_get("live_embed_color")?),
    })
}

#[async_trait]
impl NotificationOverrideRepository for PostgresNotificationOverrideRepository {
    async fn get_override(&self, guild_id: &str, entity_id: &str) -> Result<Option<NotificationOverride>, Error> {
        let row_opt = sqlx::query(
            r#"
            SELECT guild_id, entity_id, post_message_format, live_message_format,
                   post_embed_color, live_embed_color
            FROM notification_overrides
            WHERE guild_id = $1 AND entity_id = $2
            "#,
        )
            .bind(guild_id)
            .bind(entity_id)
            .fetch_optional(&self.pool)
            .await?;

        row_opt.as_ref().map(row_to_override).transpose()
    }

    async fn list_overrides_for_entity(&self, entity_id: &str) -> Result<HashMap<String, NotificationOverride>, Error> {
        let rows = sqlx::query(
            r#"
            SELECT guild_id, entity_id, post_message_format, live_message_format,
                   post_embed_color, live_embed_color
            FROM notification_overrides
            WHERE entity_id = $1
            "#,
        )
            .bind(entity_id)
            .fetch_all(&self.pool)
            .await?;

        let mut out = HashMap::with_capacity(rows.len());
        for r in &rows {
            let ov = row_to_override(r)?;
            out.insert(ov.guild_id.clone(), ov);
        }
        Ok(out)
    }

    async fn upsert_override(&self, item: &NotificationOverride) -> Result<(), Error> {
        let q = r#"
            INSERT INTO notification_overrides (
                guild_id, entity_id, post_message_format, live_message_format,
                post_embed_color, live_embed_color
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (guild_id, entity_id)
            DO UPDATE SET post_message_format = EXCLUDED.post_message_format,
                          live_message_format = EXCLUDED.live_message_format,
                          post_embed_color    = EXCLUDED.post_embed_color,
                          live_embed_color    = EXCLUDED.live_embed_color
        "#;
        sqlx::query(q)
            .bind(&item.guild_id)
            .bind(&item.entity_id)
            .bind(&item.post_message_format)
            .bind(&item.live_message_format)
            .bind(item.post_embed_color.map(i64::from))
            .bind(item.live_embed_color.map(i64::from))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_override(&self, guild_id: &str, entity_id: &str) -> Result<(), Error> {
        sqlx::query("DELETE FROM notification_overrides WHERE guild_id = $1 AND entity_id = $2")
            .bind(guild_id)
            .bind(entity_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
