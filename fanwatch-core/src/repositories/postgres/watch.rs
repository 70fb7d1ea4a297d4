// fanwatch-core/src/repositories/postgres/watch.rs
//
// Stores one row per (guild, creator) in "watch_registrations".
//
// Settings writes (upsert) and watermark writes (advance_*) touch disjoint columns, so an
// administrative edit racing with a monitor worker never rolls a watermark back. Beyond that
// the table is last-write-wins.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row};

use fanwatch_common::error::Error;
use fanwatch_common::models::WatchRegistration;
use fanwatch_common::traits::repository_traits::WatchRepository;

const SELECT_COLUMNS: &str = r#"
    SELECT guild_id, entity_id, username,
           notification_channel, post_notification_channel, live_notification_channel,
           last_post_id, last_stream_start,
           mention_role, post_mention_role, live_mention_role,
           avatar_location, avatar_location_updated_at, live_image_url,
           posts_enabled, live_enabled, created_at
    FROM watch_registrations
"#;

#[derive(Clone)]
pub struct PostgresWatchRepository {
    pool: Pool<Postgres>,
}

impl PostgresWatchRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn row_to_registration(r: &PgRow) -> Result<WatchRegistration, Error> {
    Ok(WatchRegistration {
        guild_id:                   r.try_get("guild_id")?,
        entity_id:                  r.try_get("entity_id")?,
        username:                   r.try_get("username")?,
        notification_channel:       r.try_get("notification_channel")?,
        post_notification_channel:  r.try_get("post_notification_channel")?,
        live_notification_channel:  r.try_get("live_notification_channel")?,
        last_post_id:               r.try_get("last_post_id")?,
        last_stream_start:          r.try_get("last_stream_start")?,
        mention_role:               r.try_get("mention_role")?,
        post_mention_role:          r.try_get("post_mention_role")?,
        live_mention_role:          r.try_get("live_mention_role")?,
        avatar_location:            r.try_get("avatar_location")?,
        avatar_location_updated_at: r.try_get("avatar_location_updated_at")?,
        live_image_url:             r.try_get("live_image_url")?,
        posts_enabled:              r.try_get("posts_enabled")?,
        live_enabled:               r.try_get("live_enabled")?,
        created_at:                 r.try_get("created_at")?,
    })
}

#[async_trait]
impl WatchRepository for PostgresWatchRepository {
    async fn list_enabled(&self) -> Result<Vec<WatchRegistration>, Error> {
        let q = format!(
            "{SELECT_COLUMNS} WHERE posts_enabled OR live_enabled ORDER BY created_at, guild_id"
        );
        let rows = sqlx::query(&q).fetch_all(&self.pool).await?;
        rows.iter().map(row_to_registration).collect()
    }

    async fn list_for_guild(&self, guild_id: &str) -> Result<Vec<WatchRegistration>, Error> {
        let q = format!("{SELECT_COLUMNS} WHERE guild_id = $1 ORDER BY username");
        let rows = sqlx::query(&q)
            .bind(guild_id)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_registration).collect()
    }

    async fn get(&self, guild_id: &str, entity_id: &str) -> Result<Option<WatchRegistration>, Error> {
        let q = format!("{SELECT_COLUMNS} WHERE guild_id = $1 AND entity_id = $2");
        let row_opt = sqlx::query(&q)
            .bind(guild_id)
            .bind(entity_id)
            .fetch_optional(&self.pool)
            .await?;
        row_opt.as_ref().map(row_to_registration).transpose()
    }

    async fn get_by_username(&self, guild_id: &str, username: &str) -> Result<Option<WatchRegistration>, Error> {
        let q = format!("{SELECT_COLUMNS} WHERE guild_id = $1 AND LOWER(username) = LOWER($2) LIMIT 1");
        let row_opt = sqlx::query(&q)
            .bind(guild_id)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        row_opt.as_ref().map(row_to_registration).transpose()
    }

    async fn count_for_guild(&self, guild_id: &str) -> Result<i64, Error> {
        let row = sqlx::query("SELECT COUNT(*) AS cnt FROM watch_registrations WHERE guild_id = $1")
            .bind(guild_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get("cnt")?)
    }

    async fn upsert(&self, reg: &WatchRegistration) -> Result<(), Error> {
        let q = r#"
            INSERT INTO watch_registrations (
                guild_id, entity_id, username,
                notification_channel, post_notification_channel, live_notification_channel,
                last_post_id, last_stream_start,
                mention_role, post_mention_role, live_mention_role,
                avatar_location, avatar_location_updated_at, live_image_url,
                posts_enabled, live_enabled, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            ON CONFLICT (guild_id, entity_id)
            DO UPDATE SET username                  = EXCLUDED.username,
                          notification_channel      = EXCLUDED.notification_channel,
                          post_notification_channel = EXCLUDED.post_notification_channel,
                          live_notification_channel = EXCLUDED.live_notification_channel,
                          mention_role              = EXCLUDED.mention_role,
                          post_mention_role         = EXCLUDED.post_mention_role,
                          live_mention_role         = EXCLUDED.live_mention_role,
                          live_image_url            = EXCLUDED.live_image_url,
                          posts_enabled             = EXCLUDED.posts_enabled,
                          live_enabled              = EXCLUDED.live_enabled
        "#;
        sqlx::query(q)
            .bind(&reg.guild_id)
            .bind(&reg.entity_id)
            .bind(&reg.username)
            .bind(&reg.notification_channel)
            .bind(&reg.post_notification_channel)
            .bind(&reg.live_notification_channel)
            .bind(&reg.last_post_id)
            .bind(reg.last_stream_start)
            .bind(&reg.mention_role)
            .bind(&reg.post_mention_role)
            .bind(&reg.live_mention_role)
            .bind(&reg.avatar_location)
            .bind(reg.avatar_location_updated_at)
            .bind(&reg.live_image_url)
            .bind(reg.posts_enabled)
            .bind(reg.live_enabled)
            .bind(reg.created_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete(&self, guild_id: &str, entity_id: &str) -> Result<bool, Error> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM notification_overrides WHERE guild_id = $1 AND entity_id = $2")
            .bind(guild_id)
            .bind(entity_id)
            .execute(&mut *tx)
            .await?;

        let res = sqlx::query("DELETE FROM watch_registrations WHERE guild_id = $1 AND entity_id = $2")
            .bind(guild_id)
            .bind(entity_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(res.rows_affected() > 0)
    }

    async fn delete_all_for_guild(&self, guild_id: &str) -> Result<u64, Error> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM notification_overrides WHERE guild_id = $1")
            .bind(guild_id)
            .execute(&mut *tx)
            .await?;

        let res = sqlx::query("DELETE FROM watch_registrations WHERE guild_id = $1")
            .bind(guild_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(res.rows_affected())
    }

    async fn advance_last_post_id(&self, guild_id: &str, entity_id: &str, post_id: &str) -> Result<bool, Error> {
        let q = r#"
            UPDATE watch_registrations
            SET last_post_id = $3
            WHERE guild_id = $1
              AND entity_id = $2
              AND last_post_id <> $3
        "#;
        let res = sqlx::query(q)
            .bind(guild_id)
            .bind(entity_id)
            .bind(post_id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn advance_last_stream_start(&self, guild_id: &str, entity_id: &str, started_at: i64) -> Result<bool, Error> {
        let q = r#"
            UPDATE watch_registrations
            SET last_stream_start = $3
            WHERE guild_id = $1
              AND entity_id = $2
              AND last_stream_start < $3
        "#;
        let res = sqlx::query(q)
            .bind(guild_id)
            .bind(entity_id)
            .bind(started_at)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn update_avatar(&self, guild_id: &str, entity_id: &str, location: &str, refreshed_at: i64) -> Result<(), Error> {
        let q = r#"
            UPDATE watch_registrations
            SET avatar_location = $3,
                avatar_location_updated_at = $4
            WHERE guild_id = $1
              AND entity_id = $2
        "#;
        sqlx::query(q)
            .bind(guild_id)
            .bind(entity_id)
            .bind(location)
            .bind(refreshed_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
