// fanwatch-core/src/repositories/postgres/subscriptions.rs

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row};

use fanwatch_common::error::Error;
use fanwatch_common::models::GuildSubscription;
use fanwatch_common::traits::repository_traits::GuildSubscriptionRepository;

#[derive(Clone)]
pub struct PostgresGuildSubscriptionRepository {
    pool: Pool<Postgres>,
}

impl PostgresGuildSubscriptionRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl GuildSubscriptionRepository for PostgresGuildSubscriptionRepository {
    async fn get_subscription(&self, guild_id: &str) -> Result<Option<GuildSubscription>, Error> {
        let row_opt = sqlx::query(
            r#"
            SELECT guild_id, subscription_tier, user_limit, expires_at
            FROM guild_subscriptions
            WHERE guild_id = $1
            "#,
        )
            .bind(guild_id)
            .fetch_optional(&self.pool)
            .await?;

        if let Some(r) = row_opt {
            Ok(Some(GuildSubscription {
                guild_id: r.try_get("guild_id")?,
                subscription_tier: r.try_get("subscription_tier")?,
                user_limit: r.try_get("user_limit")?,
                expires_at: r.try_get("expires_at")?,
            }))
        } else {
            Ok(None)
        }
    }

    async fn upsert_subscription(&self, sub: &GuildSubscription) -> Result<(), Error> {
        let q = r#"
            INSERT INTO guild_subscriptions (guild_id, subscription_tier, user_limit, expires_at, updated_at)
            VALUES ($1, $2, $3, $4, now())
            ON CONFLICT (guild_id)
            DO UPDATE SET subscription_tier = EXCLUDED.subscription_tier,
                          user_limit        = EXCLUDED.user_limit,
                          expires_at        = EXCLUDED.expires_at,
                          updated_at        = now()
        "#;
        sqlx::query(q)
            .bind(&sub.guild_id)
            .bind(&sub.subscription_tier)
            .bind(sub.user_limit)
            .bind(sub.expires_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
