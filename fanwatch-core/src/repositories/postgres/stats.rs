// fanwatch-core/src/repositories/postgres/stats.rs
//
// Counters ("system_stats"), API health totals ("api_health_stats") and the
// service liveness row ("service_status").

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row};

use fanwatch_common::error::Error;
use fanwatch_common::models::ServiceStatus;
use fanwatch_common::traits::repository_traits::StatsRepository;

#[derive(Clone)]
pub struct PostgresStatsRepository {
    pool: Pool<Postgres>,
}

impl PostgresStatsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StatsRepository for PostgresStatsRepository {
    async fn increment_stat(&self, stat_key: &str) -> Result<(), Error> {
        let q = r#"
            INSERT INTO system_stats (stat_key, stat_value, updated_at)
            VALUES ($1, 1, now())
            ON CONFLICT (stat_key)
            DO UPDATE SET stat_value = system_stats.stat_value + 1,
                          updated_at = now()
        "#;
        sqlx::query(q)
            .bind(stat_key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_stat(&self, stat_key: &str) -> Result<i64, Error> {
        let row_opt = sqlx::query("SELECT stat_value FROM system_stats WHERE stat_key = $1")
            .bind(stat_key)
            .fetch_optional(&self.pool)
            .await?;

        match row_opt {
            Some(r) => Ok(r.try_get("stat_value")?),
            None => Ok(0),
        }
    }

    async fn add_api_health(&self, service_name: &str, total: u64, successful: u64) -> Result<(), Error> {
        let q = r#"
            INSERT INTO api_health_stats (service_name, total_requests, successful_requests, updated_at)
            VALUES ($1, $2, $3, now())
            ON CONFLICT (service_name)
            DO UPDATE SET total_requests      = api_health_stats.total_requests + EXCLUDED.total_requests,
                          successful_requests = api_health_stats.successful_requests + EXCLUDED.successful_requests,
                          updated_at          = now()
        "#;
        sqlx::query(q)
            .bind(service_name)
            .bind(total as i64)
            .bind(successful as i64)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn upsert_service_status(&self, status: &ServiceStatus) -> Result<(), Error> {
        let q = r#"
            INSERT INTO service_status (service_name, status, last_heartbeat, details)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (service_name)
            DO UPDATE SET status         = EXCLUDED.status,
                          last_heartbeat = EXCLUDED.last_heartbeat,
                          details        = EXCLUDED.details
        "#;
        sqlx::query(q)
            .bind(&status.service_name)
            .bind(&status.status)
            .bind(status.last_heartbeat)
            .bind(&status.details)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
