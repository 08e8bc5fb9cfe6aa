//! PostgreSQL-backed state store

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};

use super::StateStore;
use crate::config::DatabaseConfig;
use crate::error::Result;
use crate::models::{CheckRecord, ErrorStreak};

/// State store backed by a PostgreSQL connection pool
#[derive(Clone)]
pub struct PgStateStore {
    pool: PgPool,
}

impl PgStateStore {
    /// Connect a new pool
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .connect(&config.url)
            .await?;

        Ok(Self { pool })
    }

    /// Run embedded migrations
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Health check
    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Get the underlying pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl StateStore for PgStateStore {
    async fn last_state(&self, target: &str) -> Result<Option<String>> {
        let state = sqlx::query_scalar::<_, String>(
            r#"
            SELECT state FROM checks
            WHERE target = $1
            ORDER BY id DESC
            LIMIT 1
            "#,
        )
        .bind(target)
        .fetch_optional(&self.pool)
        .await?;

        Ok(state)
    }

    async fn append_check(
        &self,
        target: &str,
        state: &str,
        notified: bool,
        at: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO checks (target, state, checked_at, notified)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(target)
        .bind(state)
        .bind(at)
        .bind(notified)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn recent_checks(&self, target: &str, limit: i64) -> Result<Vec<CheckRecord>> {
        let records = sqlx::query_as::<_, CheckRecord>(
            r#"
            SELECT id, target, state, checked_at, notified FROM checks
            WHERE target = $1
            ORDER BY id DESC
            LIMIT $2
            "#,
        )
        .bind(target)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    async fn streak(&self, target: &str) -> Result<Option<ErrorStreak>> {
        let streak = sqlx::query_as::<_, ErrorStreak>(
            "SELECT target, started_at, notified FROM error_streak WHERE target = $1",
        )
        .bind(target)
        .fetch_optional(&self.pool)
        .await?;

        Ok(streak)
    }

    async fn start_streak(&self, target: &str, at: DateTime<Utc>) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO error_streak (target, started_at, notified)
            VALUES ($1, $2, FALSE)
            ON CONFLICT (target) DO NOTHING
            "#,
        )
        .bind(target)
        .bind(at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn mark_streak_notified(&self, target: &str) -> Result<()> {
        sqlx::query("UPDATE error_streak SET notified = TRUE WHERE target = $1")
            .bind(target)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn clear_streak(&self, target: &str) -> Result<()> {
        sqlx::query("DELETE FROM error_streak WHERE target = $1")
            .bind(target)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn streak_overdue(
        &self,
        target: &str,
        as_of: DateTime<Utc>,
        threshold_minutes: i64,
    ) -> Result<bool> {
        let cutoff = as_of - Duration::minutes(threshold_minutes);

        let overdue = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM error_streak
                WHERE target = $1 AND started_at <= $2
            )
            "#,
        )
        .bind(target)
        .bind(cutoff)
        .fetch_one(&self.pool)
        .await?;

        Ok(overdue)
    }
}
