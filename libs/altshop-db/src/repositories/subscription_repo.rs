use anyhow::{Context, Result};
use sqlx::PgPool;

use crate::models::common::PageRequest;
use crate::models::subscription::{
    Subscription, SubscriptionDetailedStatistics, SubscriptionStatistics, SubscriptionStatus,
};

#[derive(Debug, Clone)]
pub struct SubscriptionRepository {
    pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct StatusCounts {
    total: i64,
    active: i64,
    expired: i64,
    disabled: i64,
    limited: i64,
    expiring_3d: i64,
    expiring_7d: i64,
    with_traffic_limit: i64,
    auto_renew: i64,
}

impl SubscriptionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(
        &self,
        page: PageRequest,
        status: Option<SubscriptionStatus>,
    ) -> Result<(Vec<Subscription>, i64)> {
        let rows = sqlx::query_as::<_, Subscription>(
            r#"
            SELECT * FROM subscriptions
            WHERE $1::text IS NULL OR status::text = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(status.map(|s| s.as_str()))
        .bind(page.limit)
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch subscriptions")?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM subscriptions WHERE $1::text IS NULL OR status::text = $1",
        )
        .bind(status.map(|s| s.as_str()))
        .fetch_one(&self.pool)
        .await
        .context("Failed to count subscriptions")?;

        Ok((rows, total))
    }

    pub async fn get_by_id(&self, id: i32) -> Result<Option<Subscription>> {
        sqlx::query_as::<_, Subscription>("SELECT * FROM subscriptions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch subscription by ID")
    }

    pub async fn get_by_user(&self, telegram_id: i64) -> Result<Vec<Subscription>> {
        sqlx::query_as::<_, Subscription>(
            "SELECT * FROM subscriptions WHERE user_telegram_id = $1 ORDER BY created_at DESC",
        )
        .bind(telegram_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch user subscriptions")
    }

    pub async fn save(&self, sub: &Subscription) -> Result<Subscription> {
        sqlx::query_as::<_, Subscription>(
            r#"
            UPDATE subscriptions SET
                plan_id = $2,
                status = $3,
                expires_at = $4,
                traffic_limit = $5,
                is_auto_renew = $6,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(sub.id)
        .bind(sub.plan_id)
        .bind(sub.status)
        .bind(sub.expires_at)
        .bind(sub.traffic_limit)
        .bind(sub.is_auto_renew)
        .fetch_one(&self.pool)
        .await
        .context("Failed to update subscription")
    }

    async fn counts(&self) -> Result<StatusCounts> {
        sqlx::query_as::<_, StatusCounts>(
            r#"
            SELECT
                COUNT(*) AS total,
                COUNT(*) FILTER (WHERE status = 'active') AS active,
                COUNT(*) FILTER (WHERE status = 'expired') AS expired,
                COUNT(*) FILTER (WHERE status = 'disabled') AS disabled,
                COUNT(*) FILTER (WHERE status = 'limited') AS limited,
                COUNT(*) FILTER (WHERE status = 'active'
                    AND expires_at BETWEEN LOCALTIMESTAMP AND LOCALTIMESTAMP + INTERVAL '3 days') AS expiring_3d,
                COUNT(*) FILTER (WHERE status = 'active'
                    AND expires_at BETWEEN LOCALTIMESTAMP AND LOCALTIMESTAMP + INTERVAL '7 days') AS expiring_7d,
                COUNT(*) FILTER (WHERE status = 'active' AND traffic_limit > 0) AS with_traffic_limit,
                COUNT(*) FILTER (WHERE status = 'active' AND is_auto_renew) AS auto_renew
            FROM subscriptions
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .context("Failed to count subscriptions")
    }

    pub async fn statistics(&self) -> Result<SubscriptionStatistics> {
        let c = self.counts().await?;
        Ok(SubscriptionStatistics {
            total: c.total,
            active: c.active,
            expired: c.expired,
            disabled: c.disabled,
            expiring_soon: c.expiring_3d,
        })
    }

    pub async fn detailed_statistics(&self) -> Result<SubscriptionDetailedStatistics> {
        let c = self.counts().await?;
        Ok(SubscriptionDetailedStatistics {
            total: c.total,
            active: c.active,
            expired: c.expired,
            disabled: c.disabled,
            limited: c.limited,
            expiring_soon: c.expiring_7d,
            with_traffic_limit: c.with_traffic_limit,
            auto_renew: c.auto_renew,
        })
    }
}
