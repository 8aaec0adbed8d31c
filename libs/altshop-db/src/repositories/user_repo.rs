use anyhow::{Context, Result};
use sqlx::PgPool;

use crate::models::common::PageRequest;
use crate::models::user::{User, UserDetailedStatistics, UserStatistics, percent_of};

#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct UserCounts {
    total: i64,
    blocked: i64,
    bot_blocked: i64,
    today: i64,
    week: i64,
    month: i64,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Newest first. `search` matches the telegram id digits, username or display name.
    pub async fn list(&self, page: PageRequest, search: Option<&str>) -> Result<(Vec<User>, i64)> {
        let pattern = search.filter(|s| !s.is_empty()).map(|s| format!("%{}%", s));

        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT * FROM users
            WHERE $1::text IS NULL
               OR telegram_id::text LIKE $1
               OR username ILIKE $1
               OR name ILIKE $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(&pattern)
        .bind(page.limit)
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch users")?;

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM users
            WHERE $1::text IS NULL
               OR telegram_id::text LIKE $1
               OR username ILIKE $1
               OR name ILIKE $1
            "#,
        )
        .bind(&pattern)
        .fetch_one(&self.pool)
        .await
        .context("Failed to count users")?;

        Ok((users, total))
    }

    pub async fn get_by_id(&self, id: i32) -> Result<Option<User>> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch user by ID")
    }

    pub async fn get_by_telegram_id(&self, telegram_id: i64) -> Result<Option<User>> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE telegram_id = $1")
            .bind(telegram_id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch user by Telegram ID")
    }

    pub async fn recent(&self, limit: i64) -> Result<Vec<User>> {
        sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY created_at DESC LIMIT $1")
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .context("Failed to fetch recent users")
    }

    /// Writes back every column the panel may edit.
    pub async fn save(&self, user: &User) -> Result<User> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET
                name = $2,
                role = $3,
                language = $4,
                personal_discount = $5,
                purchase_discount = $6,
                points = $7,
                is_blocked = $8,
                max_subscriptions = $9,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(user.role)
        .bind(user.language)
        .bind(user.personal_discount)
        .bind(user.purchase_discount)
        .bind(user.points)
        .bind(user.is_blocked)
        .bind(user.max_subscriptions)
        .fetch_one(&self.pool)
        .await
        .context("Failed to update user")
    }

    async fn counts(&self) -> Result<UserCounts> {
        sqlx::query_as::<_, UserCounts>(
            r#"
            SELECT
                COUNT(*) AS total,
                COUNT(*) FILTER (WHERE is_blocked) AS blocked,
                COUNT(*) FILTER (WHERE is_bot_blocked) AS bot_blocked,
                COUNT(*) FILTER (WHERE created_at >= CURRENT_DATE) AS today,
                COUNT(*) FILTER (WHERE created_at >= LOCALTIMESTAMP - INTERVAL '7 days') AS week,
                COUNT(*) FILTER (WHERE created_at >= LOCALTIMESTAMP - INTERVAL '30 days') AS month
            FROM users
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .context("Failed to count users")
    }

    pub async fn statistics(&self) -> Result<UserStatistics> {
        let c = self.counts().await?;
        Ok(UserStatistics {
            total: c.total,
            blocked: c.blocked,
            bot_blocked: c.bot_blocked,
            active: (c.total - c.blocked - c.bot_blocked).max(0),
            registered_today: c.today,
            registered_this_week: c.week,
        })
    }

    /// A trial user holds any subscription to a plan of type `trial`.
    pub async fn detailed_statistics(&self) -> Result<UserDetailedStatistics> {
        let c = self.counts().await?;

        let (with_subscription, with_trial, paying, trial_paying): (i64, i64, i64, i64) = sqlx::query_as(
            r#"
            WITH subscribed AS (
                SELECT DISTINCT user_telegram_id FROM subscriptions WHERE status = 'active'
            ),
            trial AS (
                SELECT DISTINCT s.user_telegram_id
                FROM subscriptions s JOIN plans p ON p.id = s.plan_id
                WHERE p.type = 'trial'
            ),
            paying AS (
                SELECT DISTINCT user_telegram_id FROM transactions WHERE status = 'completed'
            )
            SELECT
                (SELECT COUNT(*) FROM users u WHERE u.telegram_id IN (SELECT user_telegram_id FROM subscribed)),
                (SELECT COUNT(*) FROM users u WHERE u.telegram_id IN (SELECT user_telegram_id FROM trial)),
                (SELECT COUNT(*) FROM users u WHERE u.telegram_id IN (SELECT user_telegram_id FROM paying)),
                (SELECT COUNT(*) FROM users u
                  WHERE u.telegram_id IN (SELECT user_telegram_id FROM trial)
                    AND u.telegram_id IN (SELECT user_telegram_id FROM paying))
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .context("Failed to compute subscription coverage")?;

        Ok(UserDetailedStatistics {
            total: c.total,
            new_daily: c.today,
            new_weekly: c.week,
            new_monthly: c.month,
            with_subscription,
            without_subscription: (c.total - with_subscription).max(0),
            with_trial,
            blocked: c.blocked,
            bot_blocked: c.bot_blocked,
            conversion_rate: percent_of(paying, c.total),
            trial_conversion_rate: percent_of(trial_paying, with_trial),
        })
    }
}
