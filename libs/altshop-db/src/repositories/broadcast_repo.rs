use anyhow::{Context, Result};
use sqlx::PgPool;
use sqlx::types::Json;
use uuid::Uuid;

use crate::models::broadcast::{
    Broadcast, BroadcastAudience, BroadcastPayload, BroadcastStats, BroadcastStatus,
};
use crate::models::common::PageRequest;

/// A user-count query for one audience. `plan_id` is bound as `$1` only when the SQL uses it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudienceQuery {
    pub sql: String,
    pub plan_id: Option<i32>,
}

const HAS_ACTIVE: &str = "EXISTS (SELECT 1 FROM subscriptions s \
     WHERE s.user_telegram_id = u.telegram_id AND s.status = 'active')";

/// Builds the counting query for an audience. `Plan` without a plan id yields `None`.
pub fn audience_query(audience: BroadcastAudience, plan_id: Option<i32>) -> Option<AudienceQuery> {
    let (condition, plan_id) = match audience {
        BroadcastAudience::All => (None, None),
        BroadcastAudience::Subscribed => (Some(HAS_ACTIVE.to_string()), None),
        BroadcastAudience::Unsubscribed => (Some(format!("NOT {HAS_ACTIVE}")), None),
        BroadcastAudience::Expired => (
            Some(
                "EXISTS (SELECT 1 FROM subscriptions s \
                 WHERE s.user_telegram_id = u.telegram_id AND s.status = 'expired')"
                    .to_string(),
            ),
            None,
        ),
        BroadcastAudience::Trial => (
            Some(
                "EXISTS (SELECT 1 FROM subscriptions s JOIN plans p ON p.id = s.plan_id \
                 WHERE s.user_telegram_id = u.telegram_id AND p.type = 'trial')"
                    .to_string(),
            ),
            None,
        ),
        BroadcastAudience::Plan => {
            let plan_id = plan_id?;
            (
                Some(
                    "EXISTS (SELECT 1 FROM subscriptions s \
                     WHERE s.user_telegram_id = u.telegram_id AND s.status = 'active' AND s.plan_id = $1)"
                        .to_string(),
                ),
                Some(plan_id),
            )
        }
    };

    let sql = match condition {
        Some(cond) => format!("SELECT COUNT(*) FROM users u WHERE {cond}"),
        None => "SELECT COUNT(*) FROM users u".to_string(),
    };
    Some(AudienceQuery { sql, plan_id })
}

#[derive(Debug, Clone)]
pub struct BroadcastRepository {
    pool: PgPool,
}

impl BroadcastRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn count_audience(&self, query: &AudienceQuery) -> Result<i64> {
        let mut q = sqlx::query_scalar::<_, i64>(&query.sql);
        if let Some(plan_id) = query.plan_id {
            q = q.bind(plan_id);
        }
        q.fetch_one(&self.pool)
            .await
            .context("Failed to count broadcast audience")
    }

    pub async fn list(&self, page: PageRequest) -> Result<(Vec<Broadcast>, i64)> {
        let rows = sqlx::query_as::<_, Broadcast>(
            "SELECT * FROM broadcasts ORDER BY created_at DESC LIMIT $1 OFFSET $2",
        )
        .bind(page.limit)
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch broadcasts")?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM broadcasts")
            .fetch_one(&self.pool)
            .await
            .context("Failed to count broadcasts")?;

        Ok((rows, total))
    }

    pub async fn get_by_id(&self, id: i32) -> Result<Option<Broadcast>> {
        sqlx::query_as::<_, Broadcast>("SELECT * FROM broadcasts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch broadcast by ID")
    }

    pub async fn create(
        &self,
        audience: BroadcastAudience,
        total_count: i64,
        payload: &BroadcastPayload,
    ) -> Result<Broadcast> {
        sqlx::query_as::<_, Broadcast>(
            r#"
            INSERT INTO broadcasts
                (task_id, status, audience, total_count, success_count, failed_count, payload, created_at, updated_at)
            VALUES ($1, $2, $3, $4, 0, 0, $5, NOW(), NOW())
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(BroadcastStatus::Processing)
        .bind(audience)
        .bind(i32::try_from(total_count).unwrap_or(i32::MAX))
        .bind(Json(payload))
        .fetch_one(&self.pool)
        .await
        .context("Failed to create broadcast")
    }

    /// Flips a processing broadcast to canceled. Returns `None` when the row is missing.
    pub async fn cancel(&self, id: i32) -> Result<Option<Broadcast>> {
        let canceled = sqlx::query_as::<_, Broadcast>(
            r#"
            UPDATE broadcasts SET status = $2, updated_at = NOW()
            WHERE id = $1 AND status = $3
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(BroadcastStatus::Canceled)
        .bind(BroadcastStatus::Processing)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to cancel broadcast")?;

        match canceled {
            Some(row) => Ok(Some(row)),
            None => self.get_by_id(id).await,
        }
    }

    pub async fn delete(&self, id: i32) -> Result<bool> {
        let result = sqlx::query("DELETE FROM broadcasts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete broadcast")?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn stats(&self) -> Result<BroadcastStats> {
        let (total, processing, completed, canceled, error): (i64, i64, i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT
                COUNT(*),
                COUNT(*) FILTER (WHERE status = 'PROCESSING'),
                COUNT(*) FILTER (WHERE status = 'COMPLETED'),
                COUNT(*) FILTER (WHERE status = 'CANCELED'),
                COUNT(*) FILTER (WHERE status = 'ERROR')
            FROM broadcasts
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .context("Failed to count broadcasts")?;

        Ok(BroadcastStats { total, processing, completed, canceled, error })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_counts_every_user() {
        let q = audience_query(BroadcastAudience::All, None).unwrap();
        assert_eq!(q.sql, "SELECT COUNT(*) FROM users u");
        assert_eq!(q.plan_id, None);
    }

    #[test]
    fn subscribed_and_unsubscribed_are_complements() {
        let sub = audience_query(BroadcastAudience::Subscribed, None).unwrap();
        let unsub = audience_query(BroadcastAudience::Unsubscribed, None).unwrap();
        let sub_cond = sub.sql.split(" WHERE ").nth(1).unwrap();
        let unsub_cond = unsub.sql.split(" WHERE ").nth(1).unwrap();
        assert_eq!(unsub_cond, format!("NOT {sub_cond}"));
        assert!(sub_cond.contains("s.status = 'active'"));
    }

    #[test]
    fn plan_requires_an_id_and_binds_it() {
        assert!(audience_query(BroadcastAudience::Plan, None).is_none());
        let q = audience_query(BroadcastAudience::Plan, Some(7)).unwrap();
        assert_eq!(q.plan_id, Some(7));
        assert!(q.sql.contains("s.plan_id = $1"));
        assert!(q.sql.contains("'active'"));
    }

    #[test]
    fn plan_id_ignored_for_other_audiences() {
        let q = audience_query(BroadcastAudience::Expired, Some(3)).unwrap();
        assert_eq!(q.plan_id, None);
        assert!(!q.sql.contains("$1"));
        assert!(q.sql.contains("'expired'"));
    }

    #[test]
    fn trial_joins_plan_type() {
        let q = audience_query(BroadcastAudience::Trial, None).unwrap();
        assert!(q.sql.contains("JOIN plans p"));
        assert!(q.sql.contains("p.type = 'trial'"));
    }
}
