use anyhow::{Context, Result};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use sqlx::PgPool;

use crate::models::plan::{
    Plan, PlanDetailedStatistics, PlanDetails, PlanDuration, PlanPrice, PlanStatistics,
};

// plan_prices.currency is its own enum type; read it as text.
const PRICE_COLUMNS: &str = "id, plan_duration_id, currency::text AS currency, price";

/// Outcome of a reorder request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReorderOutcome {
    Reordered,
    UnknownPlan(i32),
}

#[derive(Debug, Clone)]
pub struct PlanRepository {
    pool: PgPool,
}

impl PlanRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn attach(&self, plans: Vec<Plan>) -> Result<Vec<PlanDetails>> {
        let ids: Vec<i32> = plans.iter().map(|p| p.id).collect();

        let durations = sqlx::query_as::<_, PlanDuration>(
            "SELECT id, plan_id, days FROM plan_durations WHERE plan_id = ANY($1) ORDER BY days ASC",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch plan durations")?;

        let duration_ids: Vec<i32> = durations.iter().map(|d| d.id).collect();
        let prices = sqlx::query_as::<_, PlanPrice>(&format!(
            "SELECT {PRICE_COLUMNS} FROM plan_prices WHERE plan_duration_id = ANY($1) ORDER BY id ASC"
        ))
        .bind(&duration_ids)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch plan prices")?;

        Ok(PlanDetails::assemble(plans, durations, prices))
    }

    pub async fn get_all(&self) -> Result<Vec<PlanDetails>> {
        let plans = sqlx::query_as::<_, Plan>("SELECT * FROM plans ORDER BY order_index ASC")
            .fetch_all(&self.pool)
            .await
            .context("Failed to fetch plans")?;
        self.attach(plans).await
    }

    pub async fn get_by_id(&self, id: i32) -> Result<Option<PlanDetails>> {
        let plan = sqlx::query_as::<_, Plan>("SELECT * FROM plans WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch plan by ID")?;

        match plan {
            Some(plan) => Ok(self.attach(vec![plan]).await?.pop()),
            None => Ok(None),
        }
    }

    pub async fn save(&self, plan: &Plan) -> Result<Plan> {
        sqlx::query_as::<_, Plan>(
            r#"
            UPDATE plans SET
                order_index = $2,
                is_active = $3,
                type = $4,
                availability = $5,
                name = $6,
                description = $7,
                tag = $8,
                traffic_limit = $9,
                device_limit = $10,
                subscription_count = $11,
                traffic_limit_strategy = $12,
                allowed_user_ids = $13,
                internal_squads = $14,
                external_squad = $15,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(plan.id)
        .bind(plan.order_index)
        .bind(plan.is_active)
        .bind(plan.plan_type)
        .bind(plan.availability)
        .bind(&plan.name)
        .bind(&plan.description)
        .bind(&plan.tag)
        .bind(plan.traffic_limit)
        .bind(plan.device_limit)
        .bind(plan.subscription_count)
        .bind(plan.traffic_limit_strategy)
        .bind(&plan.allowed_user_ids)
        .bind(&plan.internal_squads)
        .bind(&plan.external_squad)
        .fetch_one(&self.pool)
        .await
        .context("Failed to update plan")
    }

    /// Assigns `order_index = position` to every id, all or nothing.
    pub async fn reorder(&self, plan_ids: &[i32]) -> Result<ReorderOutcome> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        for (index, id) in plan_ids.iter().enumerate() {
            let result = sqlx::query("UPDATE plans SET order_index = $1, updated_at = NOW() WHERE id = $2")
                .bind(index as i32)
                .bind(id)
                .execute(&mut *tx)
                .await
                .context("Failed to update plan order")?;

            if result.rows_affected() == 0 {
                tx.rollback().await.context("Failed to roll back plan reorder")?;
                return Ok(ReorderOutcome::UnknownPlan(*id));
            }
        }

        tx.commit().await.context("Failed to commit plan reorder")?;
        Ok(ReorderOutcome::Reordered)
    }

    pub async fn statistics(&self) -> Result<PlanStatistics> {
        let (total, active): (i64, i64) = sqlx::query_as(
            "SELECT COUNT(*), COUNT(*) FILTER (WHERE is_active) FROM plans",
        )
        .fetch_one(&self.pool)
        .await
        .context("Failed to count plans")?;

        Ok(PlanStatistics { total, active, inactive: total - active })
    }

    pub async fn detailed_statistics(&self) -> Result<PlanDetailedStatistics> {
        let base = self.statistics().await?;

        let total_durations: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM plan_durations")
            .fetch_one(&self.pool)
            .await
            .context("Failed to count plan durations")?;

        let average: Option<Decimal> = sqlx::query_scalar("SELECT AVG(price) FROM plan_prices")
            .fetch_one(&self.pool)
            .await
            .context("Failed to average plan prices")?;

        let average_price = average
            .map(|avg| avg.round())
            .and_then(|avg| avg.to_i64())
            .unwrap_or(0);

        Ok(PlanDetailedStatistics {
            total: base.total,
            active: base.active,
            inactive: base.inactive,
            total_durations,
            average_price,
        })
    }
}
