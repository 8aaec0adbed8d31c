use std::collections::BTreeMap;

use anyhow::{Context, Result};
use sqlx::PgPool;

use crate::models::common::PageRequest;
use crate::models::promocode::{
    CreatePromocode, Promocode, PromocodeActivation, PromocodeDetailedStatistics,
    PromocodeStatistics,
};

#[derive(Debug, Clone)]
pub struct PromocodeRepository {
    pool: PgPool,
}

impl PromocodeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, page: PageRequest) -> Result<(Vec<Promocode>, i64)> {
        let rows = sqlx::query_as::<_, Promocode>(
            "SELECT * FROM promocodes ORDER BY created_at DESC LIMIT $1 OFFSET $2",
        )
        .bind(page.limit)
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch promocodes")?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM promocodes")
            .fetch_one(&self.pool)
            .await
            .context("Failed to count promocodes")?;

        Ok((rows, total))
    }

    pub async fn get_by_id(&self, id: i32) -> Result<Option<Promocode>> {
        sqlx::query_as::<_, Promocode>("SELECT * FROM promocodes WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch promocode by ID")
    }

    /// Whether another promocode already uses `code`.
    pub async fn code_taken(&self, code: &str, except_id: Option<i32>) -> Result<bool> {
        sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM promocodes WHERE code = $1 AND ($2::int IS NULL OR id <> $2))",
        )
        .bind(code)
        .bind(except_id)
        .fetch_one(&self.pool)
        .await
        .context("Failed to check promocode code")
    }

    pub async fn create(&self, dto: &CreatePromocode) -> Result<Promocode> {
        sqlx::query_as::<_, Promocode>(
            r#"
            INSERT INTO promocodes
                (code, type, discount, bonus_days, max_activations, current_activations,
                 is_active, valid_from, valid_until, plan_ids, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, 0, $6, $7, $8, $9, NOW(), NOW())
            RETURNING *
            "#,
        )
        .bind(&dto.code)
        .bind(dto.kind)
        .bind(dto.discount)
        .bind(dto.bonus_days)
        .bind(dto.max_activations)
        .bind(dto.is_active)
        .bind(dto.valid_from)
        .bind(dto.valid_until)
        .bind(&dto.plan_ids)
        .fetch_one(&self.pool)
        .await
        .context("Failed to create promocode")
    }

    pub async fn save(&self, promo: &Promocode) -> Result<Promocode> {
        sqlx::query_as::<_, Promocode>(
            r#"
            UPDATE promocodes SET
                code = $2,
                type = $3,
                discount = $4,
                bonus_days = $5,
                max_activations = $6,
                is_active = $7,
                valid_from = $8,
                valid_until = $9,
                plan_ids = $10,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(promo.id)
        .bind(&promo.code)
        .bind(promo.kind)
        .bind(promo.discount)
        .bind(promo.bonus_days)
        .bind(promo.max_activations)
        .bind(promo.is_active)
        .bind(promo.valid_from)
        .bind(promo.valid_until)
        .bind(&promo.plan_ids)
        .fetch_one(&self.pool)
        .await
        .context("Failed to update promocode")
    }

    pub async fn delete(&self, id: i32) -> Result<bool> {
        let result = sqlx::query("DELETE FROM promocodes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete promocode")?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn activations(&self, promocode_id: i32) -> Result<Vec<PromocodeActivation>> {
        sqlx::query_as::<_, PromocodeActivation>(
            "SELECT * FROM promocode_activations WHERE promocode_id = $1 ORDER BY activated_at DESC",
        )
        .bind(promocode_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch promocode activations")
    }

    pub async fn statistics(&self) -> Result<PromocodeStatistics> {
        let (total, active): (i64, i64) =
            sqlx::query_as("SELECT COUNT(*), COUNT(*) FILTER (WHERE is_active) FROM promocodes")
                .fetch_one(&self.pool)
                .await
                .context("Failed to count promocodes")?;

        let total_activations: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM promocode_activations")
            .fetch_one(&self.pool)
            .await
            .context("Failed to count promocode activations")?;

        Ok(PromocodeStatistics { total, active, inactive: total - active, total_activations })
    }

    pub async fn detailed_statistics(&self) -> Result<PromocodeDetailedStatistics> {
        let base = self.statistics().await?;

        let (expired, fully_used, average_discount): (i64, i64, Option<f64>) = sqlx::query_as(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE valid_until IS NOT NULL AND valid_until < LOCALTIMESTAMP),
                COUNT(*) FILTER (WHERE max_activations > 0 AND current_activations >= max_activations),
                (AVG(discount) FILTER (WHERE discount > 0))::float8
            FROM promocodes
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .context("Failed to compute promocode usage")?;

        let rows: Vec<(String, i64)> =
            sqlx::query_as("SELECT type::text, COUNT(*) FROM promocodes GROUP BY type")
                .fetch_all(&self.pool)
                .await
                .context("Failed to group promocodes by type")?;

        Ok(PromocodeDetailedStatistics {
            total: base.total,
            active: base.active,
            inactive: base.inactive,
            total_activations: base.total_activations,
            expired,
            fully_used,
            average_discount: average_discount.map(|d| d.round() as i64).unwrap_or(0),
            by_type: rows.into_iter().collect::<BTreeMap<_, _>>(),
        })
    }
}
