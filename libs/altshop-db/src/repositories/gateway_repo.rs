use anyhow::{Context, Result};
use sqlx::PgPool;

use crate::models::gateway::PaymentGateway;

#[derive(Debug, Clone)]
pub struct GatewayRepository {
    pool: PgPool,
}

impl GatewayRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Ordered by `order_index`, ties broken by id so the order is total.
    pub async fn get_all(&self) -> Result<Vec<PaymentGateway>> {
        sqlx::query_as::<_, PaymentGateway>(
            "SELECT * FROM payment_gateways ORDER BY order_index ASC, id ASC",
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch payment gateways")
    }

    pub async fn get_by_id(&self, id: i32) -> Result<Option<PaymentGateway>> {
        sqlx::query_as::<_, PaymentGateway>("SELECT * FROM payment_gateways WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch payment gateway by ID")
    }

    pub async fn save(&self, gateway: &PaymentGateway) -> Result<PaymentGateway> {
        sqlx::query_as::<_, PaymentGateway>(
            r#"
            UPDATE payment_gateways SET
                order_index = $2,
                currency = $3,
                is_active = $4,
                settings = $5
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(gateway.id)
        .bind(gateway.order_index)
        .bind(gateway.currency)
        .bind(gateway.is_active)
        .bind(&gateway.settings)
        .fetch_one(&self.pool)
        .await
        .context("Failed to update payment gateway")
    }

    /// Writes every `(id, order_index)` pair in one transaction.
    pub async fn write_order(&self, order: &[(i32, i32)]) -> Result<()> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        for (id, index) in order {
            sqlx::query("UPDATE payment_gateways SET order_index = $1 WHERE id = $2")
                .bind(index)
                .bind(id)
                .execute(&mut *tx)
                .await
                .context("Failed to update gateway order")?;
        }

        tx.commit().await.context("Failed to commit gateway order")?;
        Ok(())
    }
}
