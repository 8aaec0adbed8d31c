use anyhow::{Context, Result};
use sqlx::PgPool;

use crate::models::common::PageRequest;
use crate::models::transaction::{
    CurrencyTotal, GatewayIncome, Transaction, TransactionDetailedStatistics, TransactionStatistics,
    TransactionStatus,
};

#[derive(Debug, Clone)]
pub struct TransactionRepository {
    pool: PgPool,
}

fn status_text(status: TransactionStatus) -> &'static str {
    match status {
        TransactionStatus::Pending => "pending",
        TransactionStatus::Completed => "completed",
        TransactionStatus::Failed => "failed",
        TransactionStatus::Refunded => "refunded",
    }
}

impl TransactionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(
        &self,
        page: PageRequest,
        status: Option<TransactionStatus>,
    ) -> Result<(Vec<Transaction>, i64)> {
        let status = status.map(status_text);

        let rows = sqlx::query_as::<_, Transaction>(
            r#"
            SELECT * FROM transactions
            WHERE $1::text IS NULL OR status::text = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(status)
        .bind(page.limit)
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch transactions")?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM transactions WHERE $1::text IS NULL OR status::text = $1",
        )
        .bind(status)
        .fetch_one(&self.pool)
        .await
        .context("Failed to count transactions")?;

        Ok((rows, total))
    }

    pub async fn get_by_id(&self, id: i32) -> Result<Option<Transaction>> {
        sqlx::query_as::<_, Transaction>("SELECT * FROM transactions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch transaction by ID")
    }

    pub async fn get_by_user(&self, telegram_id: i64) -> Result<Vec<Transaction>> {
        sqlx::query_as::<_, Transaction>(
            "SELECT * FROM transactions WHERE user_telegram_id = $1 ORDER BY created_at DESC",
        )
        .bind(telegram_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch user transactions")
    }

    pub async fn recent(&self, limit: i64) -> Result<Vec<Transaction>> {
        sqlx::query_as::<_, Transaction>("SELECT * FROM transactions ORDER BY created_at DESC LIMIT $1")
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .context("Failed to fetch recent transactions")
    }

    pub async fn statistics(&self) -> Result<TransactionStatistics> {
        let (total, completed, pending, failed, today_count): (i64, i64, i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT
                COUNT(*),
                COUNT(*) FILTER (WHERE status = 'completed'),
                COUNT(*) FILTER (WHERE status = 'pending'),
                COUNT(*) FILTER (WHERE status = 'failed'),
                COUNT(*) FILTER (WHERE status = 'completed'
                    AND created_at >= CURRENT_DATE AND created_at < CURRENT_DATE + 1)
            FROM transactions
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .context("Failed to count transactions")?;

        let revenue = sqlx::query_as::<_, CurrencyTotal>(
            r#"
            SELECT currency, SUM(amount) AS total
            FROM transactions
            WHERE status = 'completed'
            GROUP BY currency
            ORDER BY currency
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to sum revenue")?;

        let today_revenue = sqlx::query_as::<_, CurrencyTotal>(
            r#"
            SELECT currency, SUM(amount) AS total
            FROM transactions
            WHERE status = 'completed'
              AND created_at >= CURRENT_DATE AND created_at < CURRENT_DATE + 1
            GROUP BY currency
            ORDER BY currency
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to sum today's revenue")?;

        Ok(TransactionStatistics {
            total,
            completed,
            pending,
            failed,
            revenue,
            today_count,
            today_revenue,
        })
    }

    pub async fn detailed_statistics(&self) -> Result<TransactionDetailedStatistics> {
        let (total, completed, free): (i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT
                COUNT(*),
                COUNT(*) FILTER (WHERE status = 'completed'),
                COUNT(*) FILTER (WHERE amount = 0)
            FROM transactions
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .context("Failed to count transactions")?;

        let by_gateway = sqlx::query_as::<_, GatewayIncome>(
            r#"
            SELECT
                COALESCE(payment_gateway, 'Unknown') AS name,
                COUNT(*) AS total,
                COALESCE(SUM(CASE WHEN status = 'completed' THEN amount ELSE 0 END), 0) AS income
            FROM transactions
            GROUP BY COALESCE(payment_gateway, 'Unknown')
            ORDER BY total DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to group transactions by gateway")?;

        Ok(TransactionDetailedStatistics { total, completed, free, by_gateway })
    }
}
