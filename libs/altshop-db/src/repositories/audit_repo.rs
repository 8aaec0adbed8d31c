use std::collections::BTreeMap;

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use sqlx::PgPool;
use sqlx::types::Json;

use crate::models::audit::{AuditEntity, AuditFilter, AuditLog, GroupCount, NewAuditLog};

#[derive(Debug, Clone)]
pub struct AuditRepository {
    pool: PgPool,
}

impl AuditRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, entry: NewAuditLog) -> Result<AuditLog> {
        sqlx::query_as::<_, AuditLog>(
            r#"
            INSERT INTO audit_logs
                (action, entity_type, entity_id, admin_id, admin_username, old_value, new_value,
                 description, ip_address, user_agent, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, NOW())
            RETURNING *
            "#,
        )
        .bind(entry.action)
        .bind(entry.entity_type)
        .bind(entry.entity_id)
        .bind(entry.admin_id)
        .bind(entry.admin_username)
        .bind(entry.old_value.map(Json))
        .bind(entry.new_value.map(Json))
        .bind(entry.description)
        .bind(entry.ip_address)
        .bind(entry.user_agent)
        .fetch_one(&self.pool)
        .await
        .context("Failed to write audit log")
    }

    pub async fn list(&self, filter: &AuditFilter) -> Result<(Vec<AuditLog>, i64)> {
        const WHERE: &str = r#"
            WHERE ($1::audit_logs_action_enum IS NULL OR action = $1)
              AND ($2::audit_logs_entity_type_enum IS NULL OR entity_type = $2)
              AND ($3::text IS NULL OR entity_id = $3)
              AND ($4::bigint IS NULL OR admin_id = $4)
              AND ($5::timestamp IS NULL OR created_at >= $5)
              AND ($6::timestamp IS NULL OR created_at <= $6)
        "#;

        let rows = sqlx::query_as::<_, AuditLog>(&format!(
            "SELECT * FROM audit_logs {WHERE} ORDER BY created_at DESC LIMIT $7 OFFSET $8"
        ))
        .bind(filter.action)
        .bind(filter.entity_type)
        .bind(&filter.entity_id)
        .bind(filter.admin_id)
        .bind(filter.start_date)
        .bind(filter.end_date)
        .bind(filter.limit)
        .bind(filter.offset)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch audit logs")?;

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM audit_logs {WHERE}"))
            .bind(filter.action)
            .bind(filter.entity_type)
            .bind(&filter.entity_id)
            .bind(filter.admin_id)
            .bind(filter.start_date)
            .bind(filter.end_date)
            .fetch_one(&self.pool)
            .await
            .context("Failed to count audit logs")?;

        Ok((rows, total))
    }

    pub async fn by_entity(&self, entity_type: AuditEntity, entity_id: &str) -> Result<Vec<AuditLog>> {
        sqlx::query_as::<_, AuditLog>(
            "SELECT * FROM audit_logs WHERE entity_type = $1 AND entity_id = $2 ORDER BY created_at DESC",
        )
        .bind(entity_type)
        .bind(entity_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch audit logs for entity")
    }

    pub async fn by_admin(&self, admin_id: i64, limit: i64) -> Result<Vec<AuditLog>> {
        sqlx::query_as::<_, AuditLog>(
            "SELECT * FROM audit_logs WHERE admin_id = $1 ORDER BY created_at DESC LIMIT $2",
        )
        .bind(admin_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch audit logs for admin")
    }

    pub async fn recent(&self, limit: i64) -> Result<Vec<AuditLog>> {
        sqlx::query_as::<_, AuditLog>("SELECT * FROM audit_logs ORDER BY created_at DESC LIMIT $1")
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .context("Failed to fetch recent audit logs")
    }

    pub async fn count_by_action(
        &self,
        start: Option<NaiveDateTime>,
        end: Option<NaiveDateTime>,
    ) -> Result<BTreeMap<String, i64>> {
        let rows = sqlx::query_as::<_, GroupCount>(
            r#"
            SELECT action::text AS key, COUNT(*) AS count
            FROM audit_logs
            WHERE ($1::timestamp IS NULL OR created_at >= $1)
              AND ($2::timestamp IS NULL OR created_at <= $2)
            GROUP BY action
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await
        .context("Failed to group audit logs by action")?;

        Ok(rows.into_iter().map(|r| (r.key, r.count)).collect())
    }

    pub async fn count_by_entity(
        &self,
        start: Option<NaiveDateTime>,
        end: Option<NaiveDateTime>,
    ) -> Result<BTreeMap<String, i64>> {
        let rows = sqlx::query_as::<_, GroupCount>(
            r#"
            SELECT entity_type::text AS key, COUNT(*) AS count
            FROM audit_logs
            WHERE ($1::timestamp IS NULL OR created_at >= $1)
              AND ($2::timestamp IS NULL OR created_at <= $2)
            GROUP BY entity_type
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await
        .context("Failed to group audit logs by entity")?;

        Ok(rows.into_iter().map(|r| (r.key, r.count)).collect())
    }

    /// Deletes entries created before `cutoff` and returns how many went.
    pub async fn delete_older_than(&self, cutoff: NaiveDateTime) -> Result<u64> {
        let result = sqlx::query("DELETE FROM audit_logs WHERE created_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .context("Failed to clean up audit logs")?;
        Ok(result.rows_affected())
    }
}
