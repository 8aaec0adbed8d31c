use anyhow::{Context, Result};
use sqlx::PgPool;
use sqlx::types::Json;

use crate::models::bot_admin::{AdminRole, BotAdmin, CreateBotAdmin};

#[derive(Debug, Clone)]
pub struct BotAdminRepository {
    pool: PgPool,
}

impl BotAdminRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, role: Option<AdminRole>) -> Result<Vec<BotAdmin>> {
        sqlx::query_as::<_, BotAdmin>(
            r#"
            SELECT * FROM bot_admins
            WHERE $1::text IS NULL OR role::text = $1
            ORDER BY role ASC, created_at DESC
            "#,
        )
        .bind(role.map(|r| r.as_str()))
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch bot admins")
    }

    pub async fn active(&self) -> Result<Vec<BotAdmin>> {
        sqlx::query_as::<_, BotAdmin>("SELECT * FROM bot_admins WHERE is_active ORDER BY role ASC")
            .fetch_all(&self.pool)
            .await
            .context("Failed to fetch active bot admins")
    }

    pub async fn get_by_id(&self, id: i32) -> Result<Option<BotAdmin>> {
        sqlx::query_as::<_, BotAdmin>("SELECT * FROM bot_admins WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch bot admin by ID")
    }

    pub async fn get_by_telegram_id(&self, telegram_id: i64) -> Result<Option<BotAdmin>> {
        sqlx::query_as::<_, BotAdmin>("SELECT * FROM bot_admins WHERE telegram_id = $1")
            .bind(telegram_id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch bot admin by Telegram ID")
    }

    pub async fn create(&self, telegram_id: i64, dto: &CreateBotAdmin) -> Result<BotAdmin> {
        sqlx::query_as::<_, BotAdmin>(
            r#"
            INSERT INTO bot_admins
                (telegram_id, username, first_name, last_name, role, permissions, is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, NOW(), NOW())
            RETURNING *
            "#,
        )
        .bind(telegram_id)
        .bind(&dto.username)
        .bind(&dto.first_name)
        .bind(&dto.last_name)
        .bind(dto.role.unwrap_or(AdminRole::Admin))
        .bind(Json(dto.permissions.clone().unwrap_or_default()))
        .bind(dto.is_active.unwrap_or(true))
        .fetch_one(&self.pool)
        .await
        .context("Failed to create bot admin")
    }

    pub async fn save(&self, admin: &BotAdmin) -> Result<BotAdmin> {
        sqlx::query_as::<_, BotAdmin>(
            r#"
            UPDATE bot_admins SET
                username = $2,
                first_name = $3,
                last_name = $4,
                role = $5,
                permissions = $6,
                is_active = $7,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(admin.id)
        .bind(&admin.username)
        .bind(&admin.first_name)
        .bind(&admin.last_name)
        .bind(admin.role)
        .bind(&admin.permissions)
        .bind(admin.is_active)
        .fetch_one(&self.pool)
        .await
        .context("Failed to update bot admin")
    }

    pub async fn delete(&self, id: i32) -> Result<bool> {
        let result = sqlx::query("DELETE FROM bot_admins WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete bot admin")?;
        Ok(result.rows_affected() > 0)
    }
}
