use anyhow::{Context, Result};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::admin_user::AdminUser;
use crate::models::bot_admin::AdminRole;

#[derive(Debug, Clone)]
pub struct AdminUserRepository {
    pool: PgPool,
}

impl AdminUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The only table this service owns. Safe to run on every start.
    pub async fn ensure_table(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS admin_users (
                id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                username VARCHAR(50) UNIQUE NOT NULL,
                password VARCHAR(255) NOT NULL,
                telegram_id BIGINT UNIQUE,
                role VARCHAR(20) NOT NULL DEFAULT 'admin',
                is_active BOOLEAN NOT NULL DEFAULT true,
                last_login TIMESTAMP,
                created_at TIMESTAMP NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMP NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create admin_users table")?;
        Ok(())
    }

    pub async fn get_by_username(&self, username: &str) -> Result<Option<AdminUser>> {
        sqlx::query_as::<_, AdminUser>("SELECT * FROM admin_users WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch admin user by username")
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<AdminUser>> {
        sqlx::query_as::<_, AdminUser>("SELECT * FROM admin_users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch admin user by ID")
    }

    pub async fn create(
        &self,
        username: &str,
        password_hash: &str,
        telegram_id: Option<i64>,
        role: AdminRole,
    ) -> Result<AdminUser> {
        sqlx::query_as::<_, AdminUser>(
            r#"
            INSERT INTO admin_users (username, password, telegram_id, role, is_active)
            VALUES ($1, $2, $3, $4, true)
            RETURNING *
            "#,
        )
        .bind(username)
        .bind(password_hash)
        .bind(telegram_id)
        .bind(role.as_str())
        .fetch_one(&self.pool)
        .await
        .context("Failed to create admin user")
    }

    pub async fn set_password(&self, id: Uuid, password_hash: &str) -> Result<()> {
        sqlx::query("UPDATE admin_users SET password = $1, updated_at = NOW() WHERE id = $2")
            .bind(password_hash)
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to update admin password")?;
        Ok(())
    }

    /// Returns the number of rows touched so callers can fall back to creating the account.
    pub async fn set_password_by_username(&self, username: &str, password_hash: &str) -> Result<u64> {
        let result = sqlx::query("UPDATE admin_users SET password = $1, updated_at = NOW() WHERE username = $2")
            .bind(password_hash)
            .bind(username)
            .execute(&self.pool)
            .await
            .context("Failed to update admin password")?;
        Ok(result.rows_affected())
    }

    pub async fn touch_last_login(&self, id: Uuid) -> Result<()> {
        sqlx::query("UPDATE admin_users SET last_login = NOW() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to record admin login")?;
        Ok(())
    }
}
