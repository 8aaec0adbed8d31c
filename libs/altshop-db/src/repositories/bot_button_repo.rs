use anyhow::{Context, Result};
use sqlx::PgPool;
use sqlx::types::Json;

use crate::models::bot_button::{BotButton, ButtonPlacement, ButtonType, CreateBotButton};

#[derive(Debug, Clone)]
pub struct BotButtonRepository {
    pool: PgPool,
}

impl BotButtonRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, kind: Option<ButtonType>, parent_menu: Option<&str>) -> Result<Vec<BotButton>> {
        sqlx::query_as::<_, BotButton>(
            r#"
            SELECT * FROM bot_buttons
            WHERE ($1::bot_buttons_type_enum IS NULL OR type = $1)
              AND ($2::text IS NULL OR parent_menu = $2)
            ORDER BY parent_menu ASC NULLS FIRST, row ASC, position ASC
            "#,
        )
        .bind(kind)
        .bind(parent_menu)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch bot buttons")
    }

    pub async fn get_by_id(&self, id: i32) -> Result<Option<BotButton>> {
        sqlx::query_as::<_, BotButton>("SELECT * FROM bot_buttons WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch bot button by ID")
    }

    pub async fn create(&self, dto: &CreateBotButton) -> Result<BotButton> {
        sqlx::query_as::<_, BotButton>(
            r#"
            INSERT INTO bot_buttons
                (name, text, text_key, type, action, action_data, parent_menu, position, row, emoji,
                 is_active, requires_admin, requires_subscription, conditions, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, NOW(), NOW())
            RETURNING *
            "#,
        )
        .bind(&dto.name)
        .bind(&dto.text)
        .bind(&dto.text_key)
        .bind(dto.kind.unwrap_or(ButtonType::Inline))
        .bind(dto.action.unwrap_or(crate::models::bot_button::ButtonAction::Callback))
        .bind(&dto.action_data)
        .bind(&dto.parent_menu)
        .bind(dto.position.unwrap_or(0))
        .bind(dto.row.unwrap_or(0))
        .bind(&dto.emoji)
        .bind(dto.is_active.unwrap_or(true))
        .bind(dto.requires_admin.unwrap_or(false))
        .bind(dto.requires_subscription.unwrap_or(false))
        .bind(Json(dto.conditions.clone().unwrap_or_else(|| serde_json::json!({}))))
        .fetch_one(&self.pool)
        .await
        .context("Failed to create bot button")
    }

    pub async fn save(&self, button: &BotButton) -> Result<BotButton> {
        sqlx::query_as::<_, BotButton>(
            r#"
            UPDATE bot_buttons SET
                name = $2, text = $3, text_key = $4, type = $5, action = $6, action_data = $7,
                parent_menu = $8, position = $9, row = $10, emoji = $11, is_active = $12,
                requires_admin = $13, requires_subscription = $14, conditions = $15,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(button.id)
        .bind(&button.name)
        .bind(&button.text)
        .bind(&button.text_key)
        .bind(button.kind)
        .bind(button.action)
        .bind(&button.action_data)
        .bind(&button.parent_menu)
        .bind(button.position)
        .bind(button.row)
        .bind(&button.emoji)
        .bind(button.is_active)
        .bind(button.requires_admin)
        .bind(button.requires_subscription)
        .bind(&button.conditions)
        .fetch_one(&self.pool)
        .await
        .context("Failed to update bot button")
    }

    pub async fn delete(&self, id: i32) -> Result<bool> {
        let result = sqlx::query("DELETE FROM bot_buttons WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete bot button")?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn reorder(&self, placements: &[ButtonPlacement]) -> Result<()> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        for p in placements {
            sqlx::query("UPDATE bot_buttons SET row = $1, position = $2, updated_at = NOW() WHERE id = $3")
                .bind(p.row)
                .bind(p.position)
                .bind(p.id)
                .execute(&mut *tx)
                .await
                .context("Failed to update bot button placement")?;
        }

        tx.commit().await.context("Failed to commit bot button reorder")?;
        Ok(())
    }
}
