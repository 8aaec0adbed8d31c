use anyhow::{Context, Result};
use sqlx::PgPool;
use sqlx::types::Json;

use crate::models::settings::{SETTINGS_ID, Settings};

/// How far along the bot is in creating the settings singleton.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SettingsState {
    Present,
    TableMissing,
    RowMissing,
}

#[derive(Debug, Clone)]
pub struct SettingsRepository {
    pool: PgPool,
}

impl SettingsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get(&self) -> Result<Option<Settings>> {
        sqlx::query_as::<_, Settings>("SELECT * FROM settings WHERE id = $1")
            .bind(SETTINGS_ID)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch settings")
    }

    /// Writes the whole row back in one statement.
    pub async fn save(&self, settings: &Settings) -> Result<Settings> {
        sqlx::query_as::<_, Settings>(
            r#"
            UPDATE settings SET
                rules_required = $2,
                channel_required = $3,
                rules_link = $4,
                channel_id = $5,
                channel_link = $6,
                access_mode = $7,
                default_currency = $8,
                user_notifications = $9,
                system_notifications = $10,
                referral = $11,
                partner = $12,
                multi_subscription = $13
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(settings.id)
        .bind(settings.rules_required)
        .bind(settings.channel_required)
        .bind(&settings.rules_link)
        .bind(settings.channel_id)
        .bind(&settings.channel_link)
        .bind(settings.access_mode.as_str())
        .bind(settings.default_currency.as_str())
        .bind(Json(&settings.user_notifications))
        .bind(Json(&settings.system_notifications))
        .bind(Json(&settings.referral))
        .bind(Json(&settings.partner))
        .bind(Json(&settings.multi_subscription))
        .fetch_one(&self.pool)
        .await
        .context("Failed to update settings")
    }

    pub async fn state(&self) -> Result<SettingsState> {
        let table_exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT FROM information_schema.tables
                WHERE table_schema = 'public' AND table_name = 'settings'
            )
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .context("Failed to check settings table")?;

        if !table_exists {
            return Ok(SettingsState::TableMissing);
        }

        let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM settings")
            .fetch_one(&self.pool)
            .await
            .context("Failed to count settings rows")?;

        Ok(if rows == 0 { SettingsState::RowMissing } else { SettingsState::Present })
    }
}
