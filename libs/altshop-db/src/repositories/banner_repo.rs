use anyhow::{Context, Result};
use sqlx::PgPool;

use crate::models::banner::{Banner, BannerType, CreateBanner};

#[derive(Debug, Clone)]
pub struct BannerRepository {
    pool: PgPool,
}

impl BannerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, kind: Option<BannerType>, locale: Option<&str>) -> Result<Vec<Banner>> {
        sqlx::query_as::<_, Banner>(
            r#"
            SELECT * FROM banners
            WHERE ($1::banners_type_enum IS NULL OR type = $1)
              AND ($2::text IS NULL OR locale = $2)
            ORDER BY type ASC, priority DESC, created_at DESC
            "#,
        )
        .bind(kind)
        .bind(locale)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch banners")
    }

    /// Active banners by priority; the date window is checked by the caller.
    pub async fn active(&self, kind: Option<BannerType>, locale: Option<&str>) -> Result<Vec<Banner>> {
        sqlx::query_as::<_, Banner>(
            r#"
            SELECT * FROM banners
            WHERE is_active
              AND ($1::banners_type_enum IS NULL OR type = $1)
              AND ($2::text IS NULL OR locale = $2)
            ORDER BY priority DESC
            "#,
        )
        .bind(kind)
        .bind(locale)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch active banners")
    }

    pub async fn get_by_id(&self, id: i32) -> Result<Option<Banner>> {
        sqlx::query_as::<_, Banner>("SELECT * FROM banners WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch banner by ID")
    }

    pub async fn create(&self, dto: &CreateBanner) -> Result<Banner> {
        sqlx::query_as::<_, Banner>(
            r#"
            INSERT INTO banners
                (name, type, file_path, file_id, locale, is_active, priority, start_date, end_date, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, NOW(), NOW())
            RETURNING *
            "#,
        )
        .bind(&dto.name)
        .bind(dto.kind.unwrap_or(BannerType::Custom))
        .bind(&dto.file_path)
        .bind(&dto.file_id)
        .bind(dto.locale.as_deref().unwrap_or("ru"))
        .bind(dto.is_active.unwrap_or(true))
        .bind(dto.priority.unwrap_or(0))
        .bind(dto.start_date)
        .bind(dto.end_date)
        .fetch_one(&self.pool)
        .await
        .context("Failed to create banner")
    }

    pub async fn save(&self, banner: &Banner) -> Result<Banner> {
        sqlx::query_as::<_, Banner>(
            r#"
            UPDATE banners SET
                name = $2,
                type = $3,
                file_path = $4,
                file_id = $5,
                locale = $6,
                is_active = $7,
                priority = $8,
                start_date = $9,
                end_date = $10,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(banner.id)
        .bind(&banner.name)
        .bind(banner.kind)
        .bind(&banner.file_path)
        .bind(&banner.file_id)
        .bind(&banner.locale)
        .bind(banner.is_active)
        .bind(banner.priority)
        .bind(banner.start_date)
        .bind(banner.end_date)
        .fetch_one(&self.pool)
        .await
        .context("Failed to update banner")
    }

    pub async fn delete(&self, id: i32) -> Result<bool> {
        let result = sqlx::query("DELETE FROM banners WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete banner")?;
        Ok(result.rows_affected() > 0)
    }
}
