use altshop_db::models::banner::{Banner, BannerType, CreateBanner, UpdateBanner};
use axum::{
    Json,
    extract::{Path, Query, State},
};
use chrono::{NaiveDateTime, Utc};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::error::{ApiResult, AppError};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct BannerFilter {
    #[serde(rename = "type")]
    pub kind: Option<BannerType>,
    pub locale: Option<String>,
}

/// Drops banners outside their date window and sorts by priority, highest first.
fn live_banners(mut banners: Vec<Banner>, now: NaiveDateTime) -> Vec<Banner> {
    banners.retain(|b| b.is_live_at(now));
    banners.sort_by(|a, b| b.priority.cmp(&a.priority));
    banners
}

pub async fn list_banners(
    State(state): State<AppState>,
    Query(filter): Query<BannerFilter>,
) -> ApiResult<Json<Vec<Banner>>> {
    Ok(Json(state.banners.list(filter.kind, filter.locale.as_deref()).await?))
}

pub async fn list_active(
    State(state): State<AppState>,
    Query(filter): Query<BannerFilter>,
) -> ApiResult<Json<Vec<Banner>>> {
    let banners = state.banners.active(filter.kind, filter.locale.as_deref()).await?;
    Ok(Json(live_banners(banners, Utc::now().naive_utc())))
}

async fn load(state: &AppState, id: i32) -> ApiResult<Banner> {
    state
        .banners
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found("Banner", id))
}

pub async fn get_banner(State(state): State<AppState>, Path(id): Path<i32>) -> ApiResult<Json<Banner>> {
    Ok(Json(load(&state, id).await?))
}

pub async fn create_banner(
    State(state): State<AppState>,
    Json(dto): Json<CreateBanner>,
) -> ApiResult<Json<Banner>> {
    let banner = state.banners.create(&dto).await?;
    tracing::info!("Banner {} created", banner.name);
    Ok(Json(banner))
}

async fn modify(state: &AppState, id: i32, dto: UpdateBanner) -> ApiResult<Banner> {
    let mut banner = load(state, id).await?;
    dto.apply(&mut banner);
    Ok(state.banners.save(&banner).await?)
}

pub async fn update_banner(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(dto): Json<UpdateBanner>,
) -> ApiResult<Json<Banner>> {
    Ok(Json(modify(&state, id, dto).await?))
}

pub async fn toggle_banner(State(state): State<AppState>, Path(id): Path<i32>) -> ApiResult<Json<Banner>> {
    let current = load(&state, id).await?;
    let dto = UpdateBanner { is_active: Some(!current.is_active), ..Default::default() };
    Ok(Json(modify(&state, id, dto).await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileIdUpdate {
    pub file_id: String,
}

/// The bot caches the Telegram file id after the first upload.
pub async fn update_file_id(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(body): Json<FileIdUpdate>,
) -> ApiResult<Json<Banner>> {
    let dto = UpdateBanner { file_id: Some(body.file_id), ..Default::default() };
    Ok(Json(modify(&state, id, dto).await?))
}

pub async fn delete_banner(State(state): State<AppState>, Path(id): Path<i32>) -> ApiResult<Json<Value>> {
    if !state.banners.delete(id).await? {
        return Err(AppError::not_found("Banner", id));
    }
    Ok(Json(json!({ "success": true })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn banner(id: i32, priority: i32, start: Option<NaiveDateTime>, end: Option<NaiveDateTime>) -> Banner {
        let now = Utc::now().naive_utc();
        Banner {
            id,
            name: format!("banner-{id}"),
            kind: BannerType::Menu,
            file_path: None,
            file_id: None,
            locale: "ru".into(),
            is_active: true,
            priority,
            start_date: start,
            end_date: end,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn active_banners_filter_window_and_sort_by_priority() {
        let now = Utc::now().naive_utc();
        let day = Duration::days(1);
        let banners = vec![
            banner(1, 1, None, None),
            banner(2, 10, Some(now - day), Some(now + day)),
            banner(3, 50, Some(now + day), None),
            banner(4, 5, None, Some(now - day)),
        ];
        let ids: Vec<i32> = live_banners(banners, now).iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![2, 1]);
    }
}
