use altshop_db::models::common::Page;
use altshop_db::models::user::{UpdateUser, User, UserStatistics};
use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;

use crate::error::{ApiResult, AppError};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct UserListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub search: Option<String>,
}

pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<UserListQuery>,
) -> ApiResult<Json<Page<User>>> {
    let page = super::PageQuery { page: query.page, limit: query.limit }.request();
    let search = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty());

    let (data, total) = state.users.list(page, search).await?;
    Ok(Json(Page::new(data, total, page.page, page.limit)))
}

pub async fn get_statistics(State(state): State<AppState>) -> ApiResult<Json<UserStatistics>> {
    Ok(Json(state.users.statistics().await?))
}

pub async fn get_user(State(state): State<AppState>, Path(id): Path<i32>) -> ApiResult<Json<User>> {
    state
        .users
        .get_by_id(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("User", id))
}

pub async fn get_by_telegram_id(
    State(state): State<AppState>,
    Path(telegram_id): Path<i64>,
) -> ApiResult<Json<User>> {
    state
        .users
        .get_by_telegram_id(telegram_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("User with Telegram ID {} not found", telegram_id)))
}

fn validate(dto: &UpdateUser) -> Result<(), AppError> {
    for (field, value) in [
        ("personalDiscount", dto.personal_discount),
        ("purchaseDiscount", dto.purchase_discount),
    ] {
        if value.is_some_and(|v| !(0..=100).contains(&v)) {
            return Err(AppError::Validation(format!("{} must be between 0 and 100", field)));
        }
    }
    if dto.points.is_some_and(|p| p < 0) {
        return Err(AppError::Validation("points must not be negative".to_string()));
    }
    Ok(())
}

async fn modify(state: &AppState, id: i32, dto: UpdateUser) -> ApiResult<User> {
    let mut user = state
        .users
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found("User", id))?;
    dto.apply(&mut user);
    Ok(state.users.save(&user).await?)
}

pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(dto): Json<UpdateUser>,
) -> ApiResult<Json<User>> {
    validate(&dto)?;
    let user = modify(&state, id, dto).await?;
    tracing::info!("User {} updated", id);
    Ok(Json(user))
}

pub async fn block_user(State(state): State<AppState>, Path(id): Path<i32>) -> ApiResult<Json<User>> {
    let dto = UpdateUser { is_blocked: Some(true), ..Default::default() };
    let user = modify(&state, id, dto).await?;
    tracing::info!("User {} blocked", id);
    Ok(Json(user))
}

pub async fn unblock_user(State(state): State<AppState>, Path(id): Path<i32>) -> ApiResult<Json<User>> {
    let dto = UpdateUser { is_blocked: Some(false), ..Default::default() };
    let user = modify(&state, id, dto).await?;
    tracing::info!("User {} unblocked", id);
    Ok(Json(user))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discounts_and_points_are_range_checked() {
        assert!(validate(&UpdateUser { personal_discount: Some(100), points: Some(0), ..Default::default() }).is_ok());
        assert!(validate(&UpdateUser { personal_discount: Some(101), ..Default::default() }).is_err());
        assert!(validate(&UpdateUser { purchase_discount: Some(-1), ..Default::default() }).is_err());
        assert!(validate(&UpdateUser { points: Some(-5), ..Default::default() }).is_err());
    }
}
