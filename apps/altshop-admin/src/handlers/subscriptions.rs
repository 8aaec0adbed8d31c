use altshop_db::models::common::Page;
use altshop_db::models::subscription::{
    Subscription, SubscriptionStatistics, SubscriptionStatus, UpdateSubscription,
};
use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;

use crate::error::{ApiResult, AppError};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SubscriptionListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub status: Option<SubscriptionStatus>,
}

pub async fn list_subscriptions(
    State(state): State<AppState>,
    Query(query): Query<SubscriptionListQuery>,
) -> ApiResult<Json<Page<Subscription>>> {
    let page = super::PageQuery { page: query.page, limit: query.limit }.request();
    let (data, total) = state.subscriptions.list(page, query.status).await?;
    Ok(Json(Page::new(data, total, page.page, page.limit)))
}

pub async fn get_statistics(State(state): State<AppState>) -> ApiResult<Json<SubscriptionStatistics>> {
    Ok(Json(state.subscriptions.statistics().await?))
}

pub async fn get_subscription(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<Json<Subscription>> {
    state
        .subscriptions
        .get_by_id(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Subscription", id))
}

pub async fn get_user_subscriptions(
    State(state): State<AppState>,
    Path(telegram_id): Path<i64>,
) -> ApiResult<Json<Vec<Subscription>>> {
    Ok(Json(state.subscriptions.get_by_user(telegram_id).await?))
}

pub async fn update_subscription(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(dto): Json<UpdateSubscription>,
) -> ApiResult<Json<Subscription>> {
    if dto.traffic_limit.is_some_and(|l| l < 0) {
        return Err(AppError::Validation("trafficLimit must not be negative".to_string()));
    }
    let mut sub = state
        .subscriptions
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found("Subscription", id))?;
    dto.apply(&mut sub);

    let saved = state.subscriptions.save(&sub).await?;
    tracing::info!("Subscription {} updated", id);
    Ok(Json(saved))
}
