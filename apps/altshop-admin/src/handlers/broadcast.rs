use altshop_db::models::broadcast::{
    Broadcast, BroadcastAudience, BroadcastList, BroadcastStats, CreateBroadcast,
};
use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use serde_json::{Value, json};

use super::PageQuery;
use crate::error::{ApiResult, AppError};
use crate::state::AppState;

pub async fn list_broadcasts(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Json<BroadcastList>> {
    let page = query.request();
    let (data, total) = state.broadcasts.list(page).await?;
    Ok(Json(BroadcastList { data, total, page: page.page, limit: page.limit }))
}

pub async fn get_stats(State(state): State<AppState>) -> ApiResult<Json<BroadcastStats>> {
    Ok(Json(state.broadcasts.stats().await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudienceQuery {
    pub audience: BroadcastAudience,
    pub plan_id: Option<i32>,
}

pub async fn audience_count(
    State(state): State<AppState>,
    Query(query): Query<AudienceQuery>,
) -> ApiResult<Json<Value>> {
    let count = state.broadcast.audience_count(query.audience, query.plan_id).await?;
    Ok(Json(json!({ "count": count })))
}

pub async fn get_broadcast(State(state): State<AppState>, Path(id): Path<i32>) -> ApiResult<Json<Broadcast>> {
    state
        .broadcasts
        .get_by_id(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Broadcast", id))
}

pub async fn create_broadcast(
    State(state): State<AppState>,
    Json(dto): Json<CreateBroadcast>,
) -> ApiResult<Json<Broadcast>> {
    Ok(Json(state.broadcast.create(dto).await?))
}

pub async fn cancel_broadcast(State(state): State<AppState>, Path(id): Path<i32>) -> ApiResult<Json<Broadcast>> {
    let broadcast = state
        .broadcasts
        .cancel(id)
        .await?
        .ok_or_else(|| AppError::not_found("Broadcast", id))?;
    tracing::info!("Broadcast {} is now {:?}", id, broadcast.status);
    Ok(Json(broadcast))
}

pub async fn delete_broadcast(State(state): State<AppState>, Path(id): Path<i32>) -> ApiResult<Json<bool>> {
    Ok(Json(state.broadcasts.delete(id).await?))
}
