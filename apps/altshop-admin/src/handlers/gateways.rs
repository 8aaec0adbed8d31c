use altshop_db::models::gateway::{GatewaySettingsPatch, GatewayView, PaymentGateway, UpdateGateway};
use axum::{
    Json,
    extract::{Path, State},
};
use serde_json::{Value, json};

use crate::error::{ApiResult, AppError};
use crate::services::gateway_service::Direction;
use crate::state::AppState;

fn view(gateway: Option<PaymentGateway>, id: i32) -> ApiResult<Json<GatewayView>> {
    gateway
        .map(|g| Json(GatewayView::from(g)))
        .ok_or_else(|| AppError::not_found("Payment gateway", id))
}

pub async fn list_gateways(State(state): State<AppState>) -> ApiResult<Json<Vec<GatewayView>>> {
    let gateways = state.gateways.get_all().await?;
    Ok(Json(gateways.into_iter().map(GatewayView::from).collect()))
}

pub async fn get_gateway(State(state): State<AppState>, Path(id): Path<i32>) -> ApiResult<Json<GatewayView>> {
    view(state.gateways.get_by_id(id).await?, id)
}

pub async fn update_gateway(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(dto): Json<UpdateGateway>,
) -> ApiResult<Json<GatewayView>> {
    view(state.gateways.update(id, dto).await?, id)
}

pub async fn update_gateway_settings(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(patch): Json<GatewaySettingsPatch>,
) -> ApiResult<Json<GatewayView>> {
    view(state.gateways.update_settings(id, patch).await?, id)
}

pub async fn toggle_gateway(State(state): State<AppState>, Path(id): Path<i32>) -> ApiResult<Json<GatewayView>> {
    view(state.gateways.toggle(id).await?, id)
}

pub async fn move_up(State(state): State<AppState>, Path(id): Path<i32>) -> ApiResult<Json<Value>> {
    let success = state.gateways.move_gateway(id, Direction::Up).await?;
    Ok(Json(json!({ "success": success })))
}

pub async fn move_down(State(state): State<AppState>, Path(id): Path<i32>) -> ApiResult<Json<Value>> {
    let success = state.gateways.move_gateway(id, Direction::Down).await?;
    Ok(Json(json!({ "success": success })))
}
