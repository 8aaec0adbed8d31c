use altshop_db::models::plan::{PlanDetails, PlanStatistics, UpdatePlan};
use altshop_db::repositories::plan_repo::ReorderOutcome;
use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::error::{ApiResult, AppError};
use crate::state::AppState;

pub async fn list_plans(State(state): State<AppState>) -> ApiResult<Json<Vec<PlanDetails>>> {
    Ok(Json(state.plans.get_all().await?))
}

pub async fn get_statistics(State(state): State<AppState>) -> ApiResult<Json<PlanStatistics>> {
    Ok(Json(state.plans.statistics().await?))
}

async fn load(state: &AppState, id: i32) -> ApiResult<PlanDetails> {
    state
        .plans
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found("Plan", id))
}

pub async fn get_plan(State(state): State<AppState>, Path(id): Path<i32>) -> ApiResult<Json<PlanDetails>> {
    Ok(Json(load(&state, id).await?))
}

async fn modify(state: &AppState, id: i32, dto: UpdatePlan) -> ApiResult<PlanDetails> {
    let mut details = load(state, id).await?;
    dto.apply(&mut details.plan);
    details.plan = state.plans.save(&details.plan).await?;
    Ok(details)
}

pub async fn update_plan(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(dto): Json<UpdatePlan>,
) -> ApiResult<Json<PlanDetails>> {
    let details = modify(&state, id, dto).await?;
    tracing::info!("Plan {} updated", id);
    Ok(Json(details))
}

pub async fn toggle_plan(State(state): State<AppState>, Path(id): Path<i32>) -> ApiResult<Json<PlanDetails>> {
    let current = load(&state, id).await?;
    let dto = UpdatePlan { is_active: Some(!current.plan.is_active), ..Default::default() };
    Ok(Json(modify(&state, id, dto).await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReorderPlans {
    pub plan_ids: Vec<i32>,
}

pub async fn reorder_plans(
    State(state): State<AppState>,
    Json(body): Json<ReorderPlans>,
) -> ApiResult<Json<Value>> {
    match state.plans.reorder(&body.plan_ids).await? {
        ReorderOutcome::Reordered => {
            tracing::info!("Reordered {} plans", body.plan_ids.len());
            Ok(Json(json!({ "success": true })))
        }
        ReorderOutcome::UnknownPlan(id) => Err(AppError::not_found("Plan", id)),
    }
}
