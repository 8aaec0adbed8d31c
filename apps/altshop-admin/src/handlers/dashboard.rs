use axum::{Json, extract::State};

use crate::error::ApiResult;
use crate::services::dashboard_service::{
    DetailedStatistics, Overview, RecentActivity, SystemMetrics, system_metrics,
};
use crate::state::AppState;

pub async fn overview(State(state): State<AppState>) -> ApiResult<Json<Overview>> {
    Ok(Json(state.dashboard.overview().await?))
}

pub async fn statistics(State(state): State<AppState>) -> ApiResult<Json<DetailedStatistics>> {
    Ok(Json(state.dashboard.statistics().await?))
}

pub async fn recent(State(state): State<AppState>) -> ApiResult<Json<RecentActivity>> {
    Ok(Json(state.dashboard.recent().await?))
}

pub async fn get_system_metrics(State(state): State<AppState>) -> Json<SystemMetrics> {
    let cpu = state.cpu_sampler.lock().await.sample();
    Json(system_metrics(cpu))
}
