use axum::{Json, extract::State};

use crate::services::remnawave_service::{
    RemnawaveHost, RemnawaveInbound, RemnawaveNode, RemnawaveUser, SystemInfo,
};
use crate::state::AppState;

pub async fn system(State(state): State<AppState>) -> Json<SystemInfo> {
    Json(state.remnawave.system_info().await)
}

pub async fn users(State(state): State<AppState>) -> Json<Vec<RemnawaveUser>> {
    Json(state.remnawave.users().await)
}

pub async fn hosts(State(state): State<AppState>) -> Json<Vec<RemnawaveHost>> {
    Json(state.remnawave.hosts().await)
}

pub async fn nodes(State(state): State<AppState>) -> Json<Vec<RemnawaveNode>> {
    Json(state.remnawave.nodes().await)
}

pub async fn inbounds(State(state): State<AppState>) -> Json<Vec<RemnawaveInbound>> {
    Json(state.remnawave.inbounds().await)
}
