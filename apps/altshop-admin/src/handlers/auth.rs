use altshop_db::models::admin_user::AdminUser;
use axum::{
    Extension, Json,
    extract::State,
    http::{HeaderMap, header},
};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::error::ApiResult;
use crate::services::auth_service::{Claims, LoginOrigin, LoginResponse};
use crate::state::AppState;
use crate::utils::extract_client_ip;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let origin = LoginOrigin {
        ip_address: extract_client_ip(&headers),
        user_agent: headers
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    };
    let response = state.auth.login(&body.username, &body.password, origin).await?;
    Ok(Json(response))
}

pub async fn profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<AdminUser>> {
    Ok(Json(state.auth.profile(&claims).await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

pub async fn change_password(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(body): Json<ChangePasswordRequest>,
) -> ApiResult<Json<Value>> {
    state
        .auth
        .change_password(&claims, &body.old_password, &body.new_password)
        .await?;
    Ok(Json(json!({ "message": "Password changed successfully" })))
}

pub async fn verify(Extension(claims): Extension<Claims>) -> Json<Value> {
    Json(json!({ "valid": true, "user": claims }))
}
