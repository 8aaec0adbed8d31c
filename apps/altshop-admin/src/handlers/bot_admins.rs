use altshop_db::models::bot_admin::{AdminRole, BotAdmin, CreateBotAdmin, UpdateBotAdmin};
use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::error::{ApiResult, AppError};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RoleFilter {
    pub role: Option<AdminRole>,
}

fn duplicate_admin(telegram_id: i64) -> String {
    format!("Admin with Telegram ID {} already exists", telegram_id)
}

fn parse_telegram_id(raw: &str) -> Result<i64, AppError> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| AppError::Validation(format!("Invalid Telegram ID: {}", raw)))
}

pub async fn list_admins(
    State(state): State<AppState>,
    Query(filter): Query<RoleFilter>,
) -> ApiResult<Json<Vec<BotAdmin>>> {
    Ok(Json(state.bot_admins.list(filter.role).await?))
}

pub async fn list_active(State(state): State<AppState>) -> ApiResult<Json<Vec<BotAdmin>>> {
    Ok(Json(state.bot_admins.active().await?))
}

async fn load(state: &AppState, id: i32) -> ApiResult<BotAdmin> {
    state
        .bot_admins
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found("Bot admin", id))
}

pub async fn get_admin(State(state): State<AppState>, Path(id): Path<i32>) -> ApiResult<Json<BotAdmin>> {
    Ok(Json(load(&state, id).await?))
}

pub async fn get_by_telegram_id(
    State(state): State<AppState>,
    Path(telegram_id): Path<i64>,
) -> ApiResult<Json<Option<BotAdmin>>> {
    Ok(Json(state.bot_admins.get_by_telegram_id(telegram_id).await?))
}

pub async fn create_admin(
    State(state): State<AppState>,
    Json(dto): Json<CreateBotAdmin>,
) -> ApiResult<Json<BotAdmin>> {
    let telegram_id = parse_telegram_id(&dto.telegram_id)?;
    if state.bot_admins.get_by_telegram_id(telegram_id).await?.is_some() {
        return Err(AppError::Conflict(duplicate_admin(telegram_id)));
    }

    let admin = state
        .bot_admins
        .create(telegram_id, &dto)
        .await
        .map_err(|e| AppError::conflict_on_duplicate(e, duplicate_admin(telegram_id)))?;
    tracing::info!("Bot admin {} added as {}", telegram_id, admin.role.as_str());
    Ok(Json(admin))
}

async fn modify(state: &AppState, id: i32, dto: UpdateBotAdmin) -> ApiResult<BotAdmin> {
    let mut admin = load(state, id).await?;
    dto.apply(&mut admin);
    Ok(state.bot_admins.save(&admin).await?)
}

pub async fn update_admin(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(dto): Json<UpdateBotAdmin>,
) -> ApiResult<Json<BotAdmin>> {
    Ok(Json(modify(&state, id, dto).await?))
}

pub async fn toggle_admin(State(state): State<AppState>, Path(id): Path<i32>) -> ApiResult<Json<BotAdmin>> {
    let current = load(&state, id).await?;
    let dto = UpdateBotAdmin { is_active: Some(!current.is_active), ..Default::default() };
    Ok(Json(modify(&state, id, dto).await?))
}

#[derive(Debug, Deserialize)]
pub struct RoleUpdate {
    pub role: AdminRole,
}

pub async fn update_role(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(body): Json<RoleUpdate>,
) -> ApiResult<Json<BotAdmin>> {
    let dto = UpdateBotAdmin { role: Some(body.role), ..Default::default() };
    let admin = modify(&state, id, dto).await?;
    tracing::info!("Bot admin {} role set to {}", id, body.role.as_str());
    Ok(Json(admin))
}

#[derive(Debug, Deserialize)]
pub struct PermissionsUpdate {
    pub permissions: Vec<String>,
}

pub async fn update_permissions(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(body): Json<PermissionsUpdate>,
) -> ApiResult<Json<BotAdmin>> {
    let dto = UpdateBotAdmin { permissions: Some(body.permissions), ..Default::default() };
    Ok(Json(modify(&state, id, dto).await?))
}

pub async fn delete_admin(State(state): State<AppState>, Path(id): Path<i32>) -> ApiResult<Json<Value>> {
    if !state.bot_admins.delete(id).await? {
        return Err(AppError::not_found("Bot admin", id));
    }
    Ok(Json(json!({ "success": true })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn telegram_ids_parse_from_form_strings() {
        assert_eq!(parse_telegram_id(" 123456789 ").unwrap(), 123456789);
        assert!(matches!(parse_telegram_id("abc"), Err(AppError::Validation(_))));
    }

    #[test]
    fn racing_duplicate_telegram_id_is_a_conflict() {
        let err = AppError::conflict_on_duplicate(
            crate::error::unique_violation("Failed to create bot admin"),
            duplicate_admin(42),
        );
        assert!(matches!(err, AppError::Conflict(m) if m == "Admin with Telegram ID 42 already exists"));
    }
}
