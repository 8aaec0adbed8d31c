use altshop_db::models::common::Page;
use altshop_db::models::promocode::{
    CreatePromocode, Promocode, PromocodeActivation, PromocodeStatistics, UpdatePromocode,
};
use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde_json::{Value, json};

use super::PageQuery;
use crate::error::{ApiResult, AppError};
use crate::state::AppState;

pub async fn list_promocodes(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Json<Page<Promocode>>> {
    let page = query.request();
    let (data, total) = state.promocodes.list(page).await?;
    Ok(Json(Page::new(data, total, page.page, page.limit)))
}

pub async fn get_statistics(State(state): State<AppState>) -> ApiResult<Json<PromocodeStatistics>> {
    Ok(Json(state.promocodes.statistics().await?))
}

async fn load(state: &AppState, id: i32) -> ApiResult<Promocode> {
    state
        .promocodes
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found("Promocode", id))
}

pub async fn get_promocode(State(state): State<AppState>, Path(id): Path<i32>) -> ApiResult<Json<Promocode>> {
    Ok(Json(load(&state, id).await?))
}

pub async fn get_activations(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<Json<Vec<PromocodeActivation>>> {
    load(&state, id).await?;
    Ok(Json(state.promocodes.activations(id).await?))
}

fn check_code(code: &str) -> Result<(), AppError> {
    if code.trim().is_empty() {
        return Err(AppError::Validation("code must not be empty".to_string()));
    }
    Ok(())
}

fn duplicate_code(code: &str) -> String {
    format!("Promocode with code {} already exists", code)
}

/// A concurrent write of the same code can still pass this check. The writes map the unique
/// index violation to the same conflict.
async fn ensure_unique(state: &AppState, code: &str, except_id: Option<i32>) -> ApiResult<()> {
    if state.promocodes.code_taken(code, except_id).await? {
        return Err(AppError::Conflict(duplicate_code(code)));
    }
    Ok(())
}

pub async fn create_promocode(
    State(state): State<AppState>,
    Json(dto): Json<CreatePromocode>,
) -> ApiResult<Json<Promocode>> {
    check_code(&dto.code)?;
    ensure_unique(&state, &dto.code, None).await?;

    let promo = state
        .promocodes
        .create(&dto)
        .await
        .map_err(|e| AppError::conflict_on_duplicate(e, duplicate_code(&dto.code)))?;
    tracing::info!("Promocode {} created (id {})", promo.code, promo.id);
    Ok(Json(promo))
}

pub async fn update_promocode(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(dto): Json<UpdatePromocode>,
) -> ApiResult<Json<Promocode>> {
    let mut promo = load(&state, id).await?;
    if let Some(code) = dto.code.as_deref() {
        check_code(code)?;
        if code != promo.code {
            ensure_unique(&state, code, Some(id)).await?;
        }
    }
    dto.apply(&mut promo);

    let saved = state
        .promocodes
        .save(&promo)
        .await
        .map_err(|e| AppError::conflict_on_duplicate(e, duplicate_code(&promo.code)))?;
    tracing::info!("Promocode {} updated", id);
    Ok(Json(saved))
}

pub async fn toggle_promocode(State(state): State<AppState>, Path(id): Path<i32>) -> ApiResult<Json<Promocode>> {
    let mut promo = load(&state, id).await?;
    promo.is_active = !promo.is_active;
    Ok(Json(state.promocodes.save(&promo).await?))
}

pub async fn delete_promocode(State(state): State<AppState>, Path(id): Path<i32>) -> ApiResult<Json<Value>> {
    if !state.promocodes.delete(id).await? {
        return Err(AppError::not_found("Promocode", id));
    }
    tracing::info!("Promocode {} deleted", id);
    Ok(Json(json!({ "message": "Promocode deleted successfully" })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_codes_are_rejected() {
        assert!(check_code("WELCOME").is_ok());
        assert!(matches!(check_code("   "), Err(AppError::Validation(_))));
        assert!(check_code("").is_err());
    }

    #[test]
    fn racing_duplicate_code_is_a_conflict() {
        let err = AppError::conflict_on_duplicate(
            crate::error::unique_violation("Failed to create promocode"),
            duplicate_code("WELCOME"),
        );
        match err {
            AppError::Conflict(message) => assert_eq!(message, "Promocode with code WELCOME already exists"),
            other => panic!("expected conflict, got {other:?}"),
        }
    }
}
