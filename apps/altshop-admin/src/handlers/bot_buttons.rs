use std::collections::BTreeMap;

use altshop_db::models::bot_button::{
    BotButton, ButtonPlacement, ButtonType, CreateBotButton, UpdateBotButton,
};
use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::error::{ApiResult, AppError};
use crate::state::AppState;

const ROOT_MENU: &str = "root";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ButtonFilter {
    #[serde(rename = "type")]
    pub kind: Option<ButtonType>,
    pub parent_menu: Option<String>,
}

/// Groups buttons by parent menu; top-level buttons land under `root`.
fn menu_structure(buttons: Vec<BotButton>) -> BTreeMap<String, Vec<BotButton>> {
    let mut menus: BTreeMap<String, Vec<BotButton>> = BTreeMap::new();
    for button in buttons {
        let menu = button.parent_menu.clone().unwrap_or_else(|| ROOT_MENU.to_string());
        menus.entry(menu).or_default().push(button);
    }
    menus
}

pub async fn list_buttons(
    State(state): State<AppState>,
    Query(filter): Query<ButtonFilter>,
) -> ApiResult<Json<Vec<BotButton>>> {
    let buttons = state.bot_buttons.list(filter.kind, filter.parent_menu.as_deref()).await?;
    Ok(Json(buttons))
}

pub async fn get_structure(State(state): State<AppState>) -> ApiResult<Json<BTreeMap<String, Vec<BotButton>>>> {
    let buttons = state.bot_buttons.list(None, None).await?;
    Ok(Json(menu_structure(buttons)))
}

async fn load(state: &AppState, id: i32) -> ApiResult<BotButton> {
    state
        .bot_buttons
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found("Bot button", id))
}

pub async fn get_button(State(state): State<AppState>, Path(id): Path<i32>) -> ApiResult<Json<BotButton>> {
    Ok(Json(load(&state, id).await?))
}

pub async fn create_button(
    State(state): State<AppState>,
    Json(dto): Json<CreateBotButton>,
) -> ApiResult<Json<BotButton>> {
    let button = state.bot_buttons.create(&dto).await?;
    tracing::info!("Bot button {} created", button.name);
    Ok(Json(button))
}

pub async fn update_button(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(dto): Json<UpdateBotButton>,
) -> ApiResult<Json<BotButton>> {
    let mut button = load(&state, id).await?;
    dto.apply(&mut button);
    Ok(Json(state.bot_buttons.save(&button).await?))
}

pub async fn toggle_button(State(state): State<AppState>, Path(id): Path<i32>) -> ApiResult<Json<BotButton>> {
    let mut button = load(&state, id).await?;
    button.is_active = !button.is_active;
    Ok(Json(state.bot_buttons.save(&button).await?))
}

pub async fn reorder_buttons(
    State(state): State<AppState>,
    Json(placements): Json<Vec<ButtonPlacement>>,
) -> ApiResult<Json<Value>> {
    state.bot_buttons.reorder(&placements).await?;
    tracing::info!("Reordered {} bot buttons", placements.len());
    Ok(Json(json!({ "success": true })))
}

pub async fn delete_button(State(state): State<AppState>, Path(id): Path<i32>) -> ApiResult<Json<Value>> {
    if !state.bot_buttons.delete(id).await? {
        return Err(AppError::not_found("Bot button", id));
    }
    Ok(Json(json!({ "success": true })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use altshop_db::models::bot_button::ButtonAction;
    use sqlx::types::Json as SqlJson;

    fn button(id: i32, parent: Option<&str>) -> BotButton {
        let now = chrono::Utc::now().naive_utc();
        BotButton {
            id,
            name: format!("b{id}"),
            text: format!("Button {id}"),
            text_key: None,
            kind: ButtonType::Inline,
            action: ButtonAction::Callback,
            action_data: None,
            parent_menu: parent.map(str::to_string),
            position: 0,
            row: 0,
            emoji: None,
            is_active: true,
            requires_admin: false,
            requires_subscription: false,
            conditions: SqlJson(json!({})),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn orphan_buttons_group_under_root() {
        let menus = menu_structure(vec![button(1, None), button(2, Some("settings")), button(3, None)]);
        assert_eq!(menus.len(), 2);
        let root: Vec<i32> = menus["root"].iter().map(|b| b.id).collect();
        assert_eq!(root, vec![1, 3]);
        assert_eq!(menus["settings"][0].id, 2);
    }
}
