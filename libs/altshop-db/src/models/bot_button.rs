use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::{FromRow, Type};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "bot_buttons_type_enum", rename_all = "snake_case")]
pub enum ButtonType {
    MainMenu,
    Inline,
    Reply,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "bot_buttons_action_enum", rename_all = "lowercase")]
pub enum ButtonAction {
    Url,
    Callback,
    State,
    Webapp,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct BotButton {
    pub id: i32,
    pub name: String,
    pub text: String,
    pub text_key: Option<String>,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub kind: ButtonType,
    pub action: ButtonAction,
    pub action_data: Option<String>,
    pub parent_menu: Option<String>,
    pub position: i32,
    pub row: i32,
    pub emoji: Option<String>,
    pub is_active: bool,
    pub requires_admin: bool,
    pub requires_subscription: bool,
    pub conditions: Json<serde_json::Value>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBotButton {
    pub name: String,
    pub text: String,
    pub text_key: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<ButtonType>,
    pub action: Option<ButtonAction>,
    pub action_data: Option<String>,
    pub parent_menu: Option<String>,
    pub position: Option<i32>,
    pub row: Option<i32>,
    pub emoji: Option<String>,
    pub is_active: Option<bool>,
    pub requires_admin: Option<bool>,
    pub requires_subscription: Option<bool>,
    pub conditions: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBotButton {
    pub name: Option<String>,
    pub text: Option<String>,
    pub text_key: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<ButtonType>,
    pub action: Option<ButtonAction>,
    pub action_data: Option<String>,
    pub parent_menu: Option<String>,
    pub position: Option<i32>,
    pub row: Option<i32>,
    pub emoji: Option<String>,
    pub is_active: Option<bool>,
    pub requires_admin: Option<bool>,
    pub requires_subscription: Option<bool>,
    pub conditions: Option<serde_json::Value>,
}

impl UpdateBotButton {
    pub fn apply(self, button: &mut BotButton) {
        if let Some(v) = self.name {
            button.name = v;
        }
        if let Some(v) = self.text {
            button.text = v;
        }
        if let Some(v) = self.text_key {
            button.text_key = Some(v);
        }
        if let Some(v) = self.kind {
            button.kind = v;
        }
        if let Some(v) = self.action {
            button.action = v;
        }
        if let Some(v) = self.action_data {
            button.action_data = Some(v);
        }
        if let Some(v) = self.parent_menu {
            button.parent_menu = Some(v);
        }
        if let Some(v) = self.position {
            button.position = v;
        }
        if let Some(v) = self.row {
            button.row = v;
        }
        if let Some(v) = self.emoji {
            button.emoji = Some(v);
        }
        if let Some(v) = self.is_active {
            button.is_active = v;
        }
        if let Some(v) = self.requires_admin {
            button.requires_admin = v;
        }
        if let Some(v) = self.requires_subscription {
            button.requires_subscription = v;
        }
        if let Some(v) = self.conditions {
            button.conditions = Json(v);
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ButtonPlacement {
    pub id: i32,
    pub row: i32,
    pub position: i32,
}
