use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::{FromRow, Type};

use super::common::UnknownVariant;

/// Role shared by bot operators and panel administrators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "bot_admins_role_enum", rename_all = "snake_case")]
pub enum AdminRole {
    SuperAdmin,
    Admin,
    Moderator,
}

impl AdminRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdminRole::SuperAdmin => "super_admin",
            AdminRole::Admin => "admin",
            AdminRole::Moderator => "moderator",
        }
    }
}

impl TryFrom<String> for AdminRole {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "super_admin" => Ok(AdminRole::SuperAdmin),
            "admin" => Ok(AdminRole::Admin),
            "moderator" => Ok(AdminRole::Moderator),
            _ => Err(UnknownVariant { kind: "admin role", value }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct BotAdmin {
    pub id: i32,
    pub telegram_id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: AdminRole,
    pub permissions: Json<Vec<String>>,
    pub is_active: bool,
    pub added_by: Option<i64>,
    pub last_activity: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Telegram ids arrive as strings from the panel form.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBotAdmin {
    pub telegram_id: String,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: Option<AdminRole>,
    pub permissions: Option<Vec<String>>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBotAdmin {
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: Option<AdminRole>,
    pub permissions: Option<Vec<String>>,
    pub is_active: Option<bool>,
}

impl UpdateBotAdmin {
    pub fn apply(self, admin: &mut BotAdmin) {
        if let Some(v) = self.username {
            admin.username = Some(v);
        }
        if let Some(v) = self.first_name {
            admin.first_name = Some(v);
        }
        if let Some(v) = self.last_name {
            admin.last_name = Some(v);
        }
        if let Some(v) = self.role {
            admin.role = v;
        }
        if let Some(v) = self.permissions {
            admin.permissions = Json(v);
        }
        if let Some(v) = self.is_active {
            admin.is_active = v;
        }
    }
}
