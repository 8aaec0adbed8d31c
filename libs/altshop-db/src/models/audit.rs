use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::{FromRow, Type};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "audit_logs_action_enum", rename_all = "snake_case")]
pub enum AuditAction {
    Create,
    Update,
    Delete,
    Login,
    Logout,
    Broadcast,
    SettingsChange,
    UserBan,
    UserUnban,
    SubscriptionGrant,
    SubscriptionRevoke,
    Payment,
    PromocodeUse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "audit_logs_entity_type_enum", rename_all = "lowercase")]
pub enum AuditEntity {
    User,
    Subscription,
    Plan,
    Promocode,
    Settings,
    Broadcast,
    Admin,
    Button,
    Banner,
    Gateway,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AuditLog {
    pub id: i32,
    pub action: AuditAction,
    pub entity_type: AuditEntity,
    pub entity_id: Option<String>,
    pub admin_id: Option<i64>,
    pub admin_username: Option<String>,
    pub old_value: Option<Json<serde_json::Value>>,
    pub new_value: Option<Json<serde_json::Value>>,
    pub description: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone)]
pub struct NewAuditLog {
    pub action: AuditAction,
    pub entity_type: AuditEntity,
    pub entity_id: Option<String>,
    pub admin_id: Option<i64>,
    pub admin_username: Option<String>,
    pub old_value: Option<serde_json::Value>,
    pub new_value: Option<serde_json::Value>,
    pub description: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl NewAuditLog {
    pub fn new(action: AuditAction, entity_type: AuditEntity) -> Self {
        Self {
            action,
            entity_type,
            entity_id: None,
            admin_id: None,
            admin_username: None,
            old_value: None,
            new_value: None,
            description: None,
            ip_address: None,
            user_agent: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AuditFilter {
    pub action: Option<AuditAction>,
    pub entity_type: Option<AuditEntity>,
    pub entity_id: Option<String>,
    pub admin_id: Option<i64>,
    pub start_date: Option<NaiveDateTime>,
    pub end_date: Option<NaiveDateTime>,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuditPage {
    pub data: Vec<AuditLog>,
    pub total: i64,
}

#[derive(Debug, Clone, FromRow)]
pub struct GroupCount {
    pub key: String,
    pub count: i64,
}
