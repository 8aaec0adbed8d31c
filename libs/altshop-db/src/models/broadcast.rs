use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::{FromRow, Type};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(type_name = "broadcast_status", rename_all = "UPPERCASE")]
pub enum BroadcastStatus {
    Processing,
    Completed,
    Canceled,
    Deleted,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(type_name = "broadcast_audience", rename_all = "UPPERCASE")]
pub enum BroadcastAudience {
    All,
    Plan,
    Subscribed,
    Unsubscribed,
    Expired,
    Trial,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcastButton {
    pub text: String,
    pub url: String,
}

/// Message content the bot process sends to each recipient.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BroadcastPayload {
    pub message: String,
    pub media_type: Option<String>,
    pub media_file_id: Option<String>,
    #[serde(default)]
    pub buttons: Vec<BroadcastButton>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Broadcast {
    pub id: i32,
    pub task_id: Uuid,
    pub status: BroadcastStatus,
    pub audience: BroadcastAudience,
    pub total_count: i32,
    pub success_count: i32,
    pub failed_count: i32,
    pub payload: Json<serde_json::Value>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBroadcast {
    pub audience: BroadcastAudience,
    pub message: String,
    pub plan_id: Option<i32>,
    pub media_type: Option<String>,
    pub media_file_id: Option<String>,
    #[serde(default)]
    pub buttons: Vec<BroadcastButton>,
}

impl CreateBroadcast {
    pub fn payload(&self) -> BroadcastPayload {
        BroadcastPayload {
            message: self.message.clone(),
            media_type: self.media_type.clone(),
            media_file_id: self.media_file_id.clone(),
            buttons: self.buttons.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BroadcastStats {
    pub total: i64,
    pub processing: i64,
    pub completed: i64,
    pub canceled: i64,
    pub error: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct BroadcastList {
    pub data: Vec<Broadcast>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_dto_builds_snake_case_payload() {
        let dto: CreateBroadcast = serde_json::from_value(serde_json::json!({
            "audience": "PLAN",
            "message": "hello",
            "planId": 4,
            "mediaType": "photo",
            "buttons": [{"text": "Open", "url": "https://example.com"}]
        }))
        .unwrap();
        assert_eq!(dto.audience, BroadcastAudience::Plan);
        assert_eq!(dto.plan_id, Some(4));

        let payload = serde_json::to_value(dto.payload()).unwrap();
        assert_eq!(payload["media_type"], "photo");
        assert!(payload["media_file_id"].is_null());
        assert_eq!(payload["buttons"][0]["text"], "Open");
    }
}
