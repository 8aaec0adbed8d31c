use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "subscriptions_status_enum", rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Active,
    Expired,
    Disabled,
    Limited,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Expired => "expired",
            SubscriptionStatus::Disabled => "disabled",
            SubscriptionStatus::Limited => "limited",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub id: i32,
    pub user_telegram_id: i64,
    pub plan_id: i32,
    pub remnawave_uuid: Option<Uuid>,
    pub short_uuid: Option<String>,
    pub status: SubscriptionStatus,
    pub expires_at: NaiveDateTime,
    pub traffic_used: i64,
    /// Zero means unlimited traffic.
    pub traffic_limit: i64,
    pub is_auto_renew: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSubscription {
    pub status: Option<SubscriptionStatus>,
    pub expires_at: Option<NaiveDateTime>,
    pub traffic_limit: Option<i64>,
    pub is_auto_renew: Option<bool>,
    pub plan_id: Option<i32>,
}

impl UpdateSubscription {
    pub fn apply(self, sub: &mut Subscription) {
        if let Some(status) = self.status {
            sub.status = status;
        }
        if let Some(expires_at) = self.expires_at {
            sub.expires_at = expires_at;
        }
        if let Some(limit) = self.traffic_limit {
            sub.traffic_limit = limit;
        }
        if let Some(auto_renew) = self.is_auto_renew {
            sub.is_auto_renew = auto_renew;
        }
        if let Some(plan_id) = self.plan_id {
            sub.plan_id = plan_id;
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionStatistics {
    pub total: i64,
    pub active: i64,
    pub expired: i64,
    pub disabled: i64,
    pub expiring_soon: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionDetailedStatistics {
    pub total: i64,
    pub active: i64,
    pub expired: i64,
    pub disabled: i64,
    pub limited: i64,
    pub expiring_soon: i64,
    pub with_traffic_limit: i64,
    pub auto_renew: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_accepts_partial_payload() {
        let patch: UpdateSubscription =
            serde_json::from_value(serde_json::json!({"status": "disabled", "isAutoRenew": true})).unwrap();
        assert_eq!(patch.status, Some(SubscriptionStatus::Disabled));
        assert_eq!(patch.is_auto_renew, Some(true));
        assert!(patch.expires_at.is_none());
        assert!(patch.plan_id.is_none());
    }

    #[test]
    fn status_literals_are_lowercase() {
        assert_eq!(SubscriptionStatus::Active.as_str(), "active");
        assert_eq!(serde_json::to_value(SubscriptionStatus::Limited).unwrap(), "limited");
    }
}
