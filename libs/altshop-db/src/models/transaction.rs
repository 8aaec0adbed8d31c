use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::{FromRow, Type};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "transactions_status_enum", rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "transactions_type_enum", rename_all = "lowercase")]
pub enum TransactionType {
    Purchase,
    Renewal,
    Upgrade,
    Refund,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: i32,
    pub user_telegram_id: i64,
    pub subscription_id: Option<i32>,
    pub plan_id: i32,
    pub amount: Decimal,
    /// Free-form currency code; older rows predate the currency enum.
    pub currency: String,
    pub status: TransactionStatus,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub payment_gateway: Option<String>,
    pub external_id: Option<String>,
    pub metadata: Option<Json<serde_json::Value>>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CurrencyTotal {
    pub currency: String,
    pub total: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct GatewayIncome {
    pub name: String,
    pub total: i64,
    pub income: Decimal,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionStatistics {
    pub total: i64,
    pub completed: i64,
    pub pending: i64,
    pub failed: i64,
    pub revenue: Vec<CurrencyTotal>,
    pub today_count: i64,
    pub today_revenue: Vec<CurrencyTotal>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionDetailedStatistics {
    pub total: i64,
    pub completed: i64,
    pub free: i64,
    pub by_gateway: Vec<GatewayIncome>,
}
