use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use uuid::Uuid;

use super::common::Currency;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "plans_type_enum", rename_all = "lowercase")]
pub enum PlanType {
    Standard,
    Premium,
    Trial,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "plans_availability_enum", rename_all = "lowercase")]
pub enum PlanAvailability {
    Public,
    Private,
    Hidden,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "plans_traffic_limit_strategy_enum", rename_all = "snake_case")]
pub enum TrafficLimitStrategy {
    NoReset,
    Day,
    Week,
    Month,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub id: i32,
    pub order_index: i32,
    pub is_active: bool,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub plan_type: PlanType,
    pub availability: PlanAvailability,
    pub name: String,
    pub description: Option<String>,
    pub tag: Option<String>,
    pub traffic_limit: i32,
    pub device_limit: i32,
    pub subscription_count: i32,
    pub traffic_limit_strategy: TrafficLimitStrategy,
    pub allowed_user_ids: Option<Vec<i64>>,
    pub internal_squads: Vec<Uuid>,
    pub external_squad: Option<Vec<Uuid>>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PlanDuration {
    pub id: i32,
    pub plan_id: i32,
    pub days: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PlanPrice {
    pub id: i32,
    pub plan_duration_id: i32,
    #[sqlx(try_from = "String")]
    pub currency: Currency,
    pub price: Decimal,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DurationWithPrices {
    #[serde(flatten)]
    pub duration: PlanDuration,
    pub prices: Vec<PlanPrice>,
}

/// A plan together with its durations and their prices.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanDetails {
    #[serde(flatten)]
    pub plan: Plan,
    pub durations: Vec<DurationWithPrices>,
}

impl PlanDetails {
    /// Groups flat duration and price rows under their owning plans, keeping plan order.
    pub fn assemble(plans: Vec<Plan>, durations: Vec<PlanDuration>, prices: Vec<PlanPrice>) -> Vec<PlanDetails> {
        plans
            .into_iter()
            .map(|plan| {
                let durations = durations
                    .iter()
                    .filter(|d| d.plan_id == plan.id)
                    .map(|d| DurationWithPrices {
                        duration: d.clone(),
                        prices: prices
                            .iter()
                            .filter(|p| p.plan_duration_id == d.id)
                            .cloned()
                            .collect(),
                    })
                    .collect();
                PlanDetails { plan, durations }
            })
            .collect()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePlan {
    pub order_index: Option<i32>,
    pub is_active: Option<bool>,
    #[serde(rename = "type")]
    pub plan_type: Option<PlanType>,
    pub availability: Option<PlanAvailability>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub tag: Option<String>,
    pub traffic_limit: Option<i32>,
    pub device_limit: Option<i32>,
    pub subscription_count: Option<i32>,
    pub traffic_limit_strategy: Option<TrafficLimitStrategy>,
    pub allowed_user_ids: Option<Vec<i64>>,
    pub internal_squads: Option<Vec<Uuid>>,
    pub external_squad: Option<Vec<Uuid>>,
}

impl UpdatePlan {
    pub fn apply(self, plan: &mut Plan) {
        if let Some(v) = self.order_index {
            plan.order_index = v;
        }
        if let Some(v) = self.is_active {
            plan.is_active = v;
        }
        if let Some(v) = self.plan_type {
            plan.plan_type = v;
        }
        if let Some(v) = self.availability {
            plan.availability = v;
        }
        if let Some(v) = self.name {
            plan.name = v;
        }
        if let Some(v) = self.description {
            plan.description = Some(v);
        }
        if let Some(v) = self.tag {
            plan.tag = Some(v);
        }
        if let Some(v) = self.traffic_limit {
            plan.traffic_limit = v;
        }
        if let Some(v) = self.device_limit {
            plan.device_limit = v;
        }
        if let Some(v) = self.subscription_count {
            plan.subscription_count = v;
        }
        if let Some(v) = self.traffic_limit_strategy {
            plan.traffic_limit_strategy = v;
        }
        if let Some(v) = self.allowed_user_ids {
            plan.allowed_user_ids = Some(v);
        }
        if let Some(v) = self.internal_squads {
            plan.internal_squads = v;
        }
        if let Some(v) = self.external_squad {
            plan.external_squad = Some(v);
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanStatistics {
    pub total: i64,
    pub active: i64,
    pub inactive: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanDetailedStatistics {
    pub total: i64,
    pub active: i64,
    pub inactive: i64,
    pub total_durations: i64,
    pub average_price: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(id: i32) -> Plan {
        let ts = chrono::DateTime::from_timestamp(0, 0).unwrap().naive_utc();
        Plan {
            id,
            order_index: id,
            is_active: true,
            plan_type: PlanType::Standard,
            availability: PlanAvailability::Public,
            name: format!("plan-{id}"),
            description: None,
            tag: None,
            traffic_limit: 0,
            device_limit: 1,
            subscription_count: 1,
            traffic_limit_strategy: TrafficLimitStrategy::NoReset,
            allowed_user_ids: None,
            internal_squads: vec![],
            external_squad: None,
            created_at: ts,
            updated_at: ts,
        }
    }

    #[test]
    fn assemble_nests_prices_under_their_duration() {
        let plans = vec![plan(1), plan(2)];
        let durations = vec![
            PlanDuration { id: 10, plan_id: 1, days: 30 },
            PlanDuration { id: 11, plan_id: 2, days: 90 },
        ];
        let prices = vec![
            PlanPrice { id: 100, plan_duration_id: 10, currency: Currency::Rub, price: Decimal::new(19900, 2) },
            PlanPrice { id: 101, plan_duration_id: 10, currency: Currency::Xtr, price: Decimal::new(100, 0) },
            PlanPrice { id: 102, plan_duration_id: 11, currency: Currency::Usd, price: Decimal::new(500, 2) },
        ];

        let details = PlanDetails::assemble(plans, durations, prices);
        assert_eq!(details.len(), 2);
        assert_eq!(details[0].durations.len(), 1);
        assert_eq!(details[0].durations[0].prices.len(), 2);
        assert_eq!(details[1].durations[0].prices[0].currency, Currency::Usd);
    }

    #[test]
    fn plan_serializes_with_nested_durations() {
        let details = PlanDetails::assemble(vec![plan(3)], vec![PlanDuration { id: 1, plan_id: 3, days: 7 }], vec![]);
        let json = serde_json::to_value(&details[0]).unwrap();
        assert_eq!(json["type"], "standard");
        assert_eq!(json["trafficLimitStrategy"], "no_reset");
        assert_eq!(json["durations"][0]["days"], 7);
    }
}
