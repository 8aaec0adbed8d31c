use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "promocodes_type_enum", rename_all = "lowercase")]
pub enum PromocodeType {
    Discount,
    Bonus,
    Trial,
}

impl PromocodeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PromocodeType::Discount => "discount",
            PromocodeType::Bonus => "bonus",
            PromocodeType::Trial => "trial",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Promocode {
    pub id: i32,
    pub code: String,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub kind: PromocodeType,
    pub discount: i32,
    pub bonus_days: i32,
    /// Zero means no activation cap.
    pub max_activations: i32,
    pub current_activations: i32,
    pub is_active: bool,
    pub valid_from: Option<NaiveDateTime>,
    pub valid_until: Option<NaiveDateTime>,
    pub plan_ids: Option<Vec<i32>>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PromocodeActivation {
    pub id: i32,
    pub promocode_id: i32,
    pub user_telegram_id: i64,
    pub activated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePromocode {
    pub code: String,
    #[serde(rename = "type", default = "default_type")]
    pub kind: PromocodeType,
    #[serde(default)]
    pub discount: i32,
    #[serde(default)]
    pub bonus_days: i32,
    #[serde(default = "default_max_activations")]
    pub max_activations: i32,
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub valid_from: Option<NaiveDateTime>,
    pub valid_until: Option<NaiveDateTime>,
    pub plan_ids: Option<Vec<i32>>,
}

fn default_type() -> PromocodeType {
    PromocodeType::Discount
}

fn default_max_activations() -> i32 {
    1
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePromocode {
    pub code: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<PromocodeType>,
    pub discount: Option<i32>,
    pub bonus_days: Option<i32>,
    pub max_activations: Option<i32>,
    pub is_active: Option<bool>,
    pub valid_from: Option<NaiveDateTime>,
    pub valid_until: Option<NaiveDateTime>,
    pub plan_ids: Option<Vec<i32>>,
}

impl UpdatePromocode {
    pub fn apply(self, promo: &mut Promocode) {
        if let Some(code) = self.code {
            promo.code = code;
        }
        if let Some(kind) = self.kind {
            promo.kind = kind;
        }
        if let Some(discount) = self.discount {
            promo.discount = discount;
        }
        if let Some(days) = self.bonus_days {
            promo.bonus_days = days;
        }
        if let Some(max) = self.max_activations {
            promo.max_activations = max;
        }
        if let Some(active) = self.is_active {
            promo.is_active = active;
        }
        if let Some(from) = self.valid_from {
            promo.valid_from = Some(from);
        }
        if let Some(until) = self.valid_until {
            promo.valid_until = Some(until);
        }
        if let Some(plans) = self.plan_ids {
            promo.plan_ids = Some(plans);
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PromocodeStatistics {
    pub total: i64,
    pub active: i64,
    pub inactive: i64,
    pub total_activations: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PromocodeDetailedStatistics {
    pub total: i64,
    pub active: i64,
    pub inactive: i64,
    pub total_activations: i64,
    pub expired: i64,
    pub fully_used: i64,
    pub average_discount: i64,
    pub by_type: BTreeMap<String, i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_fills_defaults() {
        let dto: CreatePromocode = serde_json::from_value(serde_json::json!({"code": "SPRING"})).unwrap();
        assert_eq!(dto.kind, PromocodeType::Discount);
        assert_eq!(dto.max_activations, 1);
        assert!(dto.is_active);
        assert_eq!(dto.discount, 0);
    }

    #[test]
    fn update_renames_code_only_when_given() {
        let ts = chrono::DateTime::from_timestamp(0, 0).unwrap().naive_utc();
        let mut promo = Promocode {
            id: 1,
            code: "OLD".into(),
            kind: PromocodeType::Bonus,
            discount: 0,
            bonus_days: 7,
            max_activations: 10,
            current_activations: 2,
            is_active: true,
            valid_from: None,
            valid_until: None,
            plan_ids: None,
            created_at: ts,
            updated_at: ts,
        };
        UpdatePromocode { bonus_days: Some(14), ..Default::default() }.apply(&mut promo);
        assert_eq!(promo.code, "OLD");
        assert_eq!(promo.bonus_days, 14);
        assert_eq!(promo.current_activations, 2);
    }
}
