//! The bot's singleton configuration row and the typed shapes of its JSONB columns.
//!
//! Every JSONB shape carries `#[serde(default)]` so that rows written by older bot
//! versions, which may lack newer keys, still load with the documented defaults.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sqlx::FromRow;

use super::common::{Currency, UnknownVariant};

/// The settings row always carries this primary key.
pub const SETTINGS_ID: i32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccessMode {
    Public,
    Invited,
    PurchaseBlocked,
    RegBlocked,
    Restricted,
}

impl AccessMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessMode::Public => "PUBLIC",
            AccessMode::Invited => "INVITED",
            AccessMode::PurchaseBlocked => "PURCHASE_BLOCKED",
            AccessMode::RegBlocked => "REG_BLOCKED",
            AccessMode::Restricted => "RESTRICTED",
        }
    }
}

impl TryFrom<String> for AccessMode {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "PUBLIC" => Ok(AccessMode::Public),
            "INVITED" => Ok(AccessMode::Invited),
            "PURCHASE_BLOCKED" => Ok(AccessMode::PurchaseBlocked),
            "REG_BLOCKED" => Ok(AccessMode::RegBlocked),
            "RESTRICTED" => Ok(AccessMode::Restricted),
            _ => Err(UnknownVariant { kind: "access mode", value }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum ReferralLevel {
    First = 1,
    Second = 2,
    Third = 3,
}

impl TryFrom<u8> for ReferralLevel {
    type Error = UnknownVariant;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(ReferralLevel::First),
            2 => Ok(ReferralLevel::Second),
            3 => Ok(ReferralLevel::Third),
            other => Err(UnknownVariant { kind: "referral level", value: other.to_string() }),
        }
    }
}

impl From<ReferralLevel> for u8 {
    fn from(level: ReferralLevel) -> Self {
        level as u8
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReferralAccrualStrategy {
    OnFirstPayment,
    OnEachPayment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReferralRewardType {
    Points,
    ExtraDays,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReferralRewardStrategy {
    Amount,
    Percent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserNotifications {
    pub expires_in_3_days: bool,
    pub expires_in_2_days: bool,
    pub expires_in_1_days: bool,
    pub expired: bool,
    pub limited: bool,
    pub expired_1_day_ago: bool,
    pub referral_attached: bool,
    pub referral_reward: bool,
}

impl Default for UserNotifications {
    fn default() -> Self {
        Self {
            expires_in_3_days: true,
            expires_in_2_days: true,
            expires_in_1_days: true,
            expired: true,
            limited: true,
            expired_1_day_ago: true,
            referral_attached: true,
            referral_reward: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemNotifications {
    pub bot_lifetime: bool,
    pub bot_update: bool,
    pub user_registered: bool,
    pub subscription: bool,
    pub promocode_activated: bool,
    pub trial_getted: bool,
    pub node_status: bool,
    pub user_first_connected: bool,
    pub user_hwid: bool,
}

impl Default for SystemNotifications {
    fn default() -> Self {
        Self {
            bot_lifetime: true,
            bot_update: true,
            user_registered: true,
            subscription: true,
            promocode_activated: true,
            trial_getted: true,
            node_status: true,
            user_first_connected: true,
            user_hwid: true,
        }
    }
}

/// One way of spending referral points. The optional fields only apply to some exchange types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExchangeTypeSettings {
    pub enabled: bool,
    pub points_cost: i64,
    pub min_points: i64,
    /// `-1` means no upper bound.
    pub max_points: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gift_plan_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gift_duration_days: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_discount_percent: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_traffic_gb: Option<i64>,
}

impl Default for ExchangeTypeSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            points_cost: 1,
            min_points: 1,
            max_points: -1,
            gift_plan_id: None,
            gift_duration_days: None,
            max_discount_percent: None,
            max_traffic_gb: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PointsExchangeSettings {
    pub exchange_enabled: bool,
    pub subscription_days: ExchangeTypeSettings,
    pub gift_subscription: ExchangeTypeSettings,
    pub discount: ExchangeTypeSettings,
    pub traffic: ExchangeTypeSettings,
    pub points_per_day: i64,
    pub min_exchange_points: i64,
    pub max_exchange_points: i64,
}

impl Default for PointsExchangeSettings {
    fn default() -> Self {
        let base = ExchangeTypeSettings::default();
        Self {
            exchange_enabled: true,
            subscription_days: ExchangeTypeSettings { enabled: true, ..base.clone() },
            gift_subscription: ExchangeTypeSettings {
                points_cost: 30,
                min_points: 30,
                max_points: 30,
                gift_duration_days: Some(30),
                ..base.clone()
            },
            discount: ExchangeTypeSettings {
                points_cost: 10,
                min_points: 10,
                max_points: 500,
                max_discount_percent: Some(50),
                ..base.clone()
            },
            traffic: ExchangeTypeSettings {
                points_cost: 5,
                min_points: 5,
                max_traffic_gb: Some(100),
                ..base
            },
            points_per_day: 1,
            min_exchange_points: 1,
            max_exchange_points: -1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReferralReward {
    #[serde(rename = "type")]
    pub kind: ReferralRewardType,
    pub strategy: ReferralRewardStrategy,
    /// Reward amount keyed by referral level. Sparse: levels without an entry earn nothing.
    pub config: BTreeMap<u8, i64>,
}

impl Default for ReferralReward {
    fn default() -> Self {
        Self {
            kind: ReferralRewardType::ExtraDays,
            strategy: ReferralRewardStrategy::Amount,
            config: BTreeMap::from([(1, 5)]),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReferralSettings {
    pub enable: bool,
    pub level: ReferralLevel,
    pub accrual_strategy: ReferralAccrualStrategy,
    pub reward: ReferralReward,
    pub eligible_plan_ids: Vec<i64>,
    pub points_exchange: PointsExchangeSettings,
}

impl Default for ReferralSettings {
    fn default() -> Self {
        Self {
            enable: true,
            level: ReferralLevel::First,
            accrual_strategy: ReferralAccrualStrategy::OnFirstPayment,
            reward: ReferralReward::default(),
            eligible_plan_ids: Vec::new(),
            points_exchange: PointsExchangeSettings::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartnerSettings {
    pub enabled: bool,
    pub level1_percent: f64,
    pub level2_percent: f64,
    pub level3_percent: f64,
    pub tax_percent: f64,
    pub yookassa_commission: f64,
    pub telegram_stars_commission: f64,
    pub cryptopay_commission: f64,
    pub heleket_commission: f64,
    pub pal24_commission: f64,
    pub wata_commission: f64,
    pub platega_commission: f64,
    /// Minor currency units (kopecks).
    pub min_withdrawal_amount: i64,
    pub auto_calculate_commission: bool,
}

impl Default for PartnerSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            level1_percent: 10.0,
            level2_percent: 3.0,
            level3_percent: 1.0,
            tax_percent: 6.0,
            yookassa_commission: 3.5,
            telegram_stars_commission: 30.0,
            cryptopay_commission: 1.0,
            heleket_commission: 1.0,
            pal24_commission: 5.0,
            wata_commission: 3.0,
            platega_commission: 3.5,
            min_withdrawal_amount: 50_000,
            auto_calculate_commission: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MultiSubscriptionSettings {
    pub enabled: bool,
    pub default_max_subscriptions: i32,
}

impl Default for MultiSubscriptionSettings {
    fn default() -> Self {
        Self { enabled: true, default_max_subscriptions: 5 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub id: i32,
    pub rules_required: bool,
    pub channel_required: bool,
    pub rules_link: String,
    #[serde(with = "channel_id")]
    pub channel_id: Option<i64>,
    pub channel_link: String,
    #[sqlx(try_from = "String")]
    pub access_mode: AccessMode,
    #[sqlx(try_from = "String")]
    pub default_currency: Currency,
    #[sqlx(json)]
    pub user_notifications: UserNotifications,
    #[sqlx(json)]
    pub system_notifications: SystemNotifications,
    #[sqlx(json)]
    pub referral: ReferralSettings,
    #[sqlx(json)]
    pub partner: PartnerSettings,
    #[sqlx(json)]
    pub multi_subscription: MultiSubscriptionSettings,
}

/// Telegram channel ids are bigint columns and travel as strings, but clients also send bare numbers.
pub mod channel_id {
    use super::*;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(i64),
        Text(String),
    }

    pub fn parse<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
        match Option::<Raw>::deserialize(deserializer)? {
            None => Ok(None),
            Some(Raw::Number(n)) => Ok(Some(n)),
            Some(Raw::Text(s)) if s.trim().is_empty() => Ok(None),
            Some(Raw::Text(s)) => s
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| serde::de::Error::custom(format!("invalid channel id: {s}"))),
        }
    }

    pub fn serialize<S: Serializer>(value: &Option<i64>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(id) => serializer.serialize_str(&id.to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
        parse(deserializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_jsonb_falls_back_to_defaults() {
        let referral: ReferralSettings = serde_json::from_value(serde_json::json!({
            "enable": false,
            "level": 2,
            "reward": {"config": {"1": 10, "2": 4}}
        }))
        .unwrap();

        assert!(!referral.enable);
        assert_eq!(referral.level, ReferralLevel::Second);
        assert_eq!(referral.accrual_strategy, ReferralAccrualStrategy::OnFirstPayment);
        assert_eq!(referral.reward.kind, ReferralRewardType::ExtraDays);
        assert_eq!(referral.reward.config.get(&2), Some(&4));
        assert_eq!(referral.points_exchange.discount.max_discount_percent, Some(50));
    }

    #[test]
    fn reward_amounts_serialize_as_integers() {
        let json = serde_json::to_value(ReferralReward::default()).unwrap();
        assert_eq!(json["config"]["1"], serde_json::json!(5));
        assert!(json["config"]["1"].is_i64());
    }

    #[test]
    fn referral_level_rejects_out_of_range() {
        let err = serde_json::from_value::<ReferralLevel>(serde_json::json!(4));
        assert!(err.is_err());
        assert_eq!(serde_json::to_value(ReferralLevel::Third).unwrap(), 3);
    }

    #[test]
    fn exchange_serialization_omits_unset_extras() {
        let json = serde_json::to_value(PointsExchangeSettings::default()).unwrap();
        assert!(json["subscription_days"].get("gift_plan_id").is_none());
        assert_eq!(json["gift_subscription"]["gift_duration_days"], 30);
        assert_eq!(json["traffic"]["max_traffic_gb"], 100);
    }

    #[test]
    fn access_mode_parses_stored_text() {
        assert_eq!(AccessMode::try_from("REG_BLOCKED".to_string()).unwrap(), AccessMode::RegBlocked);
        assert!(AccessMode::try_from("OPEN".to_string()).is_err());
        assert_eq!(AccessMode::PurchaseBlocked.as_str(), "PURCHASE_BLOCKED");
    }

    #[derive(Deserialize)]
    struct Holder {
        #[serde(deserialize_with = "channel_id::parse")]
        id: Option<i64>,
    }

    #[test]
    fn channel_id_accepts_string_or_number() {
        let a: Holder = serde_json::from_str(r#"{"id": "-1001234567890"}"#).unwrap();
        let b: Holder = serde_json::from_str(r#"{"id": -1001234567890}"#).unwrap();
        let c: Holder = serde_json::from_str(r#"{"id": null}"#).unwrap();
        assert_eq!(a.id, Some(-1001234567890));
        assert_eq!(a.id, b.id);
        assert_eq!(c.id, None);
    }
}
