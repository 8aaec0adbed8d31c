//! Partial updates of the settings singleton.
//!
//! Every nested JSONB shape has its own patch type and its own merge. The merges destructure
//! the patch without `..`, so adding a field to a patch type fails to compile until the merge
//! handles it.

use std::collections::BTreeMap;

use altshop_db::models::common::{Currency, nullable};
use altshop_db::models::settings::{
    AccessMode, ExchangeTypeSettings, MultiSubscriptionSettings, PartnerSettings,
    PointsExchangeSettings, ReferralAccrualStrategy, ReferralLevel, ReferralReward,
    ReferralRewardStrategy, ReferralRewardType, ReferralSettings, Settings, SystemNotifications,
    UserNotifications, channel_id,
};
use altshop_db::repositories::settings_repo::SettingsRepository;
use anyhow::Result;
use serde::{Deserialize, Deserializer};

fn set<T>(slot: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *slot = value;
    }
}

/// Distinguishes an absent `channelId` (keep) from an explicit `null` (clear).
fn patch_channel_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Option<i64>>, D::Error> {
    channel_id::parse(deserializer).map(Some)
}

// ============================================================================
// Patch shapes
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserNotificationsPatch {
    pub expires_in_3_days: Option<bool>,
    pub expires_in_2_days: Option<bool>,
    pub expires_in_1_days: Option<bool>,
    pub expired: Option<bool>,
    pub limited: Option<bool>,
    pub expired_1_day_ago: Option<bool>,
    pub referral_attached: Option<bool>,
    pub referral_reward: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SystemNotificationsPatch {
    pub bot_lifetime: Option<bool>,
    pub bot_update: Option<bool>,
    pub user_registered: Option<bool>,
    pub subscription: Option<bool>,
    pub promocode_activated: Option<bool>,
    pub trial_getted: Option<bool>,
    pub node_status: Option<bool>,
    pub user_first_connected: Option<bool>,
    pub user_hwid: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExchangeTypePatch {
    pub enabled: Option<bool>,
    pub points_cost: Option<i64>,
    pub min_points: Option<i64>,
    pub max_points: Option<i64>,
    #[serde(default, deserialize_with = "nullable")]
    pub gift_plan_id: Option<Option<i64>>,
    #[serde(default, deserialize_with = "nullable")]
    pub gift_duration_days: Option<Option<i64>>,
    #[serde(default, deserialize_with = "nullable")]
    pub max_discount_percent: Option<Option<i64>>,
    #[serde(default, deserialize_with = "nullable")]
    pub max_traffic_gb: Option<Option<i64>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PointsExchangePatch {
    pub exchange_enabled: Option<bool>,
    pub subscription_days: Option<ExchangeTypePatch>,
    pub gift_subscription: Option<ExchangeTypePatch>,
    pub discount: Option<ExchangeTypePatch>,
    pub traffic: Option<ExchangeTypePatch>,
    pub points_per_day: Option<i64>,
    pub min_exchange_points: Option<i64>,
    pub max_exchange_points: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReferralRewardPatch {
    #[serde(rename = "type")]
    pub kind: Option<ReferralRewardType>,
    pub strategy: Option<ReferralRewardStrategy>,
    pub config: Option<BTreeMap<u8, i64>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReferralPatch {
    pub enable: Option<bool>,
    pub level: Option<ReferralLevel>,
    pub accrual_strategy: Option<ReferralAccrualStrategy>,
    pub reward: Option<ReferralRewardPatch>,
    pub eligible_plan_ids: Option<Vec<i64>>,
    pub points_exchange: Option<PointsExchangePatch>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PartnerPatch {
    pub enabled: Option<bool>,
    pub level1_percent: Option<f64>,
    pub level2_percent: Option<f64>,
    pub level3_percent: Option<f64>,
    pub tax_percent: Option<f64>,
    pub yookassa_commission: Option<f64>,
    pub telegram_stars_commission: Option<f64>,
    pub cryptopay_commission: Option<f64>,
    pub heleket_commission: Option<f64>,
    pub pal24_commission: Option<f64>,
    pub wata_commission: Option<f64>,
    pub platega_commission: Option<f64>,
    pub min_withdrawal_amount: Option<i64>,
    pub auto_calculate_commission: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MultiSubscriptionPatch {
    pub enabled: Option<bool>,
    pub default_max_subscriptions: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessConditionsPatch {
    pub rules_required: Option<bool>,
    pub channel_required: Option<bool>,
    pub rules_link: Option<String>,
    #[serde(default, deserialize_with = "patch_channel_id")]
    pub channel_id: Option<Option<i64>>,
    pub channel_link: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessModeUpdate {
    pub access_mode: AccessMode,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    pub rules_required: Option<bool>,
    pub channel_required: Option<bool>,
    pub rules_link: Option<String>,
    #[serde(default, deserialize_with = "patch_channel_id")]
    pub channel_id: Option<Option<i64>>,
    pub channel_link: Option<String>,
    pub access_mode: Option<AccessMode>,
    pub default_currency: Option<Currency>,
    pub user_notifications: Option<UserNotificationsPatch>,
    pub system_notifications: Option<SystemNotificationsPatch>,
    pub referral: Option<ReferralPatch>,
    pub partner: Option<PartnerPatch>,
    pub multi_subscription: Option<MultiSubscriptionPatch>,
}

// ============================================================================
// Merges
// ============================================================================

pub fn merge_user_notifications(current: &mut UserNotifications, patch: UserNotificationsPatch) {
    let UserNotificationsPatch {
        expires_in_3_days,
        expires_in_2_days,
        expires_in_1_days,
        expired,
        limited,
        expired_1_day_ago,
        referral_attached,
        referral_reward,
    } = patch;
    set(&mut current.expires_in_3_days, expires_in_3_days);
    set(&mut current.expires_in_2_days, expires_in_2_days);
    set(&mut current.expires_in_1_days, expires_in_1_days);
    set(&mut current.expired, expired);
    set(&mut current.limited, limited);
    set(&mut current.expired_1_day_ago, expired_1_day_ago);
    set(&mut current.referral_attached, referral_attached);
    set(&mut current.referral_reward, referral_reward);
}

pub fn merge_system_notifications(current: &mut SystemNotifications, patch: SystemNotificationsPatch) {
    let SystemNotificationsPatch {
        bot_lifetime,
        bot_update,
        user_registered,
        subscription,
        promocode_activated,
        trial_getted,
        node_status,
        user_first_connected,
        user_hwid,
    } = patch;
    set(&mut current.bot_lifetime, bot_lifetime);
    set(&mut current.bot_update, bot_update);
    set(&mut current.user_registered, user_registered);
    set(&mut current.subscription, subscription);
    set(&mut current.promocode_activated, promocode_activated);
    set(&mut current.trial_getted, trial_getted);
    set(&mut current.node_status, node_status);
    set(&mut current.user_first_connected, user_first_connected);
    set(&mut current.user_hwid, user_hwid);
}

pub fn merge_exchange_type(current: &mut ExchangeTypeSettings, patch: ExchangeTypePatch) {
    let ExchangeTypePatch {
        enabled,
        points_cost,
        min_points,
        max_points,
        gift_plan_id,
        gift_duration_days,
        max_discount_percent,
        max_traffic_gb,
    } = patch;
    set(&mut current.enabled, enabled);
    set(&mut current.points_cost, points_cost);
    set(&mut current.min_points, min_points);
    set(&mut current.max_points, max_points);
    set(&mut current.gift_plan_id, gift_plan_id);
    set(&mut current.gift_duration_days, gift_duration_days);
    set(&mut current.max_discount_percent, max_discount_percent);
    set(&mut current.max_traffic_gb, max_traffic_gb);
}

pub fn merge_points_exchange(current: &mut PointsExchangeSettings, patch: PointsExchangePatch) {
    let PointsExchangePatch {
        exchange_enabled,
        subscription_days,
        gift_subscription,
        discount,
        traffic,
        points_per_day,
        min_exchange_points,
        max_exchange_points,
    } = patch;
    set(&mut current.exchange_enabled, exchange_enabled);
    set(&mut current.points_per_day, points_per_day);
    set(&mut current.min_exchange_points, min_exchange_points);
    set(&mut current.max_exchange_points, max_exchange_points);

    if let Some(p) = subscription_days {
        merge_exchange_type(&mut current.subscription_days, p);
    }
    if let Some(p) = gift_subscription {
        merge_exchange_type(&mut current.gift_subscription, p);
    }
    if let Some(p) = discount {
        merge_exchange_type(&mut current.discount, p);
    }
    if let Some(p) = traffic {
        merge_exchange_type(&mut current.traffic, p);
    }
}

pub fn merge_referral_reward(current: &mut ReferralReward, patch: ReferralRewardPatch) {
    let ReferralRewardPatch { kind, strategy, config } = patch;
    set(&mut current.kind, kind);
    set(&mut current.strategy, strategy);
    // Sparse per-level map: only the supplied levels change.
    if let Some(config) = config {
        current.config.extend(config);
    }
}

pub fn merge_referral(current: &mut ReferralSettings, patch: ReferralPatch) {
    let ReferralPatch {
        enable,
        level,
        accrual_strategy,
        reward,
        eligible_plan_ids,
        points_exchange,
    } = patch;
    set(&mut current.enable, enable);
    set(&mut current.level, level);
    set(&mut current.accrual_strategy, accrual_strategy);
    set(&mut current.eligible_plan_ids, eligible_plan_ids);

    if let Some(reward) = reward {
        merge_referral_reward(&mut current.reward, reward);
    }
    if let Some(exchange) = points_exchange {
        merge_points_exchange(&mut current.points_exchange, exchange);
    }
}

pub fn merge_partner(current: &mut PartnerSettings, patch: PartnerPatch) {
    let PartnerPatch {
        enabled,
        level1_percent,
        level2_percent,
        level3_percent,
        tax_percent,
        yookassa_commission,
        telegram_stars_commission,
        cryptopay_commission,
        heleket_commission,
        pal24_commission,
        wata_commission,
        platega_commission,
        min_withdrawal_amount,
        auto_calculate_commission,
    } = patch;
    set(&mut current.enabled, enabled);
    set(&mut current.level1_percent, level1_percent);
    set(&mut current.level2_percent, level2_percent);
    set(&mut current.level3_percent, level3_percent);
    set(&mut current.tax_percent, tax_percent);
    set(&mut current.yookassa_commission, yookassa_commission);
    set(&mut current.telegram_stars_commission, telegram_stars_commission);
    set(&mut current.cryptopay_commission, cryptopay_commission);
    set(&mut current.heleket_commission, heleket_commission);
    set(&mut current.pal24_commission, pal24_commission);
    set(&mut current.wata_commission, wata_commission);
    set(&mut current.platega_commission, platega_commission);
    set(&mut current.min_withdrawal_amount, min_withdrawal_amount);
    set(&mut current.auto_calculate_commission, auto_calculate_commission);
}

pub fn merge_multi_subscription(current: &mut MultiSubscriptionSettings, patch: MultiSubscriptionPatch) {
    let MultiSubscriptionPatch { enabled, default_max_subscriptions } = patch;
    set(&mut current.enabled, enabled);
    set(&mut current.default_max_subscriptions, default_max_subscriptions);
}

pub fn merge_access_conditions(current: &mut Settings, patch: AccessConditionsPatch) {
    let AccessConditionsPatch {
        rules_required,
        channel_required,
        rules_link,
        channel_id,
        channel_link,
    } = patch;
    set(&mut current.rules_required, rules_required);
    set(&mut current.channel_required, channel_required);
    set(&mut current.rules_link, rules_link);
    set(&mut current.channel_id, channel_id);
    set(&mut current.channel_link, channel_link);
}

/// Applies a full settings patch. Pure: the caller persists the result.
pub fn merge(current: &mut Settings, patch: SettingsPatch) {
    let SettingsPatch {
        rules_required,
        channel_required,
        rules_link,
        channel_id,
        channel_link,
        access_mode,
        default_currency,
        user_notifications,
        system_notifications,
        referral,
        partner,
        multi_subscription,
    } = patch;

    merge_access_conditions(
        current,
        AccessConditionsPatch { rules_required, channel_required, rules_link, channel_id, channel_link },
    );
    set(&mut current.access_mode, access_mode);
    set(&mut current.default_currency, default_currency);

    if let Some(p) = user_notifications {
        merge_user_notifications(&mut current.user_notifications, p);
    }
    if let Some(p) = system_notifications {
        merge_system_notifications(&mut current.system_notifications, p);
    }
    if let Some(p) = referral {
        merge_referral(&mut current.referral, p);
    }
    if let Some(p) = partner {
        merge_partner(&mut current.partner, p);
    }
    if let Some(p) = multi_subscription {
        merge_multi_subscription(&mut current.multi_subscription, p);
    }
}

// ============================================================================
// Service
// ============================================================================

/// Read-merge-write over the settings row. Concurrent writers are last-writer-wins.
#[derive(Debug, Clone)]
pub struct SettingsService {
    repo: SettingsRepository,
}

impl SettingsService {
    pub fn new(repo: SettingsRepository) -> Self {
        Self { repo }
    }

    pub async fn get(&self) -> Result<Option<Settings>> {
        self.repo.get().await
    }

    /// Loads the row, applies `change`, and writes the whole row back. `None` if the row is missing.
    pub async fn modify(&self, change: impl FnOnce(&mut Settings)) -> Result<Option<Settings>> {
        let Some(mut settings) = self.repo.get().await? else {
            return Ok(None);
        };
        change(&mut settings);
        let saved = self.repo.save(&settings).await?;
        tracing::info!("Settings updated");
        Ok(Some(saved))
    }

    pub async fn update(&self, patch: SettingsPatch) -> Result<Option<Settings>> {
        self.modify(|s| merge(s, patch)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use altshop_db::models::settings::SETTINGS_ID;

    fn base() -> Settings {
        Settings {
            id: SETTINGS_ID,
            rules_required: false,
            channel_required: false,
            rules_link: "https://telegram.org/tos/".into(),
            channel_id: Some(-100123),
            channel_link: "@remna_shop".into(),
            access_mode: AccessMode::Public,
            default_currency: Currency::Rub,
            user_notifications: UserNotifications::default(),
            system_notifications: SystemNotifications::default(),
            referral: ReferralSettings::default(),
            partner: PartnerSettings::default(),
            multi_subscription: MultiSubscriptionSettings::default(),
        }
    }

    fn patch(json: serde_json::Value) -> SettingsPatch {
        serde_json::from_value(json).unwrap()
    }

    fn merged(mut s: Settings, p: SettingsPatch) -> Settings {
        merge(&mut s, p);
        s
    }

    #[test]
    fn referral_level_only_keeps_everything_else() {
        let before = base();
        let after = merged(before.clone(), patch(serde_json::json!({"referral": {"level": 2}})));

        assert_eq!(after.referral.level, ReferralLevel::Second);
        assert_eq!(after.referral.accrual_strategy, before.referral.accrual_strategy);
        assert_eq!(after.referral.reward, before.referral.reward);
        assert_eq!(after.referral.points_exchange, before.referral.points_exchange);
        assert_eq!(after.partner, before.partner);
    }

    #[test]
    fn reward_config_merges_per_level() {
        let first = merged(base(), patch(serde_json::json!({"referral": {"reward": {"config": {"2": 3}}}})));
        assert_eq!(first.referral.reward.config.get(&1), Some(&5));
        assert_eq!(first.referral.reward.config.get(&2), Some(&3));

        let second = merged(first, patch(serde_json::json!({"referral": {"reward": {"config": {"1": 8}}}})));
        assert_eq!(second.referral.reward.config.get(&1), Some(&8));
        assert_eq!(second.referral.reward.config.get(&2), Some(&3));
        assert_eq!(second.referral.reward.kind, ReferralRewardType::ExtraDays);
    }

    #[test]
    fn each_exchange_subconfig_merges_independently() {
        let before = base();
        for key in ["subscription_days", "gift_subscription", "discount", "traffic"] {
            let after = merged(
                before.clone(),
                patch(serde_json::json!({"referral": {"points_exchange": {key: {"points_cost": 77}}}})),
            );
            let pe = &after.referral.points_exchange;
            let old = &before.referral.points_exchange;
            let (changed, untouched): (&ExchangeTypeSettings, Vec<&ExchangeTypeSettings>) = match key {
                "subscription_days" => (&pe.subscription_days, vec![&pe.gift_subscription, &pe.discount, &pe.traffic]),
                "gift_subscription" => (&pe.gift_subscription, vec![&pe.subscription_days, &pe.discount, &pe.traffic]),
                "discount" => (&pe.discount, vec![&pe.subscription_days, &pe.gift_subscription, &pe.traffic]),
                _ => (&pe.traffic, vec![&pe.subscription_days, &pe.gift_subscription, &pe.discount]),
            };
            assert_eq!(changed.points_cost, 77, "{key}");
            let old_changed = match key {
                "subscription_days" => &old.subscription_days,
                "gift_subscription" => &old.gift_subscription,
                "discount" => &old.discount,
                _ => &old.traffic,
            };
            assert_eq!(changed.min_points, old_changed.min_points, "{key}");
            assert_eq!(changed.enabled, old_changed.enabled, "{key}");
            for other in untouched {
                assert_ne!(other.points_cost, 77, "{key}");
            }
            assert_eq!(pe.points_per_day, old.points_per_day);
        }
    }

    #[test]
    fn explicit_null_clears_an_exchange_limit() {
        let before = base();
        assert_eq!(before.referral.points_exchange.discount.max_discount_percent, Some(50));

        let kept = merged(
            before.clone(),
            patch(serde_json::json!({"referral": {"points_exchange": {"discount": {"enabled": true}}}})),
        );
        assert_eq!(kept.referral.points_exchange.discount.max_discount_percent, Some(50));

        let cleared = merged(
            before,
            patch(serde_json::json!({"referral": {"points_exchange": {"discount": {"max_discount_percent": null}}}})),
        );
        assert_eq!(cleared.referral.points_exchange.discount.max_discount_percent, None);
    }

    #[test]
    fn disjoint_patches_compose() {
        let p1 = serde_json::json!({
            "userNotifications": {"expired": false},
            "referral": {"reward": {"config": {"2": 4}}, "points_exchange": {"discount": {"enabled": true}}}
        });
        let p2 = serde_json::json!({
            "systemNotifications": {"node_status": false},
            "referral": {"reward": {"config": {"3": 1}}, "points_exchange": {"traffic": {"max_traffic_gb": 10}}},
            "partner": {"tax_percent": 4.0}
        });
        let union = serde_json::json!({
            "userNotifications": {"expired": false},
            "systemNotifications": {"node_status": false},
            "referral": {
                "reward": {"config": {"2": 4, "3": 1}},
                "points_exchange": {"discount": {"enabled": true}, "traffic": {"max_traffic_gb": 10}}
            },
            "partner": {"tax_percent": 4.0}
        });

        let sequential = merged(merged(base(), patch(p1)), patch(p2));
        let at_once = merged(base(), patch(union));
        assert_eq!(sequential, at_once);
        assert!(!sequential.user_notifications.expired);
        assert!(sequential.user_notifications.limited);
    }

    #[test]
    fn merge_is_idempotent() {
        let p = serde_json::json!({
            "accessMode": "INVITED",
            "referral": {"enable": false, "reward": {"config": {"2": 2}}},
            "multiSubscription": {"default_max_subscriptions": 9}
        });
        let once = merged(base(), patch(p.clone()));
        let twice = merged(once.clone(), patch(p));
        assert_eq!(once, twice);
        assert_eq!(once.access_mode, AccessMode::Invited);
    }

    #[test]
    fn top_level_scalars_only_change_when_present() {
        let after = merged(base(), patch(serde_json::json!({"rulesRequired": true, "defaultCurrency": "USD"})));
        assert!(after.rules_required);
        assert_eq!(after.default_currency, Currency::Usd);
        assert_eq!(after.channel_id, Some(-100123));
        assert_eq!(after.channel_link, "@remna_shop");
    }

    #[test]
    fn channel_id_null_clears_and_string_sets() {
        let cleared = merged(base(), patch(serde_json::json!({"channelId": null})));
        assert_eq!(cleared.channel_id, None);

        let set = merged(base(), patch(serde_json::json!({"channelId": "-1009"})));
        assert_eq!(set.channel_id, Some(-1009));
    }

    #[test]
    fn access_conditions_patch() {
        let mut s = base();
        let p: AccessConditionsPatch =
            serde_json::from_value(serde_json::json!({"channelRequired": true, "channelId": 42})).unwrap();
        merge_access_conditions(&mut s, p);
        assert!(s.channel_required);
        assert_eq!(s.channel_id, Some(42));
        assert_eq!(s.rules_link, "https://telegram.org/tos/");
    }
}
