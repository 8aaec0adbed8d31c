use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "users_role_enum", rename_all = "lowercase")]
pub enum UserRole {
    User,
    Admin,
    Moderator,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "users_language_enum", rename_all = "lowercase")]
pub enum Locale {
    Ru,
    En,
}

/// A bot customer as stored by the bot process.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i32,
    pub telegram_id: i64,
    pub username: Option<String>,
    pub referral_code: String,
    pub name: String,
    pub role: UserRole,
    pub language: Locale,
    pub personal_discount: i32,
    pub purchase_discount: i32,
    pub points: i32,
    pub is_blocked: bool,
    pub is_bot_blocked: bool,
    pub is_rules_accepted: bool,
    /// `None` falls back to the global multi-subscription limit, `-1` is unlimited.
    pub max_subscriptions: Option<i32>,
    pub current_subscription_id: Option<i32>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUser {
    pub name: Option<String>,
    pub role: Option<UserRole>,
    pub language: Option<Locale>,
    pub personal_discount: Option<i32>,
    pub purchase_discount: Option<i32>,
    pub points: Option<i32>,
    pub is_blocked: Option<bool>,
    pub max_subscriptions: Option<i32>,
}

impl UpdateUser {
    pub fn apply(self, user: &mut User) {
        if let Some(name) = self.name {
            user.name = name;
        }
        if let Some(role) = self.role {
            user.role = role;
        }
        if let Some(language) = self.language {
            user.language = language;
        }
        if let Some(discount) = self.personal_discount {
            user.personal_discount = discount;
        }
        if let Some(discount) = self.purchase_discount {
            user.purchase_discount = discount;
        }
        if let Some(points) = self.points {
            user.points = points;
        }
        if let Some(blocked) = self.is_blocked {
            user.is_blocked = blocked;
        }
        if let Some(max) = self.max_subscriptions {
            user.max_subscriptions = Some(max);
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStatistics {
    pub total: i64,
    pub blocked: i64,
    pub bot_blocked: i64,
    pub active: i64,
    pub registered_today: i64,
    pub registered_this_week: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDetailedStatistics {
    pub total: i64,
    pub new_daily: i64,
    pub new_weekly: i64,
    pub new_monthly: i64,
    pub with_subscription: i64,
    pub without_subscription: i64,
    pub with_trial: i64,
    pub blocked: i64,
    pub bot_blocked: i64,
    pub conversion_rate: f64,
    pub trial_conversion_rate: f64,
}

/// Integer percentage of `part` in `whole`, 0 when `whole` is empty.
pub fn percent_of(part: i64, whole: i64) -> f64 {
    if whole <= 0 {
        return 0.0;
    }
    ((part as f64 / whole as f64) * 100.0).round()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        let ts = chrono::DateTime::from_timestamp(1_700_000_000, 0).unwrap().naive_utc();
        User {
            id: 7,
            telegram_id: 100500,
            username: Some("neo".into()),
            referral_code: "REF7".into(),
            name: "Neo".into(),
            role: UserRole::User,
            language: Locale::Ru,
            personal_discount: 0,
            purchase_discount: 0,
            points: 10,
            is_blocked: false,
            is_bot_blocked: false,
            is_rules_accepted: true,
            max_subscriptions: None,
            current_subscription_id: None,
            created_at: ts,
            updated_at: ts,
        }
    }

    #[test]
    fn update_only_touches_present_fields() {
        let mut user = sample_user();
        let patch: UpdateUser =
            serde_json::from_str(r#"{"personalDiscount": 15, "isBlocked": true}"#).unwrap();
        patch.apply(&mut user);

        assert_eq!(user.personal_discount, 15);
        assert!(user.is_blocked);
        assert_eq!(user.points, 10);
        assert_eq!(user.name, "Neo");
        assert_eq!(user.language, Locale::Ru);
    }

    #[test]
    fn percent_of_handles_empty_base() {
        assert_eq!(percent_of(3, 0), 0.0);
        assert_eq!(percent_of(1, 3), 33.0);
    }
}
