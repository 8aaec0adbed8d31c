use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "banners_type_enum", rename_all = "lowercase")]
pub enum BannerType {
    Welcome,
    Menu,
    Subscription,
    Dashboard,
    Promo,
    Custom,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Banner {
    pub id: i32,
    pub name: String,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub kind: BannerType,
    pub file_path: Option<String>,
    pub file_id: Option<String>,
    pub locale: String,
    pub is_active: bool,
    pub priority: i32,
    pub start_date: Option<NaiveDateTime>,
    pub end_date: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Banner {
    /// Open-ended on either side when the bound is unset.
    pub fn is_live_at(&self, now: NaiveDateTime) -> bool {
        let started = self.start_date.is_none_or(|start| start <= now);
        let not_ended = self.end_date.is_none_or(|end| end >= now);
        started && not_ended
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBanner {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: Option<BannerType>,
    pub file_path: Option<String>,
    pub file_id: Option<String>,
    pub locale: Option<String>,
    pub is_active: Option<bool>,
    pub priority: Option<i32>,
    pub start_date: Option<NaiveDateTime>,
    pub end_date: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBanner {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<BannerType>,
    pub file_path: Option<String>,
    pub file_id: Option<String>,
    pub locale: Option<String>,
    pub is_active: Option<bool>,
    pub priority: Option<i32>,
    pub start_date: Option<NaiveDateTime>,
    pub end_date: Option<NaiveDateTime>,
}

impl UpdateBanner {
    pub fn apply(self, banner: &mut Banner) {
        if let Some(v) = self.name {
            banner.name = v;
        }
        if let Some(v) = self.kind {
            banner.kind = v;
        }
        if let Some(v) = self.file_path {
            banner.file_path = Some(v);
        }
        if let Some(v) = self.file_id {
            banner.file_id = Some(v);
        }
        if let Some(v) = self.locale {
            banner.locale = v;
        }
        if let Some(v) = self.is_active {
            banner.is_active = v;
        }
        if let Some(v) = self.priority {
            banner.priority = v;
        }
        if let Some(v) = self.start_date {
            banner.start_date = Some(v);
        }
        if let Some(v) = self.end_date {
            banner.end_date = Some(v);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn banner(start: Option<NaiveDateTime>, end: Option<NaiveDateTime>) -> Banner {
        let ts = chrono::DateTime::from_timestamp(1_700_000_000, 0).unwrap().naive_utc();
        Banner {
            id: 1,
            name: "welcome".into(),
            kind: BannerType::Welcome,
            file_path: None,
            file_id: None,
            locale: "ru".into(),
            is_active: true,
            priority: 0,
            start_date: start,
            end_date: end,
            created_at: ts,
            updated_at: ts,
        }
    }

    #[test]
    fn date_window_is_inclusive_and_open_ended() {
        let now = chrono::DateTime::from_timestamp(1_700_100_000, 0).unwrap().naive_utc();
        assert!(banner(None, None).is_live_at(now));
        assert!(banner(Some(now), Some(now)).is_live_at(now));
        assert!(!banner(Some(now + Duration::hours(1)), None).is_live_at(now));
        assert!(!banner(None, Some(now - Duration::seconds(1))).is_live_at(now));
    }
}
