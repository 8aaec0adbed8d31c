use std::collections::BTreeMap;

use altshop_db::models::audit::{AuditAction, AuditEntity, AuditFilter, AuditLog, AuditPage};
use axum::{
    Json,
    extract::{Path, Query, State},
};
use chrono::{Duration, NaiveDateTime, Utc};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::error::{ApiResult, AppError};
use crate::state::AppState;
use crate::utils::parse_date_param;

const DEFAULT_CLEANUP_DAYS: i64 = 90;

fn date_param(name: &str, raw: Option<&str>) -> Result<Option<NaiveDateTime>, AppError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(value) => parse_date_param(value)
            .map(Some)
            .ok_or_else(|| AppError::Validation(format!("Invalid {}: {}", name, value))),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditQuery {
    pub action: Option<AuditAction>,
    pub entity_type: Option<AuditEntity>,
    pub entity_id: Option<String>,
    pub admin_id: Option<i64>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl AuditQuery {
    fn into_filter(self) -> Result<AuditFilter, AppError> {
        Ok(AuditFilter {
            start_date: date_param("startDate", self.start_date.as_deref())?,
            end_date: date_param("endDate", self.end_date.as_deref())?,
            action: self.action,
            entity_type: self.entity_type,
            entity_id: self.entity_id,
            admin_id: self.admin_id,
            limit: self.limit.filter(|l| *l > 0).unwrap_or(50),
            offset: self.offset.filter(|o| *o >= 0).unwrap_or(0),
        })
    }
}

pub async fn list_logs(
    State(state): State<AppState>,
    Query(query): Query<AuditQuery>,
) -> ApiResult<Json<AuditPage>> {
    let filter = query.into_filter()?;
    let (data, total) = state.audit.list(&filter).await?;
    Ok(Json(AuditPage { data, total }))
}

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<i64>,
}

pub async fn recent_activity(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> ApiResult<Json<Vec<AuditLog>>> {
    let limit = query.limit.filter(|l| *l > 0).unwrap_or(20);
    Ok(Json(state.audit.recent(limit).await?))
}

pub async fn by_entity(
    State(state): State<AppState>,
    Path((entity_type, entity_id)): Path<(AuditEntity, String)>,
) -> ApiResult<Json<Vec<AuditLog>>> {
    Ok(Json(state.audit.by_entity(entity_type, &entity_id).await?))
}

pub async fn by_admin(
    State(state): State<AppState>,
    Path(admin_id): Path<i64>,
    Query(query): Query<LimitQuery>,
) -> ApiResult<Json<Vec<AuditLog>>> {
    let limit = query.limit.filter(|l| *l > 0).unwrap_or(100);
    Ok(Json(state.audit.by_admin(admin_id, limit).await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl RangeQuery {
    fn bounds(&self) -> Result<(Option<NaiveDateTime>, Option<NaiveDateTime>), AppError> {
        Ok((
            date_param("startDate", self.start_date.as_deref())?,
            date_param("endDate", self.end_date.as_deref())?,
        ))
    }
}

pub async fn stats_by_action(
    State(state): State<AppState>,
    Query(query): Query<RangeQuery>,
) -> ApiResult<Json<BTreeMap<String, i64>>> {
    let (start, end) = query.bounds()?;
    Ok(Json(state.audit.count_by_action(start, end).await?))
}

pub async fn stats_by_entity(
    State(state): State<AppState>,
    Query(query): Query<RangeQuery>,
) -> ApiResult<Json<BTreeMap<String, i64>>> {
    let (start, end) = query.bounds()?;
    Ok(Json(state.audit.count_by_entity(start, end).await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupQuery {
    pub older_than_days: Option<i64>,
}

pub async fn cleanup(
    State(state): State<AppState>,
    Query(query): Query<CleanupQuery>,
) -> ApiResult<Json<Value>> {
    let days = query.older_than_days.unwrap_or(DEFAULT_CLEANUP_DAYS);
    if days < 1 {
        return Err(AppError::Validation("olderThanDays must be at least 1".to_string()));
    }
    let cutoff = Utc::now().naive_utc() - Duration::days(days);

    let deleted = state.audit.delete_older_than(cutoff).await?;
    tracing::info!("Removed {} audit log entries older than {} days", deleted, days);
    Ok(Json(json!({ "deleted": deleted })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query() -> AuditQuery {
        AuditQuery {
            action: None,
            entity_type: None,
            entity_id: None,
            admin_id: None,
            start_date: None,
            end_date: None,
            limit: None,
            offset: None,
        }
    }

    #[test]
    fn list_defaults_to_fifty_from_zero() {
        let filter = query().into_filter().unwrap();
        assert_eq!((filter.limit, filter.offset), (50, 0));
        assert!(filter.start_date.is_none());
    }

    #[test]
    fn bad_dates_are_validation_errors() {
        let q = AuditQuery { start_date: Some("yesterday".into()), ..query() };
        assert!(matches!(q.into_filter(), Err(AppError::Validation(_))));

        let q = AuditQuery { end_date: Some("2024-05-01".into()), ..query() };
        assert!(q.into_filter().unwrap().end_date.is_some());
    }
}
