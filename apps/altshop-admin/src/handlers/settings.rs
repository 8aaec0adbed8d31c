use altshop_db::models::settings::Settings;
use axum::{Json, extract::State};

use crate::error::{ApiResult, AppError};
use crate::services::settings_service::{
    self, AccessConditionsPatch, AccessModeUpdate, MultiSubscriptionPatch, PartnerPatch,
    PointsExchangePatch, ReferralPatch, SettingsPatch, SystemNotificationsPatch,
    UserNotificationsPatch,
};
use crate::state::AppState;

fn settings_not_found() -> AppError {
    AppError::NotFound("Settings not found".to_string())
}

async fn apply(state: &AppState, change: impl FnOnce(&mut Settings)) -> ApiResult<Json<Settings>> {
    state
        .settings
        .modify(change)
        .await?
        .map(Json)
        .ok_or_else(settings_not_found)
}

pub async fn get_settings(State(state): State<AppState>) -> ApiResult<Json<Settings>> {
    state.settings.get().await?.map(Json).ok_or_else(settings_not_found)
}

pub async fn update_settings(
    State(state): State<AppState>,
    Json(patch): Json<SettingsPatch>,
) -> ApiResult<Json<Settings>> {
    state
        .settings
        .update(patch)
        .await?
        .map(Json)
        .ok_or_else(settings_not_found)
}

pub async fn update_access_mode(
    State(state): State<AppState>,
    Json(body): Json<AccessModeUpdate>,
) -> ApiResult<Json<Settings>> {
    tracing::info!("Access mode set to {}", body.access_mode.as_str());
    apply(&state, |s| s.access_mode = body.access_mode).await
}

pub async fn update_access_conditions(
    State(state): State<AppState>,
    Json(patch): Json<AccessConditionsPatch>,
) -> ApiResult<Json<Settings>> {
    apply(&state, |s| settings_service::merge_access_conditions(s, patch)).await
}

pub async fn update_user_notifications(
    State(state): State<AppState>,
    Json(patch): Json<UserNotificationsPatch>,
) -> ApiResult<Json<Settings>> {
    apply(&state, |s| settings_service::merge_user_notifications(&mut s.user_notifications, patch)).await
}

pub async fn update_system_notifications(
    State(state): State<AppState>,
    Json(patch): Json<SystemNotificationsPatch>,
) -> ApiResult<Json<Settings>> {
    apply(&state, |s| settings_service::merge_system_notifications(&mut s.system_notifications, patch)).await
}

pub async fn update_referral(
    State(state): State<AppState>,
    Json(patch): Json<ReferralPatch>,
) -> ApiResult<Json<Settings>> {
    apply(&state, |s| settings_service::merge_referral(&mut s.referral, patch)).await
}

pub async fn update_points_exchange(
    State(state): State<AppState>,
    Json(patch): Json<PointsExchangePatch>,
) -> ApiResult<Json<Settings>> {
    apply(&state, |s| settings_service::merge_points_exchange(&mut s.referral.points_exchange, patch)).await
}

pub async fn update_partner(
    State(state): State<AppState>,
    Json(patch): Json<PartnerPatch>,
) -> ApiResult<Json<Settings>> {
    apply(&state, |s| settings_service::merge_partner(&mut s.partner, patch)).await
}

pub async fn update_multi_subscription(
    State(state): State<AppState>,
    Json(patch): Json<MultiSubscriptionPatch>,
) -> ApiResult<Json<Settings>> {
    apply(&state, |s| settings_service::merge_multi_subscription(&mut s.multi_subscription, patch)).await
}
