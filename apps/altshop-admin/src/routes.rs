use anyhow::{Context, Result};
use axum::{
    Router,
    extract::{Request, State},
    http::{HeaderValue, Method, header},
    middleware::{self, Next},
    response::Response,
    routing::{delete, get, patch, post, put},
};
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, limit::RequestBodyLimitLayer,
    set_header::SetResponseHeaderLayer, trace::TraceLayer,
};

use crate::error::AppError;
use crate::handlers::{
    audit, auth, backup, banners, bot_admins, bot_buttons, broadcast, dashboard, gateways, plans,
    promocodes, remnawave, settings, subscriptions, transactions, users,
};
use crate::state::AppState;

/// Verifies the bearer token and hands the claims to handlers through request extensions.
async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| AppError::Unauthorized("Unauthorized".to_string()))?;

    let claims = state.auth.keys().verify(token)?;
    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}

fn protected_routes() -> Router<AppState> {
    Router::new()
        // Auth
        .route("/auth/profile", get(auth::profile))
        .route("/auth/change-password", post(auth::change_password))
        .route("/auth/verify", post(auth::verify))
        // Users
        .route("/users", get(users::list_users))
        .route("/users/statistics", get(users::get_statistics))
        .route("/users/telegram/{telegram_id}", get(users::get_by_telegram_id))
        .route("/users/{id}", get(users::get_user).patch(users::update_user))
        .route("/users/{id}/block", post(users::block_user))
        .route("/users/{id}/unblock", post(users::unblock_user))
        // Plans
        .route("/plans", get(plans::list_plans))
        .route("/plans/statistics", get(plans::get_statistics))
        .route("/plans/reorder", post(plans::reorder_plans))
        .route("/plans/{id}", get(plans::get_plan).patch(plans::update_plan))
        .route("/plans/{id}/toggle", post(plans::toggle_plan))
        // Subscriptions
        .route("/subscriptions", get(subscriptions::list_subscriptions))
        .route("/subscriptions/statistics", get(subscriptions::get_statistics))
        .route("/subscriptions/user/{telegram_id}", get(subscriptions::get_user_subscriptions))
        .route(
            "/subscriptions/{id}",
            get(subscriptions::get_subscription).patch(subscriptions::update_subscription),
        )
        // Transactions
        .route("/transactions", get(transactions::list_transactions))
        .route("/transactions/statistics", get(transactions::get_statistics))
        .route("/transactions/user/{telegram_id}", get(transactions::get_user_transactions))
        .route("/transactions/{id}", get(transactions::get_transaction))
        // Promocodes
        .route("/promocodes", get(promocodes::list_promocodes).post(promocodes::create_promocode))
        .route("/promocodes/statistics", get(promocodes::get_statistics))
        .route(
            "/promocodes/{id}",
            get(promocodes::get_promocode)
                .patch(promocodes::update_promocode)
                .delete(promocodes::delete_promocode),
        )
        .route("/promocodes/{id}/activations", get(promocodes::get_activations))
        .route("/promocodes/{id}/toggle", post(promocodes::toggle_promocode))
        // Settings
        .route("/settings", get(settings::get_settings).patch(settings::update_settings))
        .route("/settings/access/mode", patch(settings::update_access_mode))
        .route("/settings/access/conditions", patch(settings::update_access_conditions))
        .route("/settings/notifications/user", patch(settings::update_user_notifications))
        .route("/settings/notifications/system", patch(settings::update_system_notifications))
        .route("/settings/referral", patch(settings::update_referral))
        .route("/settings/referral/points-exchange", patch(settings::update_points_exchange))
        .route("/settings/partner", patch(settings::update_partner))
        .route("/settings/multi-subscription", patch(settings::update_multi_subscription))
        // Broadcast
        .route("/broadcast", get(broadcast::list_broadcasts).post(broadcast::create_broadcast))
        .route("/broadcast/stats", get(broadcast::get_stats))
        .route("/broadcast/audience-count", get(broadcast::audience_count))
        .route(
            "/broadcast/{id}",
            get(broadcast::get_broadcast).delete(broadcast::delete_broadcast),
        )
        .route("/broadcast/{id}/cancel", post(broadcast::cancel_broadcast))
        // Payment gateways
        .route("/gateways", get(gateways::list_gateways))
        .route("/gateways/{id}", get(gateways::get_gateway).put(gateways::update_gateway))
        .route("/gateways/{id}/settings", patch(gateways::update_gateway_settings))
        .route("/gateways/{id}/toggle", post(gateways::toggle_gateway))
        .route("/gateways/{id}/move-up", post(gateways::move_up))
        .route("/gateways/{id}/move-down", post(gateways::move_down))
        // Backups
        .route("/backup", get(backup::list_backups))
        .route("/backup/create", post(backup::create_backup))
        .route("/backup/restore", post(backup::restore_backup))
        .route("/backup/download/{filename}", get(backup::download_backup))
        .route("/backup/{filename}", delete(backup::delete_backup))
        // Bot buttons
        .route("/bot-buttons", get(bot_buttons::list_buttons).post(bot_buttons::create_button))
        .route("/bot-buttons/structure", get(bot_buttons::get_structure))
        .route("/bot-buttons/reorder", post(bot_buttons::reorder_buttons))
        .route(
            "/bot-buttons/{id}",
            get(bot_buttons::get_button)
                .put(bot_buttons::update_button)
                .delete(bot_buttons::delete_button),
        )
        .route("/bot-buttons/{id}/toggle", put(bot_buttons::toggle_button))
        // Bot admins
        .route("/bot-admins", get(bot_admins::list_admins).post(bot_admins::create_admin))
        .route("/bot-admins/active", get(bot_admins::list_active))
        .route("/bot-admins/telegram/{telegram_id}", get(bot_admins::get_by_telegram_id))
        .route(
            "/bot-admins/{id}",
            get(bot_admins::get_admin)
                .put(bot_admins::update_admin)
                .delete(bot_admins::delete_admin),
        )
        .route("/bot-admins/{id}/toggle", put(bot_admins::toggle_admin))
        .route("/bot-admins/{id}/role", put(bot_admins::update_role))
        .route("/bot-admins/{id}/permissions", put(bot_admins::update_permissions))
        // Banners
        .route("/banners", get(banners::list_banners).post(banners::create_banner))
        .route("/banners/active", get(banners::list_active))
        .route(
            "/banners/{id}",
            get(banners::get_banner)
                .put(banners::update_banner)
                .delete(banners::delete_banner),
        )
        .route("/banners/{id}/toggle", put(banners::toggle_banner))
        .route("/banners/{id}/file-id", put(banners::update_file_id))
        // Audit
        .route("/audit", get(audit::list_logs))
        .route("/audit/recent", get(audit::recent_activity))
        .route("/audit/entity/{entity_type}/{entity_id}", get(audit::by_entity))
        .route("/audit/admin/{admin_id}", get(audit::by_admin))
        .route("/audit/stats/actions", get(audit::stats_by_action))
        .route("/audit/stats/entities", get(audit::stats_by_entity))
        .route("/audit/cleanup", delete(audit::cleanup))
        // Dashboard
        .route("/dashboard/overview", get(dashboard::overview))
        .route("/dashboard/statistics", get(dashboard::statistics))
        .route("/dashboard/recent", get(dashboard::recent))
        .route("/dashboard/system-metrics", get(dashboard::get_system_metrics))
        // Remnawave
        .route("/remnawave/system", get(remnawave::system))
        .route("/remnawave/users", get(remnawave::users))
        .route("/remnawave/hosts", get(remnawave::hosts))
        .route("/remnawave/nodes", get(remnawave::nodes))
        .route("/remnawave/inbounds", get(remnawave::inbounds))
}

fn cors_layer(frontend_url: &str) -> Result<CorsLayer> {
    let origin = HeaderValue::from_str(frontend_url.trim_end_matches('/'))
        .context("FRONTEND_URL is not a valid header value")?;

    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT]))
}

pub fn app(state: AppState) -> Result<Router> {
    let cors = cors_layer(&state.config.frontend_url)?;

    let api = Router::new()
        .route("/auth/login", post(auth::login))
        .merge(
            protected_routes()
                .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware)),
        );

    let app = Router::new()
        .route("/health", get(|| async { "OK" }))
        .nest("/api", api)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(CompressionLayer::new())
        .layer(RequestBodyLimitLayer::new(10 * 1024 * 1024))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_XSS_PROTECTION,
            HeaderValue::from_static("1; mode=block"),
        ));

    Ok(app)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use altshop_db::models::admin_user::AdminUser;
    use altshop_db::models::bot_admin::AdminRole;
    use axum::body::{Body, to_bytes};
    use axum::http::{self, StatusCode};
    use chrono::NaiveDateTime;
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;
    use uuid::Uuid;

    fn test_app() -> (Router, AppState) {
        let config = AppConfig::for_tests();
        let pool = PgPoolOptions::new()
            .connect_lazy(&config.database.url())
            .unwrap();
        let state = AppState::new(pool, config);
        (app(state.clone()).unwrap(), state)
    }

    fn token(state: &AppState) -> String {
        let admin = AdminUser {
            id: Uuid::new_v4(),
            username: "admin".to_string(),
            password: String::new(),
            telegram_id: None,
            role: AdminRole::SuperAdmin,
            is_active: true,
            last_login: None,
            created_at: NaiveDateTime::default(),
            updated_at: NaiveDateTime::default(),
        };
        state.auth.keys().issue(&admin).unwrap()
    }

    #[tokio::test]
    async fn health_is_public() {
        let (app, _) = test_app();
        let res = app
            .oneshot(http::Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.headers()["x-content-type-options"], "nosniff");
        let body = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"OK");
    }

    #[tokio::test]
    async fn api_requires_a_bearer_token() {
        let (app, _) = test_app();
        let res = app
            .oneshot(http::Request::builder().uri("/api/users").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        let body = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["statusCode"], 401);
    }

    #[tokio::test]
    async fn invalid_tokens_are_rejected() {
        let (app, _) = test_app();
        let res = app
            .oneshot(
                http::Request::builder()
                    .uri("/api/settings")
                    .header(header::AUTHORIZATION, "Bearer not-a-jwt")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn verify_echoes_the_claims() {
        let (app, state) = test_app();
        let res = app
            .oneshot(
                http::Request::builder()
                    .method(Method::POST)
                    .uri("/api/auth/verify")
                    .header(header::AUTHORIZATION, format!("Bearer {}", token(&state)))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::OK);
        let body = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["valid"], true);
        assert_eq!(json["user"]["username"], "admin");
        assert_eq!(json["user"]["role"], "super_admin");
    }

    #[tokio::test]
    async fn remnawave_degrades_without_configuration() {
        let (app, state) = test_app();
        let res = app
            .oneshot(
                http::Request::builder()
                    .uri("/api/remnawave/system")
                    .header(header::AUTHORIZATION, format!("Bearer {}", token(&state)))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::OK);
        let body = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "Not configured");
    }
}
