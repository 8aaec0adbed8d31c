use std::sync::Arc;

use altshop_db::repositories::{
    admin_user_repo::AdminUserRepository, audit_repo::AuditRepository, banner_repo::BannerRepository,
    bot_admin_repo::BotAdminRepository, bot_button_repo::BotButtonRepository,
    broadcast_repo::BroadcastRepository, gateway_repo::GatewayRepository, plan_repo::PlanRepository,
    promocode_repo::PromocodeRepository, settings_repo::SettingsRepository,
    subscription_repo::SubscriptionRepository, transaction_repo::TransactionRepository,
    user_repo::UserRepository,
};
use sqlx::PgPool;
use tokio::sync::Mutex;

use crate::config::AppConfig;
use crate::services::auth_service::{AuthService, JwtKeys};
use crate::services::backup_service::BackupService;
use crate::services::broadcast_service::BroadcastService;
use crate::services::dashboard_service::{CpuSampler, DashboardService, SysinfoCpu};
use crate::services::gateway_service::GatewayService;
use crate::services::remnawave_service::RemnawaveService;
use crate::services::settings_service::SettingsService;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,

    pub users: UserRepository,
    pub plans: PlanRepository,
    pub subscriptions: SubscriptionRepository,
    pub transactions: TransactionRepository,
    pub promocodes: PromocodeRepository,
    pub broadcasts: BroadcastRepository,
    pub bot_buttons: BotButtonRepository,
    pub bot_admins: BotAdminRepository,
    pub banners: BannerRepository,
    pub audit: AuditRepository,

    pub auth: AuthService,
    pub settings: SettingsService,
    pub gateways: GatewayService,
    pub broadcast: BroadcastService,
    pub dashboard: DashboardService,
    pub backups: Arc<BackupService>,
    pub remnawave: Arc<RemnawaveService>,
    /// Holds the previous CPU sample between metrics requests.
    pub cpu_sampler: Arc<Mutex<CpuSampler>>,
}

impl AppState {
    pub fn new(pool: PgPool, config: AppConfig) -> Self {
        let users = UserRepository::new(pool.clone());
        let plans = PlanRepository::new(pool.clone());
        let subscriptions = SubscriptionRepository::new(pool.clone());
        let transactions = TransactionRepository::new(pool.clone());
        let promocodes = PromocodeRepository::new(pool.clone());
        let broadcasts = BroadcastRepository::new(pool.clone());
        let audit = AuditRepository::new(pool.clone());

        let auth = AuthService::new(
            AdminUserRepository::new(pool.clone()),
            audit.clone(),
            JwtKeys::new(&config.jwt_secret, config.jwt_expires_in_hours),
        );
        let dashboard = DashboardService::new(
            users.clone(),
            plans.clone(),
            subscriptions.clone(),
            transactions.clone(),
            promocodes.clone(),
        );

        Self {
            settings: SettingsService::new(SettingsRepository::new(pool.clone())),
            gateways: GatewayService::new(GatewayRepository::new(pool.clone())),
            broadcast: BroadcastService::new(broadcasts.clone()),
            backups: Arc::new(BackupService::new(&config.backup, &config.database)),
            remnawave: Arc::new(RemnawaveService::new(&config.remnawave)),
            cpu_sampler: Arc::new(Mutex::new(CpuSampler::new(Box::new(SysinfoCpu::new())))),
            bot_buttons: BotButtonRepository::new(pool.clone()),
            bot_admins: BotAdminRepository::new(pool.clone()),
            banners: BannerRepository::new(pool.clone()),
            users,
            plans,
            subscriptions,
            transactions,
            promocodes,
            broadcasts,
            audit,
            auth,
            dashboard,
            config: Arc::new(config),
        }
    }
}
