pub mod admin_user_repo;
pub mod audit_repo;
pub mod banner_repo;
pub mod bot_admin_repo;
pub mod bot_button_repo;
pub mod broadcast_repo;
pub mod gateway_repo;
pub mod plan_repo;
pub mod promocode_repo;
pub mod settings_repo;
pub mod subscription_repo;
pub mod transaction_repo;
pub mod user_repo;
