pub mod auth_service;
pub mod backup_service;
pub mod broadcast_service;
pub mod dashboard_service;
pub mod gateway_service;
pub mod remnawave_service;
pub mod settings_service;
