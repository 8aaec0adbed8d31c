pub mod admin_user;
pub mod audit;
pub mod banner;
pub mod bot_admin;
pub mod bot_button;
pub mod broadcast;
pub mod common;
pub mod gateway;
pub mod plan;
pub mod promocode;
pub mod settings;
pub mod subscription;
pub mod transaction;
pub mod user;
