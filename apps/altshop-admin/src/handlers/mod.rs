pub mod audit;
pub mod auth;
pub mod backup;
pub mod banners;
pub mod bot_admins;
pub mod bot_buttons;
pub mod broadcast;
pub mod dashboard;
pub mod gateways;
pub mod plans;
pub mod promocodes;
pub mod remnawave;
pub mod settings;
pub mod subscriptions;
pub mod transactions;
pub mod users;

use altshop_db::models::common::PageRequest;
use serde::Deserialize;

/// `?page&limit` on list endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl PageQuery {
    pub fn request(&self) -> PageRequest {
        PageRequest::new(self.page, self.limit)
    }
}
