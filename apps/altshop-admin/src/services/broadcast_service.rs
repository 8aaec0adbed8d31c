use altshop_db::models::broadcast::{Broadcast, BroadcastAudience, CreateBroadcast};
use altshop_db::repositories::broadcast_repo::{BroadcastRepository, audience_query};

use crate::error::AppError;

/// Sizes and records broadcasts. Delivery belongs to the bot process, which picks up
/// `PROCESSING` rows.
#[derive(Debug, Clone)]
pub struct BroadcastService {
    repo: BroadcastRepository,
}

fn missing_plan() -> AppError {
    AppError::Validation("planId is required for the PLAN audience".to_string())
}

impl BroadcastService {
    pub fn new(repo: BroadcastRepository) -> Self {
        Self { repo }
    }

    pub async fn audience_count(&self, audience: BroadcastAudience, plan_id: Option<i32>) -> Result<i64, AppError> {
        let query = audience_query(audience, plan_id).ok_or_else(missing_plan)?;
        Ok(self.repo.count_audience(&query).await?)
    }

    /// Snapshots the audience size into `total_count` and stores the payload.
    pub async fn create(&self, dto: CreateBroadcast) -> Result<Broadcast, AppError> {
        if dto.message.trim().is_empty() {
            return Err(AppError::Validation("message must not be empty".to_string()));
        }
        let query = audience_query(dto.audience, dto.plan_id).ok_or_else(missing_plan)?;
        let total = self.repo.count_audience(&query).await?;

        let broadcast = self.repo.create(dto.audience, total, &dto.payload()).await?;
        tracing::info!(
            "Broadcast {} created for {:?} audience ({} recipients)",
            broadcast.id,
            dto.audience,
            total
        );
        Ok(broadcast)
    }
}
