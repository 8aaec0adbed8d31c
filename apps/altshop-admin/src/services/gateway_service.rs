use altshop_db::models::gateway::{GatewaySettingsPatch, PaymentGateway, UpdateGateway, is_configured};
use altshop_db::repositories::gateway_repo::GatewayRepository;
use anyhow::Result;
use sqlx::types::Json;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

/// Dense `0..n-1` indexes for ids already in display order.
pub fn dense_order(ordered_ids: &[i32]) -> Vec<(i32, i32)> {
    ordered_ids
        .iter()
        .enumerate()
        .map(|(index, id)| (*id, index as i32))
        .collect()
}

/// Swaps `id` with its neighbour and re-derives dense indexes for the whole list.
/// `None` when the id is unknown or already at the edge in that direction.
pub fn plan_move(ordered_ids: &[i32], id: i32, direction: Direction) -> Option<Vec<(i32, i32)>> {
    let pos = ordered_ids.iter().position(|candidate| *candidate == id)?;
    let neighbour = match direction {
        Direction::Up => pos.checked_sub(1)?,
        Direction::Down => Some(pos + 1).filter(|n| *n < ordered_ids.len())?,
    };

    let mut ids = ordered_ids.to_vec();
    ids.swap(pos, neighbour);
    Some(dense_order(&ids))
}

#[derive(Debug, Clone)]
pub struct GatewayService {
    repo: GatewayRepository,
}

impl GatewayService {
    pub fn new(repo: GatewayRepository) -> Self {
        Self { repo }
    }

    pub async fn get_all(&self) -> Result<Vec<PaymentGateway>> {
        self.repo.get_all().await
    }

    pub async fn get_by_id(&self, id: i32) -> Result<Option<PaymentGateway>> {
        self.repo.get_by_id(id).await
    }

    /// Moves a gateway one slot. Returns whether anything changed.
    pub async fn move_gateway(&self, id: i32, direction: Direction) -> Result<bool> {
        let ids: Vec<i32> = self.repo.get_all().await?.iter().map(|g| g.id).collect();
        match plan_move(&ids, id, direction) {
            Some(order) => {
                self.repo.write_order(&order).await?;
                tracing::info!("Gateway {} moved {:?}", id, direction);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub async fn update(&self, id: i32, dto: UpdateGateway) -> Result<Option<PaymentGateway>> {
        let Some(mut gateway) = self.repo.get_by_id(id).await? else {
            return Ok(None);
        };
        let reindex = dto.order_index.is_some();
        dto.apply(&mut gateway);
        if let Some(Json(settings)) = gateway.settings.as_mut() {
            settings.is_configure = Some(is_configured(gateway.kind, Some(&*settings)));
        }
        let saved = self.repo.save(&gateway).await?;

        if reindex {
            // Explicit indexes can collide; collapse back to a dense sequence.
            let ids: Vec<i32> = self.repo.get_all().await?.iter().map(|g| g.id).collect();
            self.repo.write_order(&dense_order(&ids)).await?;
            return self.repo.get_by_id(id).await;
        }
        Ok(Some(saved))
    }

    /// Overlays the supplied credentials and recomputes `is_configure`.
    pub async fn update_settings(&self, id: i32, patch: GatewaySettingsPatch) -> Result<Option<PaymentGateway>> {
        let Some(mut gateway) = self.repo.get_by_id(id).await? else {
            return Ok(None);
        };
        let mut settings = gateway.settings.take().map(|Json(s)| s).unwrap_or_default();
        settings.merge(patch);
        settings.is_configure = Some(is_configured(gateway.kind, Some(&settings)));
        gateway.settings = Some(Json(settings));

        self.repo.save(&gateway).await.map(Some)
    }

    /// Flips `is_active`. Activation is not gated on `is_configure`.
    pub async fn toggle(&self, id: i32) -> Result<Option<PaymentGateway>> {
        let Some(mut gateway) = self.repo.get_by_id(id).await? else {
            return Ok(None);
        };
        gateway.is_active = !gateway.is_active;
        self.repo.save(&gateway).await.map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(ids: &[i32], order: &[(i32, i32)]) -> Vec<i32> {
        let mut sorted = order.to_vec();
        sorted.sort_by_key(|(_, index)| *index);
        assert_eq!(sorted.len(), ids.len());
        sorted.into_iter().map(|(id, _)| id).collect()
    }

    #[test]
    fn move_down_swaps_two_gateways() {
        let order = plan_move(&[10, 20], 10, Direction::Down).unwrap();
        assert!(order.contains(&(10, 1)));
        assert!(order.contains(&(20, 0)));
    }

    #[test]
    fn edges_are_no_ops() {
        let ids = [3, 1, 2];
        assert_eq!(plan_move(&ids, 3, Direction::Up), None);
        assert_eq!(plan_move(&ids, 2, Direction::Down), None);
        assert_eq!(plan_move(&ids, 99, Direction::Up), None);
        assert_eq!(plan_move(&[], 1, Direction::Down), None);
    }

    #[test]
    fn up_then_down_restores_order() {
        let ids = vec![5, 9, 2, 7];
        let after_up = apply(&ids, &plan_move(&ids, 2, Direction::Up).unwrap());
        assert_eq!(after_up, vec![5, 2, 9, 7]);
        let restored = apply(&after_up, &plan_move(&after_up, 2, Direction::Down).unwrap());
        assert_eq!(restored, ids);
    }

    #[test]
    fn every_plan_is_dense() {
        let ids = [4, 8, 15, 16, 23];
        for id in ids {
            for direction in [Direction::Up, Direction::Down] {
                if let Some(order) = plan_move(&ids, id, direction) {
                    let mut indexes: Vec<i32> = order.iter().map(|(_, i)| *i).collect();
                    indexes.sort_unstable();
                    assert_eq!(indexes, vec![0, 1, 2, 3, 4]);
                }
            }
        }
    }

    #[test]
    fn dense_order_renumbers_from_zero() {
        assert_eq!(dense_order(&[7, 3]), vec![(7, 0), (3, 1)]);
    }
}
