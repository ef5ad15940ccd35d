// src/services/gift_service.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{GiftRepository, InventoryRepository},
    models::gifts::{Gift, GiftUpdate, NewGift},
};

fn check_gift_numbers(points_cost: Option<i64>, stock: Option<i32>) -> Result<(), AppError> {
    if points_cost.is_some_and(|p| p <= 0) {
        return Err(AppError::BadRequest("o custo em pontos deve ser positivo".into()));
    }
    if stock.is_some_and(|s| s < 0) {
        return Err(AppError::BadRequest("o estoque do brinde não pode ser negativo".into()));
    }
    Ok(())
}

#[derive(Clone)]
pub struct GiftService {
    repo: GiftRepository,
    inventory_repo: InventoryRepository,
    pool: PgPool,
}

impl GiftService {
    pub fn new(repo: GiftRepository, inventory_repo: InventoryRepository, pool: PgPool) -> Self {
        Self { repo, inventory_repo, pool }
    }

    pub async fn list_gifts(&self) -> Result<Vec<Gift>, AppError> {
        self.repo.list_gifts().await
    }

    async fn ensure_product(&self, product_id: Option<Uuid>) -> Result<(), AppError> {
        if let Some(id) = product_id {
            if self.inventory_repo.get_product(id).await?.is_none() {
                return Err(AppError::ProductNotFound(id.to_string()));
            }
        }
        Ok(())
    }

    pub async fn create_gift(&self, input: &NewGift) -> Result<Gift, AppError> {
        check_gift_numbers(Some(input.points_cost), Some(input.stock))?;
        self.ensure_product(input.product_id).await?;
        self.repo.create_gift(&self.pool, input).await
    }

    pub async fn update_gift(&self, gift_id: Uuid, input: &GiftUpdate) -> Result<Gift, AppError> {
        check_gift_numbers(input.points_cost, input.stock)?;
        self.ensure_product(input.product_id).await?;
        self.repo
            .update_gift(&self.pool, gift_id, input)
            .await?
            .ok_or(AppError::GiftNotFound(gift_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gift_numbers_are_checked() {
        assert!(check_gift_numbers(Some(50), Some(0)).is_ok());
        assert!(check_gift_numbers(None, None).is_ok());
        assert!(matches!(check_gift_numbers(Some(0), None), Err(AppError::BadRequest(_))));
        assert!(matches!(check_gift_numbers(None, Some(-1)), Err(AppError::BadRequest(_))));
    }
}
