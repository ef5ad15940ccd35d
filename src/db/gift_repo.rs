// src/db/gift_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;
use crate::{
    common::error::AppError,
    models::gifts::{Gift, GiftUpdate, NewGift},
};

#[derive(Clone)]
pub struct GiftRepository {
    pool: PgPool,
}

impl GiftRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list_gifts(&self) -> Result<Vec<Gift>, AppError> {
        let gifts = sqlx::query_as::<_, Gift>("SELECT * FROM gifts ORDER BY points_cost ASC, name ASC")
            .fetch_all(&self.pool)
            .await?;
        Ok(gifts)
    }

    pub async fn lock_gifts<'e, E>(
        &self,
        executor: E,
        gift_ids: &[Uuid],
    ) -> Result<Vec<Gift>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let gifts = sqlx::query_as::<_, Gift>("SELECT * FROM gifts WHERE id = ANY($1) ORDER BY id FOR UPDATE")
            .bind(gift_ids)
            .fetch_all(executor)
            .await?;
        Ok(gifts)
    }

    pub async fn create_gift<'e, E>(
        &self,
        executor: E,
        input: &NewGift,
    ) -> Result<Gift, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let gift = sqlx::query_as::<_, Gift>(
            r#"
            INSERT INTO gifts (name, points_cost, stock, product_id)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
            .bind(&input.name)
            .bind(input.points_cost)
            .bind(input.stock)
            .bind(input.product_id)
            .fetch_one(executor)
            .await?;
        Ok(gift)
    }

    pub async fn update_gift<'e, E>(
        &self,
        executor: E,
        gift_id: Uuid,
        input: &GiftUpdate,
    ) -> Result<Option<Gift>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let gift = sqlx::query_as::<_, Gift>(
            r#"
            UPDATE gifts SET
                name        = COALESCE($2, name),
                points_cost = COALESCE($3, points_cost),
                stock       = COALESCE($4, stock),
                product_id  = COALESCE($5, product_id),
                active      = COALESCE($6, active),
                updated_at  = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
            .bind(gift_id)
            .bind(input.name.as_deref())
            .bind(input.points_cost)
            .bind(input.stock)
            .bind(input.product_id)
            .bind(input.active)
            .fetch_optional(executor)
            .await?;
        Ok(gift)
    }

    pub async fn set_gift_stock<'e, E>(
        &self,
        executor: E,
        gift_id: Uuid,
        stock: i32,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("UPDATE gifts SET stock = $2, updated_at = NOW() WHERE id = $1")
            .bind(gift_id)
            .bind(stock)
            .execute(executor)
            .await?;
        Ok(())
    }
}
