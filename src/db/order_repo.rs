// src/db/order_repo.rs

use chrono::{DateTime, Utc};
use sqlx::{types::Json, Executor, PgPool, Postgres};
use uuid::Uuid;
use crate::{
    common::error::AppError,
    models::orders::{Order, OrderLine, OrderStatus, OrderTotals, PaymentMethod},
};

/// Pedido pronto para gravar (já validado pelo motor de pedidos).
#[derive(Debug, Clone)]
pub struct NewOrderRecord<'a> {
    pub id: Uuid,
    pub code: &'a str,
    pub customer_id: Option<Uuid>,
    pub customer_name: Option<&'a str>,
    pub customer_phone: Option<&'a str>,
    pub items: &'a [OrderLine],
    pub totals: OrderTotals,
    pub points_redeemed: i64,
    pub points_earned: i64,
    pub payment_method: PaymentMethod,
    pub staff_name: &'a str,
    pub note: Option<&'a str>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct OrderRepository {
    pool: PgPool,
}

impl OrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    //  LEITURA
    // =========================================================================

    pub async fn list_orders(&self) -> Result<Vec<Order>, AppError> {
        let orders = sqlx::query_as::<_, Order>("SELECT * FROM orders ORDER BY created_at DESC")
            .fetch_all(&self.pool)
            .await?;
        Ok(orders)
    }

    pub async fn get_order(&self, order_id: Uuid) -> Result<Option<Order>, AppError> {
        let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1")
            .bind(order_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(order)
    }

    /// Pedidos do cliente, mais recente primeiro.
    pub async fn get_orders_by_customer(&self, customer_id: Uuid) -> Result<Vec<Order>, AppError> {
        let orders = sqlx::query_as::<_, Order>(
            "SELECT * FROM orders WHERE customer_id = $1 ORDER BY created_at DESC",
        )
            .bind(customer_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(orders)
    }

    // =========================================================================
    //  ESCRITA
    // =========================================================================

    pub async fn lock_order<'e, E>(
        &self,
        executor: E,
        order_id: Uuid,
    ) -> Result<Option<Order>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1 FOR UPDATE")
            .bind(order_id)
            .fetch_optional(executor)
            .await?;
        Ok(order)
    }

    pub async fn insert_order<'e, E>(
        &self,
        executor: E,
        record: &NewOrderRecord<'_>,
    ) -> Result<Order, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        // O status é sempre 'completed' na criação
        let order = sqlx::query_as::<_, Order>(
            r#"
            INSERT INTO orders (
                id, code, customer_id, customer_name, customer_phone, items,
                subtotal, discount, vat, total, points_redeemed, points_earned,
                payment_method, status, staff_name, note, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, 'completed', $14, $15, $16, $16)
            RETURNING *
            "#,
        )
            .bind(record.id)
            .bind(record.code)
            .bind(record.customer_id)
            .bind(record.customer_name)
            .bind(record.customer_phone)
            .bind(Json(record.items))
            .bind(record.totals.subtotal)
            .bind(record.totals.discount)
            .bind(record.totals.vat)
            .bind(record.totals.total)
            .bind(record.points_redeemed)
            .bind(record.points_earned)
            .bind(record.payment_method)
            .bind(record.staff_name)
            .bind(record.note)
            .bind(record.created_at)
            .fetch_one(executor)
            .await?;

        Ok(order)
    }

    pub async fn set_status<'e, E>(
        &self,
        executor: E,
        order_id: Uuid,
        status: OrderStatus,
        cancelled_by: Option<&str>,
    ) -> Result<Order, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let order = sqlx::query_as::<_, Order>(
            r#"
            UPDATE orders SET
                status       = $2,
                cancelled_at = CASE WHEN $2 = 'cancelled'::order_status THEN NOW() ELSE cancelled_at END,
                cancelled_by = COALESCE($3, cancelled_by),
                updated_at   = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
            .bind(order_id)
            .bind(status)
            .bind(cancelled_by)
            .fetch_one(executor)
            .await?;

        Ok(order)
    }

    /// Exclusão física administrativa. Não desfaz nenhum efeito do pedido.
    pub async fn delete_order<'e, E>(
        &self,
        executor: E,
        order_id: Uuid,
    ) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(order_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
