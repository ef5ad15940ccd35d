// src/db/warranty_repo.rs

use sqlx::{types::Json, Executor, PgPool, Postgres};
use uuid::Uuid;
use crate::{
    common::error::{map_unique_violation, AppError},
    models::warranty::{NewWarranty, WarrantyHistoryEntry, WarrantyItem, WarrantyStatus},
};

/// Índice parcial que impede o mesmo serial em duas garantias ativas/em reparo.
pub const HELD_SERIAL_CONSTRAINT: &str = "warranties_serial_held_key";

/// Traduz a violação do índice de seriais para o erro de negócio.
pub fn held_serial_conflict(constraint: &str, serial_number: &str) -> Option<AppError> {
    (constraint == HELD_SERIAL_CONSTRAINT).then(|| AppError::DuplicateSerial(serial_number.to_string()))
}

#[derive(Clone)]
pub struct WarrantyRepository {
    pool: PgPool,
}

impl WarrantyRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list_warranties(&self) -> Result<Vec<WarrantyItem>, AppError> {
        let items = sqlx::query_as::<_, WarrantyItem>("SELECT * FROM warranties ORDER BY created_at DESC")
            .fetch_all(&self.pool)
            .await?;
        Ok(items)
    }

    pub async fn find_by_serial(&self, serial_number: &str) -> Result<Vec<WarrantyItem>, AppError> {
        let items = sqlx::query_as::<_, WarrantyItem>(
            "SELECT * FROM warranties WHERE serial_number = $1 ORDER BY created_at DESC",
        )
            .bind(serial_number)
            .fetch_all(&self.pool)
            .await?;
        Ok(items)
    }

    /// Seriais da lista que já estão presos a uma garantia ativa ou em reparo.
    pub async fn find_held_serials<'e, E>(
        &self,
        executor: E,
        serial_numbers: &[String],
    ) -> Result<Vec<String>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let held: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT DISTINCT serial_number FROM warranties
            WHERE serial_number = ANY($1) AND status IN ('active', 'repairing')
            "#,
        )
            .bind(serial_numbers)
            .fetch_all(executor)
            .await?;
        Ok(held)
    }

    pub async fn lock_warranty<'e, E>(
        &self,
        executor: E,
        warranty_id: Uuid,
    ) -> Result<Option<WarrantyItem>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let item = sqlx::query_as::<_, WarrantyItem>("SELECT * FROM warranties WHERE id = $1 FOR UPDATE")
            .bind(warranty_id)
            .fetch_optional(executor)
            .await?;
        Ok(item)
    }

    /// Garantias ainda não anuladas de um produto dentro de um pedido.
    pub async fn lock_for_order_product<'e, E>(
        &self,
        executor: E,
        order_id: Uuid,
        product_id: Uuid,
    ) -> Result<Vec<WarrantyItem>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let items = sqlx::query_as::<_, WarrantyItem>(
            r#"
            SELECT * FROM warranties
            WHERE order_id = $1 AND product_id = $2 AND status <> 'void'
            ORDER BY id
            FOR UPDATE
            "#,
        )
            .bind(order_id)
            .bind(product_id)
            .fetch_all(executor)
            .await?;
        Ok(items)
    }

    pub async fn insert_warranty<'e, E>(
        &self,
        executor: E,
        input: &NewWarranty,
    ) -> Result<WarrantyItem, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let item = sqlx::query_as::<_, WarrantyItem>(
            r#"
            INSERT INTO warranties (
                serial_number, product_id, product_name, order_id, order_code,
                customer_id, customer_name, customer_phone, purchase_date, expiry_date,
                warranty_months, status, history
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, 'active', $12)
            RETURNING *
            "#,
        )
            .bind(&input.serial_number)
            .bind(input.product_id)
            .bind(&input.product_name)
            .bind(input.order_id)
            .bind(input.order_code.as_deref())
            .bind(input.customer_id)
            .bind(input.customer_name.as_deref())
            .bind(input.customer_phone.as_deref())
            .bind(input.purchase_date)
            .bind(input.expiry_date)
            .bind(input.warranty_months)
            .bind(Json(&input.history))
            .fetch_one(executor)
            .await
            .map_err(|e| map_unique_violation(e, |c| held_serial_conflict(c, &input.serial_number)))?;
        Ok(item)
    }

    pub async fn update_status<'e, E>(
        &self,
        executor: E,
        warranty_id: Uuid,
        serial_number: &str,
        status: WarrantyStatus,
        history: &[WarrantyHistoryEntry],
    ) -> Result<WarrantyItem, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let item = sqlx::query_as::<_, WarrantyItem>(
            r#"
            UPDATE warranties
            SET status = $2, history = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
            .bind(warranty_id)
            .bind(status)
            .bind(Json(history))
            .fetch_one(executor)
            .await
            .map_err(|e| map_unique_violation(e, |c| held_serial_conflict(c, serial_number)))?;
        Ok(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn held_serial_index_maps_to_duplicate_serial() {
        let err = held_serial_conflict(HELD_SERIAL_CONSTRAINT, "SN-42");
        assert!(matches!(err, Some(AppError::DuplicateSerial(ref s)) if s == "SN-42"));
    }

    #[test]
    fn other_constraints_are_left_alone() {
        assert!(held_serial_conflict("warranties_pkey", "SN-42").is_none());
        assert!(held_serial_conflict("", "SN-42").is_none());
    }
}
