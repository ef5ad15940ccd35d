// src/db/crm_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;
use crate::{
    common::error::{map_unique_violation, AppError},
    models::crm::{Customer, CustomerUpdate, LoyaltyUpdate, NewCustomer},
};

#[derive(Clone)]
pub struct CrmRepository {
    pool: PgPool,
}

impl CrmRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    //  LEITURA
    // =========================================================================

    pub async fn list_customers(&self) -> Result<Vec<Customer>, AppError> {
        let customers = sqlx::query_as::<_, Customer>("SELECT * FROM customers ORDER BY name ASC")
            .fetch_all(&self.pool)
            .await?;
        Ok(customers)
    }

    pub async fn get_customer(&self, customer_id: Uuid) -> Result<Option<Customer>, AppError> {
        let customer = sqlx::query_as::<_, Customer>("SELECT * FROM customers WHERE id = $1")
            .bind(customer_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(customer)
    }

    pub async fn find_by_phone(&self, phone: &str) -> Result<Option<Customer>, AppError> {
        let customer = sqlx::query_as::<_, Customer>("SELECT * FROM customers WHERE phone = $1")
            .bind(phone)
            .fetch_optional(&self.pool)
            .await?;
        Ok(customer)
    }

    // =========================================================================
    //  ESCRITA (dentro de transação)
    // =========================================================================

    /// Lê e trava o cliente para atualizar pontos e gasto.
    pub async fn lock_customer<'e, E>(
        &self,
        executor: E,
        customer_id: Uuid,
    ) -> Result<Option<Customer>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let customer = sqlx::query_as::<_, Customer>("SELECT * FROM customers WHERE id = $1 FOR UPDATE")
            .bind(customer_id)
            .fetch_optional(executor)
            .await?;
        Ok(customer)
    }

    pub async fn phone_taken<'e, E>(
        &self,
        executor: E,
        phone: &str,
        except_id: Option<Uuid>,
    ) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let taken: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM customers WHERE phone = $1 AND ($2::uuid IS NULL OR id <> $2))",
        )
            .bind(phone)
            .bind(except_id)
            .fetch_one(executor)
            .await?;
        Ok(taken)
    }

    pub async fn create_customer<'e, E>(
        &self,
        executor: E,
        input: &NewCustomer,
    ) -> Result<Customer, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Customer>(
            r#"
            INSERT INTO customers (name, phone, email, address)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
            .bind(&input.name)
            .bind(&input.phone)
            .bind(input.email.as_deref())
            .bind(input.address.as_deref())
            .fetch_one(executor)
            .await
            .map_err(|e| map_unique_violation(e, |_| Some(AppError::DuplicatePhone(input.phone.clone()))))
    }

    pub async fn update_customer<'e, E>(
        &self,
        executor: E,
        customer_id: Uuid,
        input: &CustomerUpdate,
    ) -> Result<Option<Customer>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Customer>(
            r#"
            UPDATE customers SET
                name       = COALESCE($2, name),
                phone      = COALESCE($3, phone),
                email      = COALESCE($4, email),
                address    = COALESCE($5, address),
                active     = COALESCE($6, active),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
            .bind(customer_id)
            .bind(input.name.as_deref())
            .bind(input.phone.as_deref())
            .bind(input.email.as_deref())
            .bind(input.address.as_deref())
            .bind(input.active)
            .fetch_optional(executor)
            .await
            .map_err(|e| {
                let phone = input.phone.clone().unwrap_or_default();
                map_unique_violation(e, |_| Some(AppError::DuplicatePhone(phone)))
            })
    }

    /// Grava pontos/gasto calculados pelo motor de pedidos.
    pub async fn apply_loyalty<'e, E>(
        &self,
        executor: E,
        update: &LoyaltyUpdate,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            UPDATE customers SET
                points           = $2,
                total_spent      = $3,
                last_purchase_at = COALESCE($4, last_purchase_at),
                updated_at       = NOW()
            WHERE id = $1
            "#,
        )
            .bind(update.customer_id)
            .bind(update.points)
            .bind(update.total_spent)
            .bind(update.last_purchase_at)
            .execute(executor)
            .await?;
        Ok(())
    }
}
