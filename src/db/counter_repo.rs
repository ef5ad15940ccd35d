// src/db/counter_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use crate::{common::error::AppError, models::documents::Counter};

#[derive(Clone)]
pub struct CounterRepository {
    pool: PgPool,
}

impl CounterRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Garante que a linha do contador existe. Duas transações criando ao mesmo
    /// tempo não colidem por causa do ON CONFLICT.
    pub async fn ensure_counter<'e, E>(
        &self,
        executor: E,
        name: &str,
        year: i32,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            INSERT INTO counters (name, year, last_number)
            VALUES ($1, $2, 0)
            ON CONFLICT (name) DO NOTHING
            "#,
        )
            .bind(name)
            .bind(year)
            .execute(executor)
            .await?;

        Ok(())
    }

    /// Lê e trava o contador até o fim da transação.
    pub async fn lock_counter<'e, E>(
        &self,
        executor: E,
        name: &str,
    ) -> Result<Counter, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let counter = sqlx::query_as::<_, Counter>(
            "SELECT * FROM counters WHERE name = $1 FOR UPDATE",
        )
            .bind(name)
            .fetch_one(executor)
            .await?;

        Ok(counter)
    }

    pub async fn store_counter<'e, E>(
        &self,
        executor: E,
        name: &str,
        year: i32,
        last_number: i64,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            UPDATE counters
            SET year = $2, last_number = $3, updated_at = NOW()
            WHERE name = $1
            "#,
        )
            .bind(name)
            .bind(year)
            .bind(last_number)
            .execute(executor)
            .await?;

        Ok(())
    }

    pub async fn list_counters(&self) -> Result<Vec<Counter>, AppError> {
        let counters = sqlx::query_as::<_, Counter>("SELECT * FROM counters ORDER BY name ASC")
            .fetch_all(&self.pool)
            .await?;
        Ok(counters)
    }
}
