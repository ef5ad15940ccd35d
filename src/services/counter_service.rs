// src/services/counter_service.rs

use chrono::{DateTime, Datelike, Utc};
use sqlx::{PgConnection, PgPool};

use crate::{
    common::{db_utils::retry_on_conflict, error::AppError},
    db::CounterRepository,
    models::documents::{Counter, DocumentType},
};

/// `{PREFIXO}{AA}-{número com 8 dígitos}`, ex: `HD26-00000001`.
pub fn format_document_code(doc_type: DocumentType, year: i32, number: i64) -> String {
    format!("{}{:02}-{:08}", doc_type.prefix(), year.rem_euclid(100), number)
}

/// Próximo número da sequência. Virada de ano recomeça em 1.
pub fn next_sequence(year: i32, last_number: i64, current_year: i32) -> i64 {
    if year != current_year {
        1
    } else {
        last_number + 1
    }
}

#[derive(Clone)]
pub struct CounterService {
    repo: CounterRepository,
    pool: PgPool,
    max_attempts: u32,
}

impl CounterService {
    pub fn new(repo: CounterRepository, pool: PgPool, max_attempts: u32) -> Self {
        Self { repo, pool, max_attempts }
    }

    /// Lê-incrementa-grava dentro da transação de quem chama. A trava da linha
    /// (e o retry em conflito) é o único mecanismo de concorrência.
    pub async fn allocate(
        &self,
        conn: &mut PgConnection,
        doc_type: DocumentType,
        now: DateTime<Utc>,
    ) -> Result<String, AppError> {
        let name = doc_type.counter_name();
        let current_year = now.year();

        // 1. Garante a linha e trava
        self.repo.ensure_counter(&mut *conn, name, current_year).await?;
        let counter = self.repo.lock_counter(&mut *conn, name).await?;

        // 2. Calcula e grava o próximo número
        let number = next_sequence(counter.year, counter.last_number, current_year);
        self.repo.store_counter(&mut *conn, name, current_year, number).await?;

        Ok(format_document_code(doc_type, current_year, number))
    }

    /// Versão avulsa: abre a própria transação (e consome o número).
    pub async fn next_document_number(&self, doc_type: DocumentType) -> Result<String, AppError> {
        retry_on_conflict(self.max_attempts, "next_document_number", || async {
            let mut tx = self.pool.begin().await?;
            let code = self.allocate(&mut tx, doc_type, Utc::now()).await?;
            tx.commit().await?;
            Ok(code)
        })
        .await
    }

    pub async fn list_counters(&self) -> Result<Vec<Counter>, AppError> {
        self.repo.list_counters().await
    }
}
