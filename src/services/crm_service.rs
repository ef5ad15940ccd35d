// src/services/crm_service.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::CrmRepository,
    models::crm::{Customer, CustomerUpdate, NewCustomer},
};

/// Telefone guardado só com dígitos (e o "+" inicial, se houver).
pub fn normalize_phone(phone: &str) -> String {
    let trimmed = phone.trim();
    let mut out = String::with_capacity(trimmed.len());
    for (i, c) in trimmed.chars().enumerate() {
        if c.is_ascii_digit() || (i == 0 && c == '+') {
            out.push(c);
        }
    }
    out
}

#[derive(Clone)]
pub struct CrmService {
    repo: CrmRepository,
    pool: PgPool,
}

impl CrmService {
    pub fn new(repo: CrmRepository, pool: PgPool) -> Self {
        Self { repo, pool }
    }

    // =========================================================================
    //  LEITURA
    // =========================================================================

    pub async fn list_customers(&self) -> Result<Vec<Customer>, AppError> {
        self.repo.list_customers().await
    }

    pub async fn get_customer(&self, customer_id: Uuid) -> Result<Customer, AppError> {
        self.repo
            .get_customer(customer_id)
            .await?
            .ok_or_else(|| AppError::CustomerNotFound(customer_id.to_string()))
    }

    pub async fn find_by_phone(&self, phone: &str) -> Result<Customer, AppError> {
        let phone = normalize_phone(phone);
        self.repo
            .find_by_phone(&phone)
            .await?
            .ok_or(AppError::CustomerNotFound(phone))
    }

    // =========================================================================
    //  ESCRITA
    // =========================================================================

    pub async fn create_customer(&self, input: &NewCustomer) -> Result<Customer, AppError> {
        let input = NewCustomer { phone: normalize_phone(&input.phone), ..input.clone() };
        if input.phone.is_empty() {
            return Err(AppError::BadRequest("telefone inválido".into()));
        }

        let mut tx = self.pool.begin().await?;

        // Checagem antes de gravar (o índice único continua como última barreira)
        if self.repo.phone_taken(&mut *tx, &input.phone, None).await? {
            return Err(AppError::DuplicatePhone(input.phone));
        }

        let customer = self.repo.create_customer(&mut *tx, &input).await?;
        tx.commit().await?;

        tracing::info!(customer = %customer.id, "Cliente cadastrado");
        Ok(customer)
    }

    /// Pontos e gasto acumulado não são editáveis por aqui.
    pub async fn update_customer(&self, customer_id: Uuid, input: &CustomerUpdate) -> Result<Customer, AppError> {
        let input = CustomerUpdate {
            phone: input.phone.as_deref().map(normalize_phone),
            ..input.clone()
        };

        let mut tx = self.pool.begin().await?;

        if let Some(phone) = input.phone.as_deref() {
            if phone.is_empty() {
                return Err(AppError::BadRequest("telefone inválido".into()));
            }
            if self.repo.phone_taken(&mut *tx, phone, Some(customer_id)).await? {
                return Err(AppError::DuplicatePhone(phone.to_string()));
            }
        }

        let customer = self.repo
            .update_customer(&mut *tx, customer_id, &input)
            .await?
            .ok_or_else(|| AppError::CustomerNotFound(customer_id.to_string()))?;

        tx.commit().await?;
        Ok(customer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phone_is_reduced_to_digits() {
        assert_eq!(normalize_phone(" 090 123-4567 "), "0901234567");
        assert_eq!(normalize_phone("+84 90.123.4567"), "+84901234567");
        assert_eq!(normalize_phone("90+1"), "901");
    }

    #[test]
    fn blank_phone_normalizes_to_empty() {
        assert!(normalize_phone("  - ").is_empty());
    }
}
