// src/services/warranty_service.rs

use chrono::{DateTime, Months, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::{db_utils::retry_on_conflict, error::AppError},
    db::{InventoryRepository, WarrantyRepository},
    models::{
        auth::ActorContext,
        warranty::{NewWarranty, WarrantyHistoryEntry, WarrantyItem, WarrantyStatus},
    },
};

/// Data da compra + N meses (fim de mês é ajustado pelo chrono).
pub fn expiry_date(purchase_date: DateTime<Utc>, warranty_months: i32) -> DateTime<Utc> {
    let months = Months::new(warranty_months.max(0) as u32);
    purchase_date.checked_add_months(months).unwrap_or(purchase_date)
}

pub fn history_entry(
    status: WarrantyStatus,
    note: impl Into<String>,
    actor: &str,
    at: DateTime<Utc>,
) -> WarrantyHistoryEntry {
    WarrantyHistoryEntry {
        at,
        status,
        note: note.into(),
        actor: actor.to_string(),
    }
}

/// Normaliza e checa a lista de seriais contra os já ocupados e contra repetição na própria lista.
pub fn check_serials<'a, I>(serials: I, held: &std::collections::HashSet<String>) -> Result<Vec<String>, AppError>
where
    I: IntoIterator<Item = &'a String>,
{
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for raw in serials {
        let serial = raw.trim();
        if serial.is_empty() {
            continue;
        }
        if held.contains(serial) || !seen.insert(serial.to_string()) {
            return Err(AppError::DuplicateSerial(serial.to_string()));
        }
        out.push(serial.to_string());
    }
    Ok(out)
}

#[derive(Debug, Clone)]
pub struct ManualWarranty {
    pub serial_number: String,
    pub product_id: Uuid,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub purchase_date: Option<DateTime<Utc>>,
    pub warranty_months: Option<i32>,
    pub note: Option<String>,
}

#[derive(Clone)]
pub struct WarrantyService {
    repo: WarrantyRepository,
    inventory_repo: InventoryRepository,
    pool: PgPool,
    max_attempts: u32,
}

impl WarrantyService {
    pub fn new(
        repo: WarrantyRepository,
        inventory_repo: InventoryRepository,
        pool: PgPool,
        max_attempts: u32,
    ) -> Self {
        Self { repo, inventory_repo, pool, max_attempts }
    }

    pub async fn list_warranties(&self) -> Result<Vec<WarrantyItem>, AppError> {
        self.repo.list_warranties().await
    }

    pub async fn find_by_serial(&self, serial_number: &str) -> Result<Vec<WarrantyItem>, AppError> {
        let items = self.repo.find_by_serial(serial_number.trim()).await?;
        if items.is_empty() {
            return Err(AppError::WarrantyNotFound(serial_number.to_string()));
        }
        Ok(items)
    }

    /// Cadastro manual (ex: aparelho vendido antes do sistema). O serial não pode
    /// estar em outra garantia ativa ou em reparo.
    pub async fn register(
        &self,
        input: &ManualWarranty,
        actor: &ActorContext,
    ) -> Result<WarrantyItem, AppError> {
        retry_on_conflict(self.max_attempts, "register_warranty", || async {
            let mut tx = self.pool.begin().await?;
            let now = Utc::now();

            // 1. Produto precisa existir
            let product = self.inventory_repo
                .lock_products(&mut *tx, &[input.product_id])
                .await?
                .into_iter()
                .next()
                .ok_or_else(|| AppError::ProductNotFound(input.product_id.to_string()))?;

            // 2. Checa duplicidade antes de qualquer escrita
            let serial = input.serial_number.trim().to_string();
            let held: std::collections::HashSet<String> = self.repo
                .find_held_serials(&mut *tx, std::slice::from_ref(&serial))
                .await?
                .into_iter()
                .collect();
            let serial = check_serials([&serial], &held)?
                .pop()
                .ok_or_else(|| AppError::BadRequest("número de série vazio".into()))?;

            // 3. Grava
            let purchase_date = input.purchase_date.unwrap_or(now);
            let months = input.warranty_months.unwrap_or(product.warranty_months);
            let note = input.note.clone().unwrap_or_else(|| "Cadastro manual".to_string());

            let item = self.repo.insert_warranty(&mut *tx, &NewWarranty {
                serial_number: serial,
                product_id: product.id,
                product_name: product.name.clone(),
                order_id: None,
                order_code: None,
                customer_id: None,
                customer_name: input.customer_name.clone(),
                customer_phone: input.customer_phone.clone(),
                purchase_date,
                expiry_date: expiry_date(purchase_date, months),
                warranty_months: months,
                history: vec![history_entry(WarrantyStatus::Active, note, &actor.name, now)],
            }).await?;

            tx.commit().await?;
            Ok(item)
        })
        .await
    }

    /// Transição de status com entrada no histórico. `void` é terminal.
    pub async fn change_status(
        &self,
        warranty_id: Uuid,
        status: WarrantyStatus,
        note: Option<&str>,
        actor: &ActorContext,
    ) -> Result<WarrantyItem, AppError> {
        retry_on_conflict(self.max_attempts, "change_warranty_status", || async {
            let mut tx = self.pool.begin().await?;

            let item = self.repo
                .lock_warranty(&mut *tx, warranty_id)
                .await?
                .ok_or_else(|| AppError::WarrantyNotFound(warranty_id.to_string()))?;

            if !item.status.can_transition_to(status) {
                return Err(AppError::InvalidWarrantyTransition {
                    from: format!("{:?}", item.status),
                    to: format!("{:?}", status),
                });
            }

            // Voltar para "active" exige serial livre
            if status.holds_serial() && !item.status.holds_serial() {
                let held = self.repo
                    .find_held_serials(&mut *tx, std::slice::from_ref(&item.serial_number))
                    .await?;
                if !held.is_empty() {
                    return Err(AppError::DuplicateSerial(item.serial_number.clone()));
                }
            }

            let mut history = item.history.0.clone();
            history.push(history_entry(status, note.unwrap_or_default(), &actor.name, Utc::now()));

            let updated = self.repo.update_status(&mut *tx, warranty_id, &item.serial_number, status, &history).await?;
            tx.commit().await?;

            tracing::info!(target: "audit", actor = %actor.name, warranty = %warranty_id, status = ?status, "Status de garantia alterado");
            Ok(updated)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::HashSet;

    #[test]
    fn expiry_adds_calendar_months() {
        let bought = Utc.with_ymd_and_hms(2026, 1, 31, 10, 0, 0).unwrap();
        let expiry = expiry_date(bought, 1);
        assert_eq!(expiry, Utc.with_ymd_and_hms(2026, 2, 28, 10, 0, 0).unwrap());
        assert_eq!(expiry_date(bought, 12), Utc.with_ymd_and_hms(2027, 1, 31, 10, 0, 0).unwrap());
    }

    #[test]
    fn held_serial_is_rejected() {
        let held: HashSet<String> = ["SN-1".to_string()].into_iter().collect();
        let serials = vec!["SN-2".to_string(), " SN-1 ".to_string()];
        let err = check_serials(&serials, &held).unwrap_err();
        assert!(matches!(err, AppError::DuplicateSerial(s) if s == "SN-1"));
    }

    #[test]
    fn repeated_serial_in_same_batch_is_rejected() {
        let serials = vec!["A".to_string(), "A".to_string()];
        assert!(matches!(check_serials(&serials, &HashSet::new()), Err(AppError::DuplicateSerial(_))));
    }

    #[test]
    fn blank_serials_are_skipped() {
        let serials = vec!["  ".to_string(), "B".to_string()];
        assert_eq!(check_serials(&serials, &HashSet::new()).unwrap(), vec!["B".to_string()]);
    }

    #[test]
    fn void_is_terminal() {
        assert!(!WarrantyStatus::Void.can_transition_to(WarrantyStatus::Active));
        assert!(WarrantyStatus::Active.can_transition_to(WarrantyStatus::Repairing));
        assert!(WarrantyStatus::Repairing.can_transition_to(WarrantyStatus::Active));
        assert!(!WarrantyStatus::Active.can_transition_to(WarrantyStatus::Active));
        assert!(!WarrantyStatus::Expired.can_transition_to(WarrantyStatus::Active));
    }
}
