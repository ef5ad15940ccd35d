// src/services/inventory_service.rs

use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::InventoryRepository,
    models::{
        auth::ActorContext,
        inventory::{
            Category, InventoryTransaction, LowStockEntry, MovementType, NewLedgerEntry,
            NewProduct, Product, ProductUpdate, Supplier, SupplierUpdate,
        },
    },
    services::stock_ledger::{apply_movement, LedgerContext, StockSnapshot},
};

pub fn initial_code(sku: &str) -> String {
    format!("INIT-{sku}")
}

/// Linha `initial` do livro-razão para um produto recém-criado com estoque.
pub fn initial_ledger_entry(product: &Product) -> Result<Option<NewLedgerEntry>, AppError> {
    if product.stock <= 0 {
        return Ok(None);
    }

    let code = initial_code(&product.sku);
    let mut snapshot = StockSnapshot { stock: 0, ..StockSnapshot::from(product) };
    let entry = apply_movement(
        &mut snapshot,
        MovementType::Initial,
        product.stock,
        product.cost_price,
        &LedgerContext {
            code: &code,
            note: Some("Estoque inicial".to_string()),
            reference_id: None,
            ..Default::default()
        },
    )?;
    Ok(Some(entry))
}

#[derive(Clone)]
pub struct InventoryService {
    inventory_repo: InventoryRepository,
    pool: PgPool,
}

impl InventoryService {
    pub fn new(inventory_repo: InventoryRepository, pool: PgPool) -> Self {
        Self { inventory_repo, pool }
    }

    // --- PRODUTOS ---

    pub async fn create_product(
        &self,
        input: &NewProduct,
        initial_stock: i32,
        initial_cost: Decimal,
        actor: &ActorContext,
    ) -> Result<Product, AppError> {
        if initial_stock < 0 || initial_cost < Decimal::ZERO {
            return Err(AppError::BadRequest("estoque e custo iniciais não podem ser negativos".into()));
        }

        let mut tx = self.pool.begin().await?;

        let product = self.inventory_repo
            .create_product(&mut *tx, input, initial_stock, initial_cost)
            .await?;

        if let Some(entry) = initial_ledger_entry(&product)? {
            self.inventory_repo.record_stock_movement(&mut *tx, &entry, &actor.name).await?;
        }

        tx.commit().await?;

        tracing::info!(target: "audit", actor = %actor.name, sku = %product.sku, stock = product.stock, "Produto criado");
        Ok(product)
    }

    pub async fn get_all_products(&self) -> Result<Vec<Product>, AppError> {
        self.inventory_repo.get_all_products().await
    }

    pub async fn get_product(&self, product_id: Uuid) -> Result<Product, AppError> {
        self.inventory_repo
            .get_product(product_id)
            .await?
            .ok_or_else(|| AppError::ProductNotFound(product_id.to_string()))
    }

    /// Estoque e custo não passam por aqui.
    pub async fn update_product(&self, product_id: Uuid, input: &ProductUpdate) -> Result<Product, AppError> {
        self.inventory_repo
            .update_product(&self.pool, product_id, input)
            .await?
            .ok_or_else(|| AppError::ProductNotFound(product_id.to_string()))
    }

    pub async fn delete_product(&self, product_id: Uuid, actor: &ActorContext) -> Result<(), AppError> {
        if !self.inventory_repo.delete_product(&self.pool, product_id).await? {
            return Err(AppError::ProductNotFound(product_id.to_string()));
        }
        tracing::info!(target: "audit", actor = %actor.name, product = %product_id, "Produto apagado");
        Ok(())
    }

    pub async fn get_low_stock(&self) -> Result<Vec<LowStockEntry>, AppError> {
        self.inventory_repo.get_low_stock().await
    }

    // --- CATEGORIAS ---

    pub async fn create_category(&self, name: &str, description: Option<&str>) -> Result<Category, AppError> {
        self.inventory_repo.create_category(&self.pool, name.trim(), description).await
    }

    pub async fn get_all_categories(&self) -> Result<Vec<Category>, AppError> {
        self.inventory_repo.get_all_categories().await
    }

    // --- FORNECEDORES ---

    pub async fn create_supplier(
        &self,
        name: &str,
        phone: Option<&str>,
        email: Option<&str>,
        address: Option<&str>,
        note: Option<&str>,
    ) -> Result<Supplier, AppError> {
        let name = name.trim();
        let mut tx = self.pool.begin().await?;

        if self.inventory_repo.supplier_name_taken(&mut *tx, name, None).await? {
            return Err(AppError::DuplicateSupplierName(name.to_string()));
        }

        let supplier = self.inventory_repo
            .create_supplier(&mut *tx, name, phone, email, address, note)
            .await?;

        tx.commit().await?;
        Ok(supplier)
    }

    pub async fn update_supplier(&self, supplier_id: Uuid, input: &SupplierUpdate) -> Result<Supplier, AppError> {
        let mut tx = self.pool.begin().await?;

        if let Some(name) = input.name.as_deref().map(str::trim) {
            if self.inventory_repo.supplier_name_taken(&mut *tx, name, Some(supplier_id)).await? {
                return Err(AppError::DuplicateSupplierName(name.to_string()));
            }
        }

        let supplier = self.inventory_repo
            .update_supplier(&mut *tx, supplier_id, input)
            .await?
            .ok_or(AppError::SupplierNotFound(supplier_id))?;

        tx.commit().await?;
        Ok(supplier)
    }

    pub async fn get_all_suppliers(&self) -> Result<Vec<Supplier>, AppError> {
        self.inventory_repo.get_all_suppliers().await
    }

    // --- LIVRO-RAZÃO ---

    pub async fn get_transactions(&self) -> Result<Vec<InventoryTransaction>, AppError> {
        self.inventory_repo.get_transactions().await
    }

    /// Linhas de um documento pelo código, sem diferenciar maiúsculas.
    pub async fn get_voucher(&self, code: &str) -> Result<Vec<InventoryTransaction>, AppError> {
        let lines = self.inventory_repo.get_voucher_lines(code.trim()).await?;
        if lines.is_empty() {
            return Err(AppError::VoucherNotFound(code.to_string()));
        }
        Ok(lines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::inventory::ProductKind;
    use chrono::Utc;

    fn product(stock: i32, cost: i64) -> Product {
        let now = Utc::now();
        Product {
            id: Uuid::new_v4(),
            sku: "AP-PRO2".into(),
            name: "AirPods Pro 2".into(),
            category_id: None,
            sale_price: Decimal::from(5_990_000),
            cost_price: Decimal::from(cost),
            stock,
            min_stock: 2,
            unit: "cái".into(),
            kind: ProductKind::Product,
            warranty_months: 12,
            is_serialized: true,
            vat_rate: Decimal::from(10),
            active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn initial_stock_gets_one_ledger_line() {
        let p = product(8, 4_500_000);
        let entry = initial_ledger_entry(&p).unwrap().unwrap();

        assert_eq!(entry.code, "INIT-AP-PRO2");
        assert_eq!(entry.movement_type, MovementType::Initial);
        assert_eq!(entry.old_stock, 0);
        assert_eq!(entry.quantity, 8);
        assert_eq!(entry.balance(), 8);
        assert_eq!(entry.unit_price, Decimal::from(4_500_000));
    }

    #[test]
    fn no_initial_stock_means_no_ledger_line() {
        assert!(initial_ledger_entry(&product(0, 0)).unwrap().is_none());
    }
}
