// src/services/stock_voucher_service.rs

use std::collections::HashMap;

use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::{db_utils::retry_on_conflict, error::AppError},
    db::InventoryRepository,
    models::{
        auth::ActorContext,
        inventory::{
            NewLedgerEntry, Product, StockVoucherLine, StockVoucherResult, StockVoucherType,
            VoucherMetadata,
        },
    },
    services::{
        counter_service::CounterService,
        stock_ledger::{LedgerContext, StockBook, StockSnapshot},
    },
};

#[derive(Debug)]
pub struct VoucherPlan {
    pub ledger: Vec<NewLedgerEntry>,
    pub stock_updates: Vec<StockSnapshot>,
}

/// Aplica as linhas do documento sobre os produtos lidos. Entrada recalcula o
/// custo médio; as saídas exigem saldo.
pub fn plan_stock_voucher(
    voucher_type: StockVoucherType,
    code: &str,
    lines: &[StockVoucherLine],
    products: &HashMap<Uuid, Product>,
    metadata: &VoucherMetadata,
    note: Option<&str>,
) -> Result<VoucherPlan, AppError> {
    if lines.is_empty() {
        return Err(AppError::BadRequest("o documento não tem linhas".into()));
    }

    // Produto ausente falha antes de qualquer movimentação
    if let Some(missing) = lines.iter().find(|l| !products.contains_key(&l.product_id)) {
        return Err(AppError::ProductNotFound(missing.product_id.to_string()));
    }
    if let Some(line) = lines.iter().find(|l| l.unit_price < Decimal::ZERO) {
        return Err(AppError::BadRequest(format!(
            "preço unitário negativo para o produto {}",
            line.product_id
        )));
    }

    let ctx = LedgerContext {
        code,
        note: note.map(str::to_string),
        reference_id: None,
        voucher: metadata.clone(),
    };

    let mut book = StockBook::new(products.values().map(StockSnapshot::from));
    let movement_type = voucher_type.movement_type();

    let ledger = lines
        .iter()
        .map(|line| book.apply(line.product_id, movement_type, line.quantity, line.unit_price, &ctx))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(VoucherPlan {
        ledger,
        stock_updates: book.into_updates(),
    })
}

#[derive(Clone)]
pub struct StockVoucherService {
    inventory_repo: InventoryRepository,
    counter_service: CounterService,
    pool: PgPool,
    max_attempts: u32,
}

impl StockVoucherService {
    pub fn new(
        inventory_repo: InventoryRepository,
        counter_service: CounterService,
        pool: PgPool,
        max_attempts: u32,
    ) -> Self {
        Self { inventory_repo, counter_service, pool, max_attempts }
    }

    pub async fn save_stock_voucher(
        &self,
        voucher_type: StockVoucherType,
        lines: &[StockVoucherLine],
        metadata: &VoucherMetadata,
        note: Option<&str>,
        actor: &ActorContext,
    ) -> Result<StockVoucherResult, AppError> {
        let result = retry_on_conflict(self.max_attempts, "save_stock_voucher", || async {
            let mut tx = self.pool.begin().await?;

            // 1. Número do documento (contador primeiro, depois produtos)
            let code = self.counter_service
                .allocate(&mut tx, voucher_type.document_type(), Utc::now())
                .await?;

            // 2. Produtos com trava
            let mut ids: Vec<Uuid> = lines.iter().map(|l| l.product_id).collect();
            ids.sort();
            ids.dedup();
            let products: HashMap<Uuid, Product> = self.inventory_repo
                .lock_products(&mut *tx, &ids)
                .await?
                .into_iter()
                .map(|p| (p.id, p))
                .collect();

            // 3. Valida e calcula
            let plan = plan_stock_voucher(voucher_type, &code, lines, &products, metadata, note)?;

            // 4. Grava estoque/custo e o livro-razão
            for snapshot in &plan.stock_updates {
                self.inventory_repo
                    .update_stock_and_cost(&mut *tx, snapshot.product_id, snapshot.stock, snapshot.cost_price)
                    .await?;
            }

            let mut written = Vec::with_capacity(plan.ledger.len());
            for entry in &plan.ledger {
                written.push(self.inventory_repo.record_stock_movement(&mut *tx, entry, &actor.name).await?);
            }

            tx.commit().await?;
            Ok(StockVoucherResult { code, lines: written })
        })
        .await?;

        tracing::info!(
            target: "audit",
            actor = %actor.name,
            voucher = %result.code,
            voucher_type = ?voucher_type,
            lines = result.lines.len(),
            "Documento de estoque gravado"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::inventory::{MovementType, ProductKind};

    fn product(stock: i32, cost: i64) -> Product {
        let now = Utc::now();
        Product {
            id: Uuid::new_v4(),
            sku: "SS-A55".into(),
            name: "Galaxy A55".into(),
            category_id: None,
            sale_price: Decimal::from(9_990_000),
            cost_price: Decimal::from(cost),
            stock,
            min_stock: 1,
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

    fn by_id(products: Vec<Product>) -> HashMap<Uuid, Product> {
        products.into_iter().map(|p| (p.id, p)).collect()
    }

    fn vline(product_id: Uuid, quantity: i32, price: i64) -> StockVoucherLine {
        StockVoucherLine { product_id, quantity, unit_price: Decimal::from(price) }
    }

    #[test]
    fn first_import_into_empty_stock_sets_cost() {
        let p = product(0, 0);
        let products = by_id(vec![p.clone()]);

        let plan = plan_stock_voucher(
            StockVoucherType::Import,
            "PN26-00000001",
            &[vline(p.id, 5, 500)],
            &products,
            &VoucherMetadata { supplier_name: Some("Digiworld".into()), ..Default::default() },
            None,
        ).unwrap();

        assert_eq!(plan.stock_updates[0].stock, 5);
        assert_eq!(plan.stock_updates[0].cost_price, Decimal::from(500));
        let entry = &plan.ledger[0];
        assert_eq!(entry.movement_type, MovementType::Import);
        assert_eq!(entry.quantity, 5);
        assert_eq!(entry.balance(), 5);
        assert_eq!(entry.voucher.supplier_name.as_deref(), Some("Digiworld"));
    }

    #[test]
    fn import_blends_cost_and_lines_share_the_code() {
        let a = product(10, 100);
        let b = product(0, 0);
        let products = by_id(vec![a.clone(), b.clone()]);

        let plan = plan_stock_voucher(
            StockVoucherType::Import,
            "PN26-00000002",
            &[vline(a.id, 10, 200), vline(b.id, 1, 50)],
            &products,
            &VoucherMetadata::default(),
            Some("Nhập hàng"),
        ).unwrap();

        assert_eq!(plan.ledger.len(), 2);
        assert!(plan.ledger.iter().all(|e| e.code == "PN26-00000002"));
        let a_after = plan.stock_updates.iter().find(|s| s.product_id == a.id).unwrap();
        assert_eq!(a_after.cost_price, Decimal::from(150));
        assert_eq!(a_after.stock, 20);
    }

    #[test]
    fn export_needs_stock_and_keeps_cost() {
        let p = product(4, 700);
        let products = by_id(vec![p.clone()]);

        let plan = plan_stock_voucher(StockVoucherType::Scrap, "XH26-00000001", &[vline(p.id, 4, 0)], &products, &VoucherMetadata::default(), None).unwrap();
        assert_eq!(plan.stock_updates[0].stock, 0);
        assert_eq!(plan.stock_updates[0].cost_price, Decimal::from(700));
        assert_eq!(plan.ledger[0].quantity, -4);

        let err = plan_stock_voucher(StockVoucherType::Export, "PX26-00000001", &[vline(p.id, 5, 0)], &products, &VoucherMetadata::default(), None).unwrap_err();
        assert!(matches!(err, AppError::InsufficientStock { available: 4, requested: 5, .. }));
    }

    #[test]
    fn missing_product_is_named() {
        let ghost = Uuid::new_v4();
        let err = plan_stock_voucher(StockVoucherType::Internal, "XNB26-00000001", &[vline(ghost, 1, 0)], &HashMap::new(), &VoucherMetadata::default(), None).unwrap_err();
        assert!(matches!(err, AppError::ProductNotFound(id) if id == ghost.to_string()));
    }

    #[test]
    fn negative_price_is_rejected() {
        let p = product(0, 0);
        let products = by_id(vec![p.clone()]);
        let err = plan_stock_voucher(StockVoucherType::Import, "PN", &[vline(p.id, 1, -1)], &products, &VoucherMetadata::default(), None).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }
}
