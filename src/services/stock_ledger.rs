// src/services/stock_ledger.rs
//
// Rotina única de estoque + custo médio + livro-razão. Usada pela venda, pelo
// cancelamento e pelos documentos de ajuste em lote, para que a fórmula do custo
// seja sempre a mesma em qualquer entrada de estoque.

use std::collections::HashMap;

use rust_decimal::{Decimal, RoundingStrategy};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::inventory::{MovementType, NewLedgerEntry, Product, VoucherMetadata},
};

/// Estado de estoque de um produto lido dentro da transação.
#[derive(Debug, Clone, PartialEq)]
pub struct StockSnapshot {
    pub product_id: Uuid,
    pub sku: String,
    pub name: String,
    pub stock: i32,
    pub cost_price: Decimal,
}

impl From<&Product> for StockSnapshot {
    fn from(p: &Product) -> Self {
        Self {
            product_id: p.id,
            sku: p.sku.clone(),
            name: p.name.clone(),
            stock: p.stock,
            cost_price: p.cost_price,
        }
    }
}

/// Dados do documento que originou a movimentação.
#[derive(Debug, Clone, Default)]
pub struct LedgerContext<'a> {
    pub code: &'a str,
    pub note: Option<String>,
    pub reference_id: Option<Uuid>,
    pub voucher: VoucherMetadata,
}

/// Custo médio ponderado após uma entrada.
///
/// Entrada com preço zero (ou quantidade zero) não mexe no custo. Estoque zerado
/// assume o preço da entrada, em vez de fazer média com zero.
pub fn calculate_new_average_cost(
    current_stock: i32,
    current_cost: Decimal,
    incoming_qty: i32,
    incoming_price: Decimal,
) -> Decimal {
    if incoming_qty <= 0 || incoming_price <= Decimal::ZERO {
        return current_cost;
    }
    if current_stock <= 0 {
        return incoming_price;
    }

    let total_current_value = Decimal::from(current_stock) * current_cost;
    let total_incoming_value = Decimal::from(incoming_qty) * incoming_price;
    let new_total_qty = Decimal::from(i64::from(current_stock) + i64::from(incoming_qty));

    ((total_current_value + total_incoming_value) / new_total_qty)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
}

/// Aplica uma movimentação ao snapshot e devolve a linha do livro-razão.
///
/// `quantity` é sempre positiva; o sinal vem do tipo de movimentação. Saídas
/// validam o saldo antes de tocar no snapshot. Só `import` recalcula o custo.
pub fn apply_movement(
    snapshot: &mut StockSnapshot,
    movement_type: MovementType,
    quantity: i32,
    unit_price: Decimal,
    ctx: &LedgerContext<'_>,
) -> Result<NewLedgerEntry, AppError> {
    if quantity <= 0 {
        return Err(AppError::BadRequest(format!(
            "quantidade deve ser positiva para \"{}\"",
            snapshot.name
        )));
    }

    let old_stock = snapshot.stock;
    let delta = if movement_type.is_increase() {
        quantity
    } else {
        if old_stock < quantity {
            return Err(AppError::InsufficientStock {
                name: snapshot.name.clone(),
                available: old_stock,
                requested: quantity,
            });
        }
        -quantity
    };

    let new_stock = old_stock.checked_add(delta).ok_or_else(|| {
        AppError::BadRequest(format!(
            "quantidade excede o limite de estoque para \"{}\"",
            snapshot.name
        ))
    })?;

    if movement_type == MovementType::Import {
        snapshot.cost_price =
            calculate_new_average_cost(old_stock, snapshot.cost_price, quantity, unit_price);
    }
    snapshot.stock = new_stock;

    Ok(NewLedgerEntry {
        code: ctx.code.to_string(),
        product_id: snapshot.product_id,
        product_name: snapshot.name.clone(),
        sku: snapshot.sku.clone(),
        movement_type,
        quantity: delta,
        old_stock,
        new_stock: snapshot.stock,
        unit_price,
        note: ctx.note.clone(),
        reference_id: ctx.reference_id,
        voucher: ctx.voucher.clone(),
    })
}

/// Conjunto de produtos lidos numa transação. Várias linhas do mesmo produto
/// se acumulam no mesmo snapshot, então o saldo do livro-razão fica contínuo.
#[derive(Debug, Default)]
pub struct StockBook {
    products: HashMap<Uuid, StockSnapshot>,
    touched: Vec<Uuid>,
}

impl StockBook {
    pub fn new(products: impl IntoIterator<Item = StockSnapshot>) -> Self {
        Self {
            products: products.into_iter().map(|s| (s.product_id, s)).collect(),
            touched: Vec::new(),
        }
    }

    pub fn contains(&self, product_id: &Uuid) -> bool {
        self.products.contains_key(product_id)
    }

    pub fn apply(
        &mut self,
        product_id: Uuid,
        movement_type: MovementType,
        quantity: i32,
        unit_price: Decimal,
        ctx: &LedgerContext<'_>,
    ) -> Result<NewLedgerEntry, AppError> {
        let snapshot = self
            .products
            .get_mut(&product_id)
            .ok_or_else(|| AppError::ProductNotFound(product_id.to_string()))?;

        let entry = apply_movement(snapshot, movement_type, quantity, unit_price, ctx)?;

        if !self.touched.contains(&product_id) {
            self.touched.push(product_id);
        }
        Ok(entry)
    }

    /// Snapshots finais dos produtos que mudaram, na ordem em que foram tocados.
    pub fn into_updates(mut self) -> Vec<StockSnapshot> {
        self.touched
            .iter()
            .filter_map(|id| self.products.remove(id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn snapshot(stock: i32, cost: i64) -> StockSnapshot {
        StockSnapshot {
            product_id: Uuid::new_v4(),
            sku: "P-1".into(),
            name: "Tai nghe".into(),
            stock,
            cost_price: Decimal::from(cost),
        }
    }

    fn ctx(code: &str) -> LedgerContext<'_> {
        LedgerContext { code, ..Default::default() }
    }

    #[test]
    fn weighted_average_blends_existing_and_incoming_value() {
        let cost = calculate_new_average_cost(10, Decimal::from(100), 10, Decimal::from(200));
        assert_eq!(cost, Decimal::from(150));
    }

    #[test]
    fn first_import_takes_incoming_price() {
        let mut s = snapshot(0, 0);
        let entry = apply_movement(&mut s, MovementType::Import, 5, Decimal::from(500), &ctx("PN26-00000001")).unwrap();

        assert_eq!(s.stock, 5);
        assert_eq!(s.cost_price, Decimal::from(500));
        assert_eq!(entry.quantity, 5);
        assert_eq!(entry.old_stock, 0);
        assert_eq!(entry.balance(), 5);
    }

    #[test]
    fn import_past_the_stock_limit_is_rejected() {
        let mut s = snapshot(10, 100);
        let err = apply_movement(&mut s, MovementType::Import, i32::MAX, Decimal::from(200), &ctx("PN")).unwrap_err();

        assert!(matches!(err, AppError::BadRequest(_)));
        assert_eq!(s.stock, 10);
        assert_eq!(s.cost_price, Decimal::from(100));
    }

    #[test]
    fn average_cost_handles_huge_quantities() {
        let cost = calculate_new_average_cost(i32::MAX, Decimal::from(100), i32::MAX, Decimal::from(100));
        assert_eq!(cost, Decimal::from(100));
    }

    #[test]
    fn zero_price_import_keeps_cost() {
        let mut s = snapshot(10, 100);
        apply_movement(&mut s, MovementType::Import, 10, Decimal::ZERO, &ctx("PN")).unwrap();
        assert_eq!(s.stock, 20);
        assert_eq!(s.cost_price, Decimal::from(100));
    }

    #[test]
    fn average_is_rounded_half_away_from_zero() {
        // (1 × 100 + 1 × 101) / 2 = 100.5
        let cost = calculate_new_average_cost(1, Decimal::from(100), 1, Decimal::from(101));
        assert_eq!(cost, Decimal::from(101));
    }

    #[test]
    fn outgoing_movements_never_touch_cost() {
        for kind in [MovementType::Export, MovementType::Scrap, MovementType::Internal, MovementType::Sale] {
            let mut s = snapshot(5, 1000);
            let entry = apply_movement(&mut s, kind, 2, Decimal::from(2000), &ctx("X")).unwrap();
            assert_eq!(s.stock, 3);
            assert_eq!(s.cost_price, Decimal::from(1000));
            assert_eq!(entry.quantity, -2);
            assert_eq!(entry.balance(), 3);
        }
    }

    #[test]
    fn returns_add_stock_without_recomputing_cost() {
        let mut s = snapshot(3, 1000);
        let entry = apply_movement(&mut s, MovementType::Return, 2, Decimal::from(2000), &ctx("RET-HD26-00000001")).unwrap();
        assert_eq!(s.stock, 5);
        assert_eq!(s.cost_price, Decimal::from(1000));
        assert_eq!(entry.quantity, 2);
    }

    #[test]
    fn insufficient_stock_leaves_snapshot_untouched() {
        let mut s = snapshot(1, 1000);
        let err = apply_movement(&mut s, MovementType::Export, 2, Decimal::ZERO, &ctx("PX")).unwrap_err();

        assert!(matches!(err, AppError::InsufficientStock { available: 1, requested: 2, .. }));
        assert_eq!(s.stock, 1);
    }

    #[test]
    fn non_positive_quantity_is_rejected() {
        let mut s = snapshot(1, 1000);
        assert!(matches!(
            apply_movement(&mut s, MovementType::Import, 0, Decimal::ONE, &ctx("PN")),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn book_accumulates_lines_on_the_same_product() {
        let s = snapshot(5, 1000);
        let id = s.product_id;
        let mut book = StockBook::new([s]);

        let first = book.apply(id, MovementType::Sale, 2, Decimal::from(2000), &ctx("HD")).unwrap();
        let second = book.apply(id, MovementType::Sale, 3, Decimal::from(2000), &ctx("HD")).unwrap();
        assert_eq!(first.new_stock, second.old_stock);

        let err = book.apply(id, MovementType::Sale, 1, Decimal::from(2000), &ctx("HD")).unwrap_err();
        assert!(matches!(err, AppError::InsufficientStock { available: 0, .. }));

        let updates = book.into_updates();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].stock, 0);
    }

    #[test]
    fn book_reports_missing_products() {
        let mut book = StockBook::default();
        let err = book.apply(Uuid::new_v4(), MovementType::Import, 1, Decimal::ONE, &ctx("PN")).unwrap_err();
        assert!(matches!(err, AppError::ProductNotFound(_)));
    }

    fn movement_strategy() -> impl Strategy<Value = (MovementType, i32, i64)> {
        (
            prop_oneof![
                Just(MovementType::Import),
                Just(MovementType::Export),
                Just(MovementType::Sale),
                Just(MovementType::Return),
                Just(MovementType::Scrap),
            ],
            1..50i32,
            0..10_000i64,
        )
    }

    proptest! {
        #[test]
        fn ledger_replay_reproduces_stock(moves in prop::collection::vec(movement_strategy(), 1..60)) {
            let mut s = snapshot(0, 0);
            let mut entries = Vec::new();
            for (kind, qty, price) in moves {
                if let Ok(entry) = apply_movement(&mut s, kind, qty, Decimal::from(price), &ctx("X")) {
                    entries.push(entry);
                }
                prop_assert!(s.stock >= 0);
            }

            let mut balance = 0;
            for entry in &entries {
                prop_assert_eq!(entry.old_stock, balance);
                balance += entry.quantity;
                prop_assert_eq!(entry.new_stock, balance);
            }
            prop_assert_eq!(balance, s.stock);
        }

        #[test]
        fn average_cost_stays_between_old_and_incoming(
            stock in 1..1_000i32,
            cost in 1..1_000_000i64,
            qty in 1..1_000i32,
            price in 1..1_000_000i64,
        ) {
            let new_cost = calculate_new_average_cost(stock, Decimal::from(cost), qty, Decimal::from(price));
            let lo = Decimal::from(cost.min(price));
            let hi = Decimal::from(cost.max(price));
            prop_assert!(new_cost >= lo && new_cost <= hi);
        }
    }
}
