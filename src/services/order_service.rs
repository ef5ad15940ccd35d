// src/services/order_service.rs
//
// Motor de pedidos. A parte de decisão (planejar venda / cancelamento) é pura e
// testada sem banco; o serviço só lê com trava, chama o plano e grava.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use rust_decimal::{prelude::ToPrimitive, Decimal, RoundingStrategy};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::{
    common::{db_utils::retry_on_conflict, error::AppError},
    db::{
        order_repo::NewOrderRecord, CrmRepository, GiftRepository, InventoryRepository,
        OrderRepository, WarrantyRepository,
    },
    models::{
        auth::ActorContext,
        crm::{Customer, LoyaltyUpdate},
        documents::DocumentType,
        gifts::Gift,
        inventory::{MovementType, NewLedgerEntry, Product},
        orders::{Order, OrderDraft, OrderLine, OrderStatus, OrderTotals},
        warranty::{NewWarranty, WarrantyStatus},
    },
    services::{
        counter_service::CounterService,
        stock_ledger::{LedgerContext, StockBook, StockSnapshot},
        warranty_service::{check_serials, expiry_date, history_entry},
    },
};

/// 1 ponto a cada 100.000 de total pago.
pub const POINTS_UNIT: i64 = 100_000;

pub fn points_earned(total: Decimal) -> i64 {
    if total <= Decimal::ZERO {
        return 0;
    }
    (total / Decimal::from(POINTS_UNIT))
        .floor()
        .to_i64()
        .unwrap_or(0)
}

/// Totais recalculados no servidor. Brindes não entram (valem zero).
pub fn compute_totals(lines: &[OrderLine], discount: Decimal) -> OrderTotals {
    let mut subtotal = Decimal::ZERO;
    let mut vat = Decimal::ZERO;

    for line in lines.iter().filter(|l| !l.is_gift) {
        let amount = line.line_amount();
        subtotal += amount;
        vat += (amount * line.vat_rate / Decimal::from(100))
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    }

    let discount = discount.max(Decimal::ZERO);
    let total = (subtotal - discount + vat).max(Decimal::ZERO);

    OrderTotals { subtotal, discount, vat, total }
}

// =============================================================================
//  VENDA
// =============================================================================

/// Tudo o que a venda leu (com trava) dentro da transação.
pub struct SaleContext<'a> {
    pub order_id: Uuid,
    pub code: &'a str,
    pub now: DateTime<Utc>,
    pub actor: &'a ActorContext,
    pub products: &'a HashMap<Uuid, Product>,
    pub gifts: &'a HashMap<Uuid, Gift>,
    pub customer: Option<&'a Customer>,
    pub held_serials: &'a HashSet<String>,
}

#[derive(Debug)]
pub struct SalePlan {
    pub lines: Vec<OrderLine>,
    pub totals: OrderTotals,
    pub points_redeemed: i64,
    pub points_earned: i64,
    pub ledger: Vec<NewLedgerEntry>,
    pub stock_updates: Vec<StockSnapshot>,
    pub gift_stock: Vec<(Uuid, i32)>,
    pub warranties: Vec<NewWarranty>,
    pub loyalty: Option<LoyaltyUpdate>,
}

/// Produto de cada linha do rascunho: o da própria linha ou, em brindes, o vínculo do brinde.
fn line_product_id(line_product: Option<Uuid>, gift: Option<&Gift>) -> Option<Uuid> {
    match gift {
        Some(g) => g.product_id,
        None => line_product,
    }
}

/// Valida o rascunho contra o que foi lido e monta todas as escritas.
/// Nenhum efeito colateral: qualquer erro aqui aborta a venda inteira.
pub fn plan_sale(draft: &OrderDraft, ctx: &SaleContext<'_>) -> Result<SalePlan, AppError> {
    if draft.items.is_empty() {
        return Err(AppError::BadRequest("o pedido não tem itens".into()));
    }

    // 1. Resolve brindes e produtos
    let mut resolved = Vec::with_capacity(draft.items.len());
    for item in &draft.items {
        if item.quantity <= 0 {
            return Err(AppError::BadRequest("quantidade deve ser positiva".into()));
        }

        let gift = match item.gift_id {
            Some(id) => Some(ctx.gifts.get(&id).ok_or(AppError::GiftNotFound(id))?),
            None => None,
        };

        let product = match line_product_id(item.product_id, gift) {
            Some(id) => Some(
                ctx.products
                    .get(&id)
                    .ok_or_else(|| AppError::ProductNotFound(id.to_string()))?,
            ),
            None if gift.is_none() => {
                return Err(AppError::BadRequest("linha sem produto".into()));
            }
            None => None,
        };

        resolved.push((item, gift, product));
    }

    // 2. Pontos
    let points_redeemed: i64 = resolved
        .iter()
        .filter_map(|(item, gift, _)| gift.map(|g| g.points_cost * i64::from(item.quantity)))
        .sum();

    if points_redeemed > 0 {
        let customer = ctx.customer.ok_or(AppError::MemberRequiredForGift)?;
        if customer.points < points_redeemed {
            return Err(AppError::InsufficientPoints {
                required: points_redeemed,
                available: customer.points,
            });
        }
    }

    // 3. Estoque, livro-razão, brindes e garantias
    let ledger_ctx = LedgerContext {
        code: ctx.code,
        note: Some(format!("Venda {}", ctx.code)),
        reference_id: Some(ctx.order_id),
        ..Default::default()
    };

    let mut book = StockBook::new(ctx.products.values().map(StockSnapshot::from));
    let mut ledger = Vec::new();
    let mut gift_remaining: HashMap<Uuid, i32> = HashMap::new();
    let mut lines = Vec::with_capacity(resolved.len());
    let mut serial_lines = Vec::new();

    for (item, gift, product) in &resolved {
        let unit_price = if gift.is_some() { Decimal::ZERO } else { item.unit_price };

        if let Some(product) = product {
            if product.kind.tracks_stock() {
                ledger.push(book.apply(product.id, MovementType::Sale, item.quantity, unit_price, &ledger_ctx)?);
            }
        }

        if let Some(gift) = gift {
            let remaining = gift_remaining.entry(gift.id).or_insert(gift.stock);
            if *remaining < item.quantity {
                return Err(AppError::InsufficientGiftStock {
                    name: gift.name.clone(),
                    available: *remaining,
                    requested: item.quantity,
                });
            }
            *remaining -= item.quantity;
        }

        if gift.is_none() {
            if let Some(product) = product.filter(|p| p.issues_warranty()) {
                // Uma garantia por unidade: um serial para cada unidade vendida
                let serial_count = item.serial_numbers.iter().filter(|s| !s.trim().is_empty()).count();
                if serial_count != item.quantity as usize {
                    return Err(AppError::BadRequest(format!(
                        "\"{}\" exige {} número(s) de série, recebido(s) {}",
                        product.name, item.quantity, serial_count
                    )));
                }
                serial_lines.push((product, &item.serial_numbers));
            }
        }

        lines.push(OrderLine {
            product_id: product.map(|p| p.id),
            gift_id: gift.map(|g| g.id),
            sku: product.map(|p| p.sku.clone()),
            name: gift
                .map(|g| g.name.clone())
                .or_else(|| product.map(|p| p.name.clone()))
                .unwrap_or_default(),
            quantity: item.quantity,
            unit_price,
            cost_price: product.map(|p| p.cost_price).unwrap_or_default(),
            vat_rate: if gift.is_some() {
                Decimal::ZERO
            } else {
                product.map(|p| p.vat_rate).unwrap_or_default()
            },
            is_gift: gift.is_some(),
            points_cost: gift.map(|g| g.points_cost).unwrap_or(0),
            serial_numbers: item.serial_numbers.clone(),
            is_serialized: product.is_some_and(|p| p.is_serialized),
            warranty_months: product.map(|p| p.warranty_months).unwrap_or(0),
        });
    }

    // Seriais checados de uma vez para pegar repetição entre linhas
    check_serials(serial_lines.iter().flat_map(|(_, s)| s.iter()), ctx.held_serials)?;

    let mut warranties = Vec::new();
    for (product, serials) in serial_lines {
        for serial in serials.iter().map(|s| s.trim()).filter(|s| !s.is_empty()) {
            warranties.push(NewWarranty {
                serial_number: serial.to_string(),
                product_id: product.id,
                product_name: product.name.clone(),
                order_id: Some(ctx.order_id),
                order_code: Some(ctx.code.to_string()),
                customer_id: ctx.customer.map(|c| c.id),
                customer_name: ctx.customer.map(|c| c.name.clone()),
                customer_phone: ctx.customer.map(|c| c.phone.clone()),
                purchase_date: ctx.now,
                expiry_date: expiry_date(ctx.now, product.warranty_months),
                warranty_months: product.warranty_months,
                history: vec![history_entry(
                    WarrantyStatus::Active,
                    format!("Ativada pela venda {}", ctx.code),
                    &ctx.actor.name,
                    ctx.now,
                )],
            });
        }
    }

    // 4. Totais e fidelidade
    let totals = compute_totals(&lines, draft.discount);
    let earned = if ctx.customer.is_some() { points_earned(totals.total) } else { 0 };

    let loyalty = ctx.customer.map(|c| LoyaltyUpdate {
        customer_id: c.id,
        points: c.points - points_redeemed + earned,
        total_spent: c.total_spent + totals.total,
        last_purchase_at: Some(ctx.now),
    });

    let mut gift_stock: Vec<(Uuid, i32)> = gift_remaining.into_iter().collect();
    gift_stock.sort_by_key(|(id, _)| *id);

    Ok(SalePlan {
        lines,
        totals,
        points_redeemed,
        points_earned: earned,
        ledger,
        stock_updates: book.into_updates(),
        gift_stock,
        warranties,
        loyalty,
    })
}

// =============================================================================
//  CANCELAMENTO
// =============================================================================

#[derive(Debug, Default)]
pub struct CancelPlan {
    pub ledger: Vec<NewLedgerEntry>,
    pub stock_updates: Vec<StockSnapshot>,
    pub gift_stock: Vec<(Uuid, i32)>,
    // Produtos apagados depois da venda: estoque não volta
    pub skipped_products: Vec<Uuid>,
    // Produtos cujas garantias deste pedido devem ser anuladas
    pub warranty_products: Vec<Uuid>,
    pub loyalty: Option<LoyaltyUpdate>,
}

pub fn return_code(order_code: &str) -> String {
    format!("RET-{order_code}")
}

/// Desfaz os efeitos de uma venda. Produto que não existe mais é pulado,
/// nunca falha. Pedido já cancelado devolve `None`: nada a escrever.
pub fn plan_cancellation(
    order: &Order,
    mut book: StockBook,
    gifts: &HashMap<Uuid, Gift>,
    customer: Option<&Customer>,
) -> Result<Option<CancelPlan>, AppError> {
    if order.status == OrderStatus::Cancelled {
        return Ok(None);
    }

    let code = return_code(&order.code);
    let ledger_ctx = LedgerContext {
        code: &code,
        note: Some(format!("Cancelamento do pedido {}", order.code)),
        reference_id: Some(order.id),
        ..Default::default()
    };

    let mut plan = CancelPlan::default();
    let mut gift_restored: HashMap<Uuid, i32> = HashMap::new();

    for line in order.items.iter() {
        if let Some(product_id) = line.product_id {
            if book.contains(&product_id) {
                plan.ledger.push(book.apply(
                    product_id,
                    MovementType::Return,
                    line.quantity,
                    line.unit_price,
                    &ledger_ctx,
                )?);
            } else if !plan.skipped_products.contains(&product_id) {
                plan.skipped_products.push(product_id);
            }

            if !line.is_gift && line.is_serialized && !plan.warranty_products.contains(&product_id) {
                plan.warranty_products.push(product_id);
            }
        }

        if let Some(gift) = line.gift_id.and_then(|id| gifts.get(&id)) {
            *gift_restored.entry(gift.id).or_insert(gift.stock) += line.quantity;
        }
    }

    plan.stock_updates = book.into_updates();
    plan.gift_stock = gift_restored.into_iter().collect();
    plan.gift_stock.sort_by_key(|(id, _)| *id);

    plan.loyalty = customer.map(|c| LoyaltyUpdate {
        customer_id: c.id,
        points: (c.points - points_earned(order.total) + order.points_redeemed).max(0),
        total_spent: (c.total_spent - order.total).max(Decimal::ZERO),
        last_purchase_at: c.last_purchase_at,
    });

    Ok(Some(plan))
}

// =============================================================================
//  SERVIÇO
// =============================================================================

#[derive(Clone)]
pub struct OrderService {
    order_repo: OrderRepository,
    inventory_repo: InventoryRepository,
    crm_repo: CrmRepository,
    gift_repo: GiftRepository,
    warranty_repo: WarrantyRepository,
    counter_service: CounterService,
    pool: PgPool,
    max_attempts: u32,
}

impl OrderService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        order_repo: OrderRepository,
        inventory_repo: InventoryRepository,
        crm_repo: CrmRepository,
        gift_repo: GiftRepository,
        warranty_repo: WarrantyRepository,
        counter_service: CounterService,
        pool: PgPool,
        max_attempts: u32,
    ) -> Self {
        Self {
            order_repo,
            inventory_repo,
            crm_repo,
            gift_repo,
            warranty_repo,
            counter_service,
            pool,
            max_attempts,
        }
    }

    // --- Leitura ---

    pub async fn list_orders(&self) -> Result<Vec<Order>, AppError> {
        self.order_repo.list_orders().await
    }

    pub async fn get_order(&self, order_id: Uuid) -> Result<Order, AppError> {
        self.order_repo
            .get_order(order_id)
            .await?
            .ok_or(AppError::OrderNotFound(order_id))
    }

    pub async fn get_orders_by_customer(&self, customer_id: Uuid) -> Result<Vec<Order>, AppError> {
        self.order_repo.get_orders_by_customer(customer_id).await
    }

    // --- Venda ---

    pub async fn save_order(&self, draft: &OrderDraft, actor: &ActorContext) -> Result<Order, AppError> {
        let order = retry_on_conflict(self.max_attempts, "save_order", || self.try_save_order(draft, actor)).await?;

        tracing::info!(
            target: "audit",
            actor = %actor.name,
            order = %order.code,
            total = %order.total,
            points_redeemed = order.points_redeemed,
            points_earned = order.points_earned,
            "Pedido finalizado"
        );
        Ok(order)
    }

    async fn lock_products(
        &self,
        conn: &mut PgConnection,
        ids: impl IntoIterator<Item = Uuid>,
    ) -> Result<HashMap<Uuid, Product>, AppError> {
        let mut ids: Vec<Uuid> = ids.into_iter().collect();
        ids.sort();
        ids.dedup();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let products = self.inventory_repo.lock_products(&mut *conn, &ids).await?;
        Ok(products.into_iter().map(|p| (p.id, p)).collect())
    }

    async fn lock_gifts(
        &self,
        conn: &mut PgConnection,
        ids: impl IntoIterator<Item = Uuid>,
    ) -> Result<HashMap<Uuid, Gift>, AppError> {
        let mut ids: Vec<Uuid> = ids.into_iter().collect();
        ids.sort();
        ids.dedup();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let gifts = self.gift_repo.lock_gifts(&mut *conn, &ids).await?;
        Ok(gifts.into_iter().map(|g| (g.id, g)).collect())
    }

    async fn try_save_order(&self, draft: &OrderDraft, actor: &ActorContext) -> Result<Order, AppError> {
        let mut tx = self.pool.begin().await?;
        let now = Utc::now();
        let order_id = Uuid::new_v4();

        // Ordem das travas: contador -> brindes -> produtos -> cliente

        // 1. Número da nota
        let code = self.counter_service.allocate(&mut tx, DocumentType::Invoice, now).await?;

        // 2. Brindes
        let gifts = self.lock_gifts(&mut tx, draft.items.iter().filter_map(|l| l.gift_id)).await?;

        // 3. Produtos (das linhas e dos vínculos dos brindes)
        let product_ids = draft
            .items
            .iter()
            .filter(|l| !l.is_gift())
            .filter_map(|l| l.product_id)
            .chain(gifts.values().filter_map(|g| g.product_id));
        let products = self.lock_products(&mut tx, product_ids).await?;

        // 4. Cliente
        let customer = match draft.customer_id {
            Some(id) => Some(
                self.crm_repo
                    .lock_customer(&mut *tx, id)
                    .await?
                    .ok_or_else(|| AppError::CustomerNotFound(id.to_string()))?,
            ),
            None => None,
        };

        // 5. Seriais já ocupados
        let serials: Vec<String> = draft
            .items
            .iter()
            .flat_map(|l| l.serial_numbers.iter())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        let held_serials: HashSet<String> = if serials.is_empty() {
            HashSet::new()
        } else {
            self.warranty_repo.find_held_serials(&mut *tx, &serials).await?.into_iter().collect()
        };

        // 6. Decide tudo antes de escrever
        let plan = plan_sale(draft, &SaleContext {
            order_id,
            code: &code,
            now,
            actor,
            products: &products,
            gifts: &gifts,
            customer: customer.as_ref(),
            held_serials: &held_serials,
        })?;

        // 7. Escritas
        for snapshot in &plan.stock_updates {
            self.inventory_repo
                .update_stock_and_cost(&mut *tx, snapshot.product_id, snapshot.stock, snapshot.cost_price)
                .await?;
        }
        for entry in &plan.ledger {
            self.inventory_repo.record_stock_movement(&mut *tx, entry, &actor.name).await?;
        }
        for (gift_id, stock) in &plan.gift_stock {
            self.gift_repo.set_gift_stock(&mut *tx, *gift_id, *stock).await?;
        }
        for warranty in &plan.warranties {
            self.warranty_repo.insert_warranty(&mut *tx, warranty).await?;
        }
        if let Some(loyalty) = &plan.loyalty {
            self.crm_repo.apply_loyalty(&mut *tx, loyalty).await?;
        }

        let order = self.order_repo.insert_order(&mut *tx, &NewOrderRecord {
            id: order_id,
            code: &code,
            customer_id: customer.as_ref().map(|c| c.id),
            customer_name: customer.as_ref().map(|c| c.name.as_str()),
            customer_phone: customer.as_ref().map(|c| c.phone.as_str()),
            items: &plan.lines,
            totals: plan.totals,
            points_redeemed: plan.points_redeemed,
            points_earned: plan.points_earned,
            payment_method: draft.payment_method,
            staff_name: &actor.name,
            note: draft.note.as_deref(),
            created_at: now,
        }).await?;

        tx.commit().await?;
        Ok(order)
    }

    // --- Cancelamento ---

    /// Idempotente: pedido já cancelado devolve sucesso sem escrever nada.
    pub async fn cancel_order(&self, order_id: Uuid, actor: &ActorContext) -> Result<bool, AppError> {
        retry_on_conflict(self.max_attempts, "cancel_order", || self.try_cancel_order(order_id, actor)).await
    }

    async fn try_cancel_order(&self, order_id: Uuid, actor: &ActorContext) -> Result<bool, AppError> {
        let mut tx = self.pool.begin().await?;

        let order = self.order_repo
            .lock_order(&mut *tx, order_id)
            .await?
            .ok_or(AppError::OrderNotFound(order_id))?;

        if order.status == OrderStatus::Cancelled {
            tracing::info!(order = %order.code, "Pedido já estava cancelado");
            return Ok(true);
        }

        let gifts = self.lock_gifts(&mut tx, order.items.iter().filter_map(|l| l.gift_id)).await?;
        let products = self.lock_products(&mut tx, order.items.iter().filter_map(|l| l.product_id)).await?;

        let customer = match order.customer_id {
            Some(id) => {
                let customer = self.crm_repo.lock_customer(&mut *tx, id).await?;
                if customer.is_none() {
                    tracing::warn!(order = %order.code, customer = %id, "Cliente do pedido não existe mais, fidelidade não revertida");
                }
                customer
            }
            None => None,
        };

        let book = StockBook::new(
            products.values().filter(|p| p.kind.tracks_stock()).map(StockSnapshot::from),
        );
        let Some(plan) = plan_cancellation(&order, book, &gifts, customer.as_ref())? else {
            return Ok(true);
        };

        for product_id in &plan.skipped_products {
            if !products.contains_key(product_id) {
                tracing::warn!(order = %order.code, product = %product_id, "Produto não existe mais, estoque não devolvido");
            }
        }

        for snapshot in &plan.stock_updates {
            self.inventory_repo
                .update_stock_and_cost(&mut *tx, snapshot.product_id, snapshot.stock, snapshot.cost_price)
                .await?;
        }
        for entry in &plan.ledger {
            self.inventory_repo.record_stock_movement(&mut *tx, entry, &actor.name).await?;
        }
        for (gift_id, stock) in &plan.gift_stock {
            self.gift_repo.set_gift_stock(&mut *tx, *gift_id, *stock).await?;
        }

        let now = Utc::now();
        for product_id in &plan.warranty_products {
            let items = self.warranty_repo.lock_for_order_product(&mut *tx, order.id, *product_id).await?;
            for item in items {
                let mut history = item.history.0.clone();
                history.push(history_entry(
                    WarrantyStatus::Void,
                    format!("Anulada pelo cancelamento do pedido {}", order.code),
                    &actor.name,
                    now,
                ));
                self.warranty_repo.update_status(&mut *tx, item.id, &item.serial_number, WarrantyStatus::Void, &history).await?;
            }
        }

        if let Some(loyalty) = &plan.loyalty {
            self.crm_repo.apply_loyalty(&mut *tx, loyalty).await?;
        }

        self.order_repo
            .set_status(&mut *tx, order.id, OrderStatus::Cancelled, Some(&actor.name))
            .await?;

        tx.commit().await?;

        tracing::info!(target: "audit", actor = %actor.name, order = %order.code, "Pedido cancelado");
        Ok(true)
    }

    // --- Exclusão administrativa ---

    /// Apaga o pedido sem desfazer estoque, livro-razão nem fidelidade.
    pub async fn purge_order(&self, order_id: Uuid, actor: &ActorContext) -> Result<(), AppError> {
        if !actor.is_admin() {
            return Err(AppError::Forbidden);
        }

        let mut tx = self.pool.begin().await?;
        let order = self.order_repo
            .lock_order(&mut *tx, order_id)
            .await?
            .ok_or(AppError::OrderNotFound(order_id))?;

        self.order_repo.delete_order(&mut *tx, order_id).await?;
        tx.commit().await?;

        tracing::warn!(
            target: "audit",
            actor = %actor.name,
            order = %order.code,
            status = ?order.status,
            "Pedido apagado sem reverter estoque, livro-razão e pontos"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{inventory::ProductKind, orders::{OrderLineDraft, PaymentMethod}};
    use sqlx::types::Json;

    fn actor() -> ActorContext {
        ActorContext { user_id: Uuid::new_v4(), name: "Thu ngân".into(), role: "staff".into() }
    }

    fn product(stock: i32, cost: i64) -> Product {
        let now = Utc::now();
        Product {
            id: Uuid::new_v4(),
            sku: "IP15".into(),
            name: "iPhone 15".into(),
            category_id: None,
            sale_price: Decimal::from(2000),
            cost_price: Decimal::from(cost),
            stock,
            min_stock: 0,
            unit: "cái".into(),
            kind: ProductKind::Product,
            warranty_months: 0,
            is_serialized: false,
            vat_rate: Decimal::ZERO,
            active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn customer(points: i64) -> Customer {
        let now = Utc::now();
        Customer {
            id: Uuid::new_v4(),
            name: "Nguyễn Văn A".into(),
            phone: "0901234567".into(),
            email: None,
            address: None,
            points,
            total_spent: Decimal::ZERO,
            last_purchase_at: None,
            active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn gift(points_cost: i64, stock: i32, product_id: Option<Uuid>) -> Gift {
        let now = Utc::now();
        Gift {
            id: Uuid::new_v4(),
            name: "Tai nghe".into(),
            points_cost,
            stock,
            product_id,
            active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn line(product_id: Uuid, quantity: i32, price: i64) -> OrderLineDraft {
        OrderLineDraft {
            product_id: Some(product_id),
            gift_id: None,
            quantity,
            unit_price: Decimal::from(price),
            serial_numbers: vec![],
        }
    }

    fn gift_line(gift_id: Uuid, quantity: i32) -> OrderLineDraft {
        OrderLineDraft {
            product_id: None,
            gift_id: Some(gift_id),
            quantity,
            unit_price: Decimal::ZERO,
            serial_numbers: vec![],
        }
    }

    fn draft(customer_id: Option<Uuid>, items: Vec<OrderLineDraft>) -> OrderDraft {
        OrderDraft {
            customer_id,
            items,
            discount: Decimal::ZERO,
            payment_method: PaymentMethod::Cash,
            note: None,
        }
    }

    struct Fixture {
        actor: ActorContext,
        products: HashMap<Uuid, Product>,
        gifts: HashMap<Uuid, Gift>,
        customer: Option<Customer>,
        held: HashSet<String>,
    }

    impl Fixture {
        fn new(products: Vec<Product>, gifts: Vec<Gift>, customer: Option<Customer>) -> Self {
            Self {
                actor: actor(),
                products: products.into_iter().map(|p| (p.id, p)).collect(),
                gifts: gifts.into_iter().map(|g| (g.id, g)).collect(),
                customer,
                held: HashSet::new(),
            }
        }

        fn plan(&self, draft: &OrderDraft) -> Result<SalePlan, AppError> {
            plan_sale(draft, &SaleContext {
                order_id: Uuid::new_v4(),
                code: "HD26-00000001",
                now: Utc::now(),
                actor: &self.actor,
                products: &self.products,
                gifts: &self.gifts,
                customer: self.customer.as_ref(),
                held_serials: &self.held,
            })
        }
    }

    fn order_from(plan: &SalePlan, customer_id: Option<Uuid>) -> Order {
        let now = Utc::now();
        Order {
            id: plan.ledger.first().and_then(|e| e.reference_id).unwrap_or_else(Uuid::new_v4),
            code: "HD26-00000001".into(),
            customer_id,
            customer_name: None,
            customer_phone: None,
            items: Json(plan.lines.clone()),
            subtotal: plan.totals.subtotal,
            discount: plan.totals.discount,
            vat: plan.totals.vat,
            total: plan.totals.total,
            points_redeemed: plan.points_redeemed,
            points_earned: plan.points_earned,
            payment_method: PaymentMethod::Cash,
            status: OrderStatus::Completed,
            staff_name: "Thu ngân".into(),
            note: None,
            cancelled_at: None,
            cancelled_by: None,
            active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn points_are_one_per_hundred_thousand() {
        assert_eq!(points_earned(Decimal::from(99_999)), 0);
        assert_eq!(points_earned(Decimal::from(100_000)), 1);
        assert_eq!(points_earned(Decimal::from(1_250_000)), 12);
        assert_eq!(points_earned(Decimal::from(-5)), 0);
    }

    #[test]
    fn totals_apply_vat_per_line_and_clamp_at_zero() {
        let p = product(10, 100);
        let f = Fixture::new(vec![p.clone()], vec![], None);
        let mut plan = f.plan(&draft(None, vec![line(p.id, 3, 1000)])).unwrap();
        plan.lines[0].vat_rate = Decimal::from(10);

        let totals = compute_totals(&plan.lines, Decimal::from(500));
        assert_eq!(totals.subtotal, Decimal::from(3000));
        assert_eq!(totals.vat, Decimal::from(300));
        assert_eq!(totals.total, Decimal::from(2800));

        let free = compute_totals(&plan.lines, Decimal::from(1_000_000));
        assert_eq!(free.total, Decimal::ZERO);
    }

    #[test]
    fn sale_then_cancel_restores_stock_and_ledger() {
        let p = product(5, 1000);
        let f = Fixture::new(vec![p.clone()], vec![], None);

        let plan = f.plan(&draft(None, vec![line(p.id, 2, 2000)])).unwrap();

        assert_eq!(plan.stock_updates.len(), 1);
        assert_eq!(plan.stock_updates[0].stock, 3);
        assert_eq!(plan.stock_updates[0].cost_price, Decimal::from(1000));
        assert_eq!(plan.ledger.len(), 1);
        assert_eq!(plan.ledger[0].movement_type, MovementType::Sale);
        assert_eq!(plan.ledger[0].quantity, -2);
        assert_eq!(plan.ledger[0].balance(), 3);
        assert_eq!(plan.lines[0].cost_price, Decimal::from(1000));
        assert_eq!(plan.totals.total, Decimal::from(4000));

        // Cancela a partir do estado pós-venda
        let order = order_from(&plan, None);
        let book = StockBook::new(plan.stock_updates.clone());
        let cancel = plan_cancellation(&order, book, &HashMap::new(), None).unwrap().unwrap();

        assert_eq!(cancel.stock_updates[0].stock, 5);
        assert_eq!(cancel.ledger[0].code, "RET-HD26-00000001");
        assert_eq!(cancel.ledger[0].movement_type, MovementType::Return);
        assert_eq!(cancel.ledger[0].quantity, 2);
        assert_eq!(cancel.ledger[0].balance(), 5);
    }

    #[test]
    fn lines_on_the_same_product_are_cumulative() {
        let p = product(3, 1000);
        let f = Fixture::new(vec![p.clone()], vec![], None);

        let err = f.plan(&draft(None, vec![line(p.id, 2, 10), line(p.id, 2, 10)])).unwrap_err();
        assert!(matches!(err, AppError::InsufficientStock { available: 1, requested: 2, .. }));
    }

    #[test]
    fn missing_product_fails() {
        let f = Fixture::new(vec![], vec![], None);
        let err = f.plan(&draft(None, vec![line(Uuid::new_v4(), 1, 10)])).unwrap_err();
        assert!(matches!(err, AppError::ProductNotFound(_)));
    }

    #[test]
    fn services_do_not_touch_stock() {
        let mut p = product(0, 0);
        p.kind = ProductKind::Service;
        let f = Fixture::new(vec![p.clone()], vec![], None);

        let plan = f.plan(&draft(None, vec![line(p.id, 1, 150_000)])).unwrap();
        assert!(plan.ledger.is_empty());
        assert!(plan.stock_updates.is_empty());
    }

    #[test]
    fn loyalty_accumulates_on_sale_and_reverts_on_cancel() {
        let p = product(10, 100_000);
        let c = customer(7);
        let customer_id = c.id;
        let f = Fixture::new(vec![p.clone()], vec![], Some(c.clone()));

        let plan = f.plan(&draft(Some(customer_id), vec![line(p.id, 2, 150_000)])).unwrap();
        let loyalty = plan.loyalty.unwrap();
        assert_eq!(plan.points_earned, 3);
        assert_eq!(loyalty.points, 10);
        assert_eq!(loyalty.total_spent, Decimal::from(300_000));
        assert!(loyalty.last_purchase_at.is_some());

        let after_sale = Customer { points: loyalty.points, total_spent: loyalty.total_spent, ..c };
        let order = order_from(&plan, Some(customer_id));
        let cancel = plan_cancellation(&order, StockBook::new(plan.stock_updates), &HashMap::new(), Some(&after_sale)).unwrap().unwrap();
        let reverted = cancel.loyalty.unwrap();
        assert_eq!(reverted.points, 7);
        assert_eq!(reverted.total_spent, Decimal::ZERO);
    }

    #[test]
    fn gift_requires_member() {
        let p = product(5, 100);
        let g = gift(50, 5, Some(p.id));
        let f = Fixture::new(vec![p], vec![g.clone()], None);

        let err = f.plan(&draft(None, vec![gift_line(g.id, 1)])).unwrap_err();
        assert!(matches!(err, AppError::MemberRequiredForGift));
    }

    #[test]
    fn gift_requires_enough_points() {
        let p = product(5, 100);
        let g = gift(50, 5, Some(p.id));
        let c = customer(60);
        let f = Fixture::new(vec![p], vec![g.clone()], Some(c.clone()));

        let err = f.plan(&draft(Some(c.id), vec![gift_line(g.id, 2)])).unwrap_err();
        assert!(matches!(err, AppError::InsufficientPoints { required: 100, available: 60 }));
    }

    #[test]
    fn gift_redemption_spends_points_and_both_stocks() {
        let p = product(5, 100);
        let g = gift(50, 3, Some(p.id));
        let c = customer(120);
        let f = Fixture::new(vec![p.clone()], vec![g.clone()], Some(c.clone()));

        let plan = f.plan(&draft(Some(c.id), vec![gift_line(g.id, 2)])).unwrap();

        assert_eq!(plan.points_redeemed, 100);
        assert_eq!(plan.loyalty.unwrap().points, 20);
        assert_eq!(plan.gift_stock, vec![(g.id, 1)]);
        assert_eq!(plan.stock_updates[0].stock, 3);
        assert_eq!(plan.ledger[0].unit_price, Decimal::ZERO);
        assert!(plan.lines[0].is_gift);
        assert_eq!(plan.totals.total, Decimal::ZERO);

        // Cancelamento devolve brinde, produto e pontos
        let order = order_from(&plan, Some(c.id));
        let gifts_after: HashMap<Uuid, Gift> = [(g.id, Gift { stock: 1, ..g.clone() })].into_iter().collect();
        let after = Customer { points: 20, ..c };
        let cancel = plan_cancellation(&order, StockBook::new(plan.stock_updates), &gifts_after, Some(&after)).unwrap().unwrap();
        assert_eq!(cancel.gift_stock, vec![(g.id, 3)]);
        assert_eq!(cancel.stock_updates[0].stock, 5);
        assert_eq!(cancel.loyalty.unwrap().points, 120);
    }

    #[test]
    fn gift_stock_is_checked() {
        let g = gift(1, 1, None);
        let c = customer(100);
        let f = Fixture::new(vec![], vec![g.clone()], Some(c.clone()));

        let err = f.plan(&draft(Some(c.id), vec![gift_line(g.id, 2)])).unwrap_err();
        assert!(matches!(err, AppError::InsufficientGiftStock { available: 1, requested: 2, .. }));
    }

    #[test]
    fn unknown_gift_fails() {
        let c = customer(100);
        let f = Fixture::new(vec![], vec![], Some(c.clone()));
        let err = f.plan(&draft(Some(c.id), vec![gift_line(Uuid::new_v4(), 1)])).unwrap_err();
        assert!(matches!(err, AppError::GiftNotFound(_)));
    }

    #[test]
    fn serialized_sale_issues_one_warranty_per_serial() {
        let mut p = product(5, 100);
        p.is_serialized = true;
        p.warranty_months = 12;
        let f = Fixture::new(vec![p.clone()], vec![], None);

        let mut l = line(p.id, 2, 1000);
        l.serial_numbers = vec!["SN-1".into(), "SN-2".into()];
        let plan = f.plan(&draft(None, vec![l])).unwrap();

        assert_eq!(plan.warranties.len(), 2);
        let w = &plan.warranties[0];
        assert_eq!(w.order_code.as_deref(), Some("HD26-00000001"));
        assert_eq!(w.history.len(), 1);
        assert_eq!(w.history[0].status, WarrantyStatus::Active);
        assert_eq!(w.expiry_date, expiry_date(w.purchase_date, 12));
    }

    #[test]
    fn serial_count_must_match_quantity() {
        let mut p = product(5, 100);
        p.is_serialized = true;
        p.warranty_months = 12;
        let f = Fixture::new(vec![p.clone()], vec![], None);

        let mut short = line(p.id, 2, 1000);
        short.serial_numbers = vec!["SN-1".into(), "  ".into()];
        assert!(matches!(f.plan(&draft(None, vec![short])), Err(AppError::BadRequest(_))));

        let mut extra = line(p.id, 1, 1000);
        extra.serial_numbers = vec!["SN-1".into(), "SN-2".into()];
        assert!(matches!(f.plan(&draft(None, vec![extra])), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn serialized_product_without_warranty_needs_no_serials() {
        let mut p = product(5, 100);
        p.is_serialized = true;
        let f = Fixture::new(vec![p.clone()], vec![], None);

        let plan = f.plan(&draft(None, vec![line(p.id, 2, 1000)])).unwrap();
        assert!(plan.warranties.is_empty());
    }

    #[test]
    fn held_serial_fails_before_any_write() {
        let mut p = product(5, 100);
        p.is_serialized = true;
        p.warranty_months = 12;
        let mut f = Fixture::new(vec![p.clone()], vec![], None);
        f.held.insert("SN-1".into());

        let mut l = line(p.id, 1, 1000);
        l.serial_numbers = vec!["SN-1".into()];
        assert!(matches!(f.plan(&draft(None, vec![l])), Err(AppError::DuplicateSerial(_))));
    }

    #[test]
    fn serial_repeated_across_lines_fails() {
        let mut p = product(5, 100);
        p.is_serialized = true;
        p.warranty_months = 6;
        let f = Fixture::new(vec![p.clone()], vec![], None);

        let mut a = line(p.id, 1, 1000);
        a.serial_numbers = vec!["X".into()];
        let b = a.clone();
        assert!(matches!(f.plan(&draft(None, vec![a, b])), Err(AppError::DuplicateSerial(_))));
    }

    #[test]
    fn cancel_skips_deleted_products_and_marks_warranties() {
        let mut p = product(5, 100);
        p.is_serialized = true;
        p.warranty_months = 12;
        let f = Fixture::new(vec![p.clone()], vec![], None);

        let mut l = line(p.id, 1, 1000);
        l.serial_numbers = vec!["SN-9".into()];
        let plan = f.plan(&draft(None, vec![l])).unwrap();
        let order = order_from(&plan, None);

        // Produto apagado depois da venda
        let cancel = plan_cancellation(&order, StockBook::default(), &HashMap::new(), None).unwrap().unwrap();
        assert!(cancel.ledger.is_empty());
        assert_eq!(cancel.skipped_products, vec![p.id]);
        assert_eq!(cancel.warranty_products, vec![p.id]);
    }

    #[test]
    fn cancel_never_pushes_points_below_zero() {
        let p = product(10, 100);
        let c = customer(0);
        let f = Fixture::new(vec![p.clone()], vec![], Some(c.clone()));

        let plan = f.plan(&draft(Some(c.id), vec![line(p.id, 1, 500_000)])).unwrap();
        let order = order_from(&plan, Some(c.id));

        // Cliente já gastou os pontos ganhos
        let spent = Customer { points: 1, total_spent: Decimal::from(100_000), ..c };
        let cancel = plan_cancellation(&order, StockBook::new(plan.stock_updates), &HashMap::new(), Some(&spent)).unwrap().unwrap();
        let loyalty = cancel.loyalty.unwrap();
        assert_eq!(loyalty.points, 0);
        assert_eq!(loyalty.total_spent, Decimal::ZERO);
    }

    #[test]
    fn cancelling_a_cancelled_order_changes_nothing() {
        let p = product(10, 100);
        let c = customer(0);
        let f = Fixture::new(vec![p.clone()], vec![], Some(c.clone()));

        let plan = f.plan(&draft(Some(c.id), vec![line(p.id, 2, 500_000)])).unwrap();
        let mut order = order_from(&plan, Some(c.id));
        order.status = OrderStatus::Cancelled;

        let after = Customer { points: 10, total_spent: Decimal::from(1_000_000), ..c };
        let cancel = plan_cancellation(&order, StockBook::new(plan.stock_updates), &HashMap::new(), Some(&after)).unwrap();
        assert!(cancel.is_none());
    }

    #[test]
    fn returned_orders_can_still_be_cancelled() {
        let p = product(10, 100);
        let f = Fixture::new(vec![p.clone()], vec![], None);

        let plan = f.plan(&draft(None, vec![line(p.id, 1, 1000)])).unwrap();
        let mut order = order_from(&plan, None);
        order.status = OrderStatus::Returned;

        let cancel = plan_cancellation(&order, StockBook::new(plan.stock_updates), &HashMap::new(), None).unwrap().unwrap();
        assert_eq!(cancel.stock_updates[0].stock, 10);
    }

    #[test]
    fn empty_draft_is_rejected() {
        let f = Fixture::new(vec![], vec![], None);
        assert!(matches!(f.plan(&draft(None, vec![])), Err(AppError::BadRequest(_))));
    }
}
