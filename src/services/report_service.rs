// src/services/report_service.rs
//
// Relatórios calculados em memória sobre o que já foi lido do banco.

use rust_decimal::Decimal;

use crate::{
    common::error::AppError,
    db::{InventoryRepository, OrderRepository},
    models::{
        inventory::Product,
        orders::{Order, OrderStatus},
        reports::{InventoryValuation, ProfitReport, ReportPeriod},
    },
};

/// Lucro sobre pedidos finalizados dentro do período.
pub fn profit_report(orders: &[Order], period: &ReportPeriod) -> ProfitReport {
    let mut report = ProfitReport::default();

    for order in orders
        .iter()
        .filter(|o| o.status == OrderStatus::Completed && period.contains(o.created_at))
    {
        report.order_count += 1;
        report.revenue += order.total;
        report.discount += order.discount;
        report.vat += order.vat;
        report.cost_of_goods += order
            .items
            .iter()
            .map(|l| l.cost_price * Decimal::from(l.quantity))
            .sum::<Decimal>();
    }

    report.gross_profit = report.revenue - report.vat - report.cost_of_goods;
    report
}

/// Estoque × custo médio dos produtos ativos.
pub fn inventory_valuation(products: &[Product]) -> InventoryValuation {
    products
        .iter()
        .filter(|p| p.active && p.kind.tracks_stock())
        .fold(InventoryValuation::default(), |mut acc, p| {
            acc.product_count += 1;
            acc.total_units += i64::from(p.stock);
            acc.total_value += Decimal::from(p.stock) * p.cost_price;
            acc
        })
}

#[derive(Clone)]
pub struct ReportService {
    order_repo: OrderRepository,
    inventory_repo: InventoryRepository,
}

impl ReportService {
    pub fn new(order_repo: OrderRepository, inventory_repo: InventoryRepository) -> Self {
        Self { order_repo, inventory_repo }
    }

    pub async fn profit(&self, period: &ReportPeriod) -> Result<ProfitReport, AppError> {
        let orders = self.order_repo.list_orders().await?;
        Ok(profit_report(&orders, period))
    }

    pub async fn inventory_value(&self) -> Result<InventoryValuation, AppError> {
        let products = self.inventory_repo.get_all_products().await?;
        Ok(inventory_valuation(&products))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        inventory::ProductKind,
        orders::{OrderLine, PaymentMethod},
    };
    use chrono::{Duration, Utc};
    use sqlx::types::Json;
    use uuid::Uuid;

    fn line(quantity: i32, price: i64, cost: i64, is_gift: bool) -> OrderLine {
        OrderLine {
            product_id: Some(Uuid::new_v4()),
            gift_id: None,
            sku: Some("SKU".into()),
            name: "Ốp lưng".into(),
            quantity,
            unit_price: Decimal::from(price),
            cost_price: Decimal::from(cost),
            vat_rate: Decimal::ZERO,
            is_gift,
            points_cost: 0,
            serial_numbers: vec![],
            is_serialized: false,
            warranty_months: 0,
        }
    }

    fn order(status: OrderStatus, items: Vec<OrderLine>, total: i64, vat: i64) -> Order {
        let now = Utc::now();
        Order {
            id: Uuid::new_v4(),
            code: "HD26-00000001".into(),
            customer_id: None,
            customer_name: None,
            customer_phone: None,
            items: Json(items),
            subtotal: Decimal::from(total - vat),
            discount: Decimal::ZERO,
            vat: Decimal::from(vat),
            total: Decimal::from(total),
            points_redeemed: 0,
            points_earned: 0,
            payment_method: PaymentMethod::Card,
            status,
            staff_name: "Lan".into(),
            note: None,
            cancelled_at: None,
            cancelled_by: None,
            active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn profit_counts_only_completed_orders() {
        let orders = vec![
            order(OrderStatus::Completed, vec![line(2, 2000, 1000, false), line(1, 0, 300, true)], 4400, 400),
            order(OrderStatus::Cancelled, vec![line(5, 2000, 1000, false)], 10_000, 0),
        ];

        let report = profit_report(&orders, &ReportPeriod::default());
        assert_eq!(report.order_count, 1);
        assert_eq!(report.revenue, Decimal::from(4400));
        assert_eq!(report.vat, Decimal::from(400));
        // Brinde também entra no custo
        assert_eq!(report.cost_of_goods, Decimal::from(2300));
        assert_eq!(report.gross_profit, Decimal::from(1700));
    }

    #[test]
    fn period_bounds_are_applied() {
        let orders = vec![order(OrderStatus::Completed, vec![line(1, 100, 50, false)], 100, 0)];
        let future = ReportPeriod { from: Some(Utc::now() + Duration::days(1)), to: None };
        assert_eq!(profit_report(&orders, &future).order_count, 0);
    }

    #[test]
    fn valuation_ignores_inactive_and_services() {
        let now = Utc::now();
        let mk = |stock: i32, cost: i64, kind: ProductKind, active: bool| Product {
            id: Uuid::new_v4(),
            sku: "X".into(),
            name: "X".into(),
            category_id: None,
            sale_price: Decimal::ZERO,
            cost_price: Decimal::from(cost),
            stock,
            min_stock: 0,
            unit: "cái".into(),
            kind,
            warranty_months: 0,
            is_serialized: false,
            vat_rate: Decimal::ZERO,
            active,
            created_at: now,
            updated_at: now,
        };

        let products = vec![
            mk(3, 1000, ProductKind::Product, true),
            mk(10, 50, ProductKind::Material, true),
            mk(9, 999, ProductKind::Product, false),
            mk(0, 0, ProductKind::Service, true),
        ];
        let v = inventory_valuation(&products);
        assert_eq!(v.product_count, 2);
        assert_eq!(v.total_units, 13);
        assert_eq!(v.total_value, Decimal::from(3500));
    }
}
