// src/models/reports.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

// 1. Relatório de Lucro (sobre pedidos finalizados)
#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProfitReport {
    pub order_count: usize,
    pub revenue: Decimal,        // Soma dos totais
    pub discount: Decimal,
    pub vat: Decimal,
    pub cost_of_goods: Decimal,  // Custo snapshot × quantidade
    pub gross_profit: Decimal,   // Receita líquida de IVA - custo
}

// 2. Valor do estoque (estoque × custo médio)
#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InventoryValuation {
    pub product_count: usize,
    pub total_units: i64,
    pub total_value: Decimal,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ReportPeriod {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl ReportPeriod {
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.from.is_none_or(|from| at >= from) && self.to.is_none_or(|to| at < to)
    }
}
