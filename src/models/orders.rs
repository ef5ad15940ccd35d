// src/models/orders.rs

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use sqlx::{FromRow, types::Json};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use utoipa::ToSchema;
use validator::Validate;

use crate::common::validation::validate_not_negative;

// --- Enums ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "order_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Completed,
    Cancelled,
    Returned,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "payment_method", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Cash,
    Card,
    Transfer,
    Mixed,
}

// --- Linha do pedido (snapshot gravado em JSONB) ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub product_id: Option<Uuid>,
    pub gift_id: Option<Uuid>,
    pub sku: Option<String>,
    #[schema(example = "iPhone 15 128GB")]
    pub name: String,
    #[schema(example = 2)]
    pub quantity: i32,
    #[schema(example = "2000")]
    pub unit_price: Decimal,
    // Custo médio no momento da venda (para o relatório de lucro)
    #[schema(example = "1000")]
    pub cost_price: Decimal,
    pub vat_rate: Decimal,
    pub is_gift: bool,
    // Pontos por unidade, só para brindes
    pub points_cost: i64,
    #[serde(default)]
    pub serial_numbers: Vec<String>,
    pub is_serialized: bool,
    pub warranty_months: i32,
}

impl OrderLine {
    pub fn line_amount(&self) -> Decimal {
        if self.is_gift {
            Decimal::ZERO
        } else {
            self.unit_price * Decimal::from(self.quantity)
        }
    }
}

// --- Pedido ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    #[schema(example = "HD26-00000001")]
    pub code: String,
    pub customer_id: Option<Uuid>,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    #[schema(value_type = Vec<OrderLine>)]
    pub items: Json<Vec<OrderLine>>,
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub vat: Decimal,
    pub total: Decimal,
    pub points_redeemed: i64,
    pub points_earned: i64,
    pub payment_method: PaymentMethod,
    pub status: OrderStatus,
    pub staff_name: String,
    pub note: Option<String>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancelled_by: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// --- Rascunho vindo do carrinho ---

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineDraft {
    // Obrigatório para linhas normais; em brindes vem do vínculo do brinde
    pub product_id: Option<Uuid>,
    pub gift_id: Option<Uuid>,
    #[validate(range(min = 1, max = 1_000_000, message = "A quantidade deve ficar entre 1 e 1.000.000."))]
    #[schema(example = 1)]
    pub quantity: i32,
    #[validate(custom(function = "validate_not_negative"))]
    #[serde(default)]
    pub unit_price: Decimal,
    #[serde(default)]
    pub serial_numbers: Vec<String>,
}

impl OrderLineDraft {
    pub fn is_gift(&self) -> bool {
        self.gift_id.is_some()
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderDraft {
    pub customer_id: Option<Uuid>,
    #[validate(length(min = 1, message = "O pedido precisa de pelo menos um item."))]
    #[validate(nested)]
    pub items: Vec<OrderLineDraft>,
    #[validate(custom(function = "validate_not_negative"))]
    #[serde(default)]
    pub discount: Decimal,
    pub payment_method: PaymentMethod,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderTotals {
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub vat: Decimal,
    pub total: Decimal,
}
