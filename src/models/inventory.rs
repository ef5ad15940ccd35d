// src/models/inventory.rs

use serde::{Serialize, Deserialize};
use chrono::{DateTime, Utc, NaiveDate};
use rust_decimal::Decimal;
use sqlx::FromRow;
use uuid::Uuid;
use utoipa::ToSchema;

use validator::Validate;

use crate::{common::validation::validate_not_negative, models::documents::DocumentType};

// --- 1. Categorias ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: Uuid,
    #[schema(example = "Điện thoại")]
    pub name: String,
    pub description: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// --- 2. Produtos ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "product_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ProductKind {
    Product,
    Service,
    Material,
}

impl ProductKind {
    /// Serviços não têm estoque físico.
    pub fn tracks_stock(self) -> bool {
        !matches!(self, ProductKind::Service)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    #[schema(example = "IP15-128-BLK")]
    pub sku: String,
    #[schema(example = "iPhone 15 128GB")]
    pub name: String,
    pub category_id: Option<Uuid>,
    #[schema(example = "20990000")]
    pub sale_price: Decimal,
    // Custo médio ponderado. Só muda por movimentação de entrada.
    #[schema(example = "18500000")]
    pub cost_price: Decimal,
    #[schema(example = 12)]
    pub stock: i32,
    #[schema(example = 2)]
    pub min_stock: i32,
    #[schema(example = "cái")]
    pub unit: String,
    pub kind: ProductKind,
    #[schema(example = 12)]
    pub warranty_months: i32,
    pub is_serialized: bool,
    #[schema(example = "10")]
    pub vat_rate: Decimal,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn issues_warranty(&self) -> bool {
        self.is_serialized && self.warranty_months > 0
    }
}

/// Atualização parcial tipada. Estoque e custo ficam de fora de propósito:
/// só mudam através do livro-razão.
#[derive(Debug, Default, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductUpdate {
    pub sku: Option<String>,
    pub name: Option<String>,
    pub category_id: Option<Uuid>,
    pub sale_price: Option<Decimal>,
    pub min_stock: Option<i32>,
    pub unit: Option<String>,
    pub kind: Option<ProductKind>,
    pub warranty_months: Option<i32>,
    pub is_serialized: Option<bool>,
    pub vat_rate: Option<Decimal>,
    pub active: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct NewProduct {
    pub sku: String,
    pub name: String,
    pub category_id: Option<Uuid>,
    pub sale_price: Decimal,
    pub min_stock: i32,
    pub unit: String,
    pub kind: ProductKind,
    pub warranty_months: i32,
    pub is_serialized: bool,
    pub vat_rate: Decimal,
}

// --- 3. Fornecedores ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Supplier {
    pub id: Uuid,
    #[schema(example = "Digiworld")]
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub note: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Default, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SupplierUpdate {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub note: Option<String>,
    pub active: Option<bool>,
}

// --- 4. Movimentações de Estoque (livro-razão) ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "movement_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MovementType {
    Import,
    Export,
    Sale,
    Return,
    Scrap,
    Internal,
    Production,
    Initial,
}

impl MovementType {
    /// Entradas somam ao estoque; o resto subtrai.
    pub fn is_increase(self) -> bool {
        matches!(
            self,
            MovementType::Import | MovementType::Return | MovementType::Production | MovementType::Initial
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InventoryTransaction {
    pub id: Uuid,
    #[schema(example = "PN26-00000001")]
    pub code: String,
    pub product_id: Uuid,
    pub product_name: String,
    pub sku: String,
    pub movement_type: MovementType,
    // Delta com sinal (ex: -2 numa venda)
    #[schema(example = -2)]
    pub quantity: i32,
    #[schema(example = 3)]
    pub balance: i32,
    pub old_stock: i32,
    pub new_stock: i32,
    pub unit_price: Decimal,
    pub note: Option<String>,
    pub reference_id: Option<Uuid>,
    pub supplier_name: Option<String>,
    pub receiver_name: Option<String>,
    pub reference_number: Option<String>,
    pub reference_date: Option<NaiveDate>,
    pub staff_name: String,
    pub created_at: DateTime<Utc>,
}

/// Linha do livro-razão ainda não gravada.
#[derive(Debug, Clone, PartialEq)]
pub struct NewLedgerEntry {
    pub code: String,
    pub product_id: Uuid,
    pub product_name: String,
    pub sku: String,
    pub movement_type: MovementType,
    pub quantity: i32,
    pub old_stock: i32,
    pub new_stock: i32,
    pub unit_price: Decimal,
    pub note: Option<String>,
    pub reference_id: Option<Uuid>,
    pub voucher: VoucherMetadata,
}

impl NewLedgerEntry {
    pub fn balance(&self) -> i32 {
        self.new_stock
    }
}

/// Metadados opcionais de um documento de estoque (fornecedor, recebedor, documento de origem).
#[derive(Debug, Default, Clone, PartialEq, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VoucherMetadata {
    pub supplier_name: Option<String>,
    pub receiver_name: Option<String>,
    pub reference_number: Option<String>,
    pub reference_date: Option<NaiveDate>,
}

// --- 5. Documentos de ajuste em lote ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum StockVoucherType {
    Import,
    Export,
    Scrap,
    Internal,
}

impl StockVoucherType {
    pub fn movement_type(self) -> MovementType {
        match self {
            StockVoucherType::Import => MovementType::Import,
            StockVoucherType::Export => MovementType::Export,
            StockVoucherType::Scrap => MovementType::Scrap,
            StockVoucherType::Internal => MovementType::Internal,
        }
    }

    pub fn document_type(self) -> DocumentType {
        match self {
            StockVoucherType::Import => DocumentType::Import,
            StockVoucherType::Export => DocumentType::Export,
            StockVoucherType::Scrap => DocumentType::Scrap,
            StockVoucherType::Internal => DocumentType::Internal,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StockVoucherLine {
    pub product_id: Uuid,
    #[validate(range(min = 1, max = 1_000_000, message = "A quantidade deve ficar entre 1 e 1.000.000."))]
    #[schema(example = 10)]
    pub quantity: i32,
    #[validate(custom(function = "validate_not_negative"))]
    #[serde(default)]
    #[schema(example = "18500000")]
    pub unit_price: Decimal,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StockVoucherResult {
    #[schema(example = "PN26-00000001")]
    pub code: String,
    pub lines: Vec<InventoryTransaction>,
}

/// Produtos com estoque no limite mínimo ou abaixo.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LowStockEntry {
    pub id: Uuid,
    pub sku: String,
    pub name: String,
    pub stock: i32,
    pub min_stock: i32,
}
