// src/models/warranty.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, types::Json};
use uuid::Uuid;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "warranty_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum WarrantyStatus {
    Active,
    Expired,
    Repairing,
    Void,
}

impl WarrantyStatus {
    /// Estados que "seguram" o número de série.
    pub fn holds_serial(self) -> bool {
        matches!(self, WarrantyStatus::Active | WarrantyStatus::Repairing)
    }

    pub fn can_transition_to(self, next: WarrantyStatus) -> bool {
        use WarrantyStatus::*;
        match (self, next) {
            (Void, _) => false,
            (a, b) if a == b => false,
            (Active, Repairing | Expired | Void) => true,
            (Repairing, Active | Expired | Void) => true,
            (Expired, Repairing | Void) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WarrantyHistoryEntry {
    pub at: DateTime<Utc>,
    pub status: WarrantyStatus,
    pub note: String,
    pub actor: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WarrantyItem {
    pub id: Uuid,
    #[schema(example = "SN123456789")]
    pub serial_number: String,
    pub product_id: Uuid,
    pub product_name: String,
    pub order_id: Option<Uuid>,
    pub order_code: Option<String>,
    pub customer_id: Option<Uuid>,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub purchase_date: DateTime<Utc>,
    pub expiry_date: DateTime<Utc>,
    pub warranty_months: i32,
    pub status: WarrantyStatus,
    #[schema(value_type = Vec<WarrantyHistoryEntry>)]
    pub history: Json<Vec<WarrantyHistoryEntry>>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Garantia ainda não gravada (emitida na venda ou cadastrada à mão).
#[derive(Debug, Clone, PartialEq)]
pub struct NewWarranty {
    pub serial_number: String,
    pub product_id: Uuid,
    pub product_name: String,
    pub order_id: Option<Uuid>,
    pub order_code: Option<String>,
    pub customer_id: Option<Uuid>,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub purchase_date: DateTime<Utc>,
    pub expiry_date: DateTime<Utc>,
    pub warranty_months: i32,
    pub history: Vec<WarrantyHistoryEntry>,
}
