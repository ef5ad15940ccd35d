// src/models/crm.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use utoipa::ToSchema;

// --- CLIENTE (membro do programa de fidelidade) ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: Uuid,
    #[schema(example = "Nguyễn Văn A")]
    pub name: String,
    #[schema(example = "0901234567")]
    pub phone: String,
    pub email: Option<String>,
    pub address: Option<String>,

    // Só mudam dentro das transações de venda/cancelamento
    #[schema(example = 120)]
    pub points: i64,
    pub total_spent: Decimal,
    pub last_purchase_at: Option<DateTime<Utc>>,

    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewCustomer {
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub address: Option<String>,
}

/// Campos editáveis pelo cadastro. Pontos e gasto acumulado não entram aqui.
#[derive(Debug, Default, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CustomerUpdate {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub active: Option<bool>,
}

/// Novo saldo de fidelidade calculado pelo motor de pedidos.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoyaltyUpdate {
    pub customer_id: Uuid,
    pub points: i64,
    pub total_spent: Decimal,
    pub last_purchase_at: Option<DateTime<Utc>>,
}
