// src/models/gifts.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Gift {
    pub id: Uuid,
    #[schema(example = "Tai nghe Bluetooth")]
    pub name: String,
    #[schema(example = 50)]
    pub points_cost: i64,
    // Estoque próprio do brinde, independente do produto vinculado
    #[schema(example = 10)]
    pub stock: i32,
    pub product_id: Option<Uuid>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewGift {
    pub name: String,
    pub points_cost: i64,
    pub stock: i32,
    pub product_id: Option<Uuid>,
}

#[derive(Debug, Default, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GiftUpdate {
    pub name: Option<String>,
    pub points_cost: Option<i64>,
    pub stock: Option<i32>,
    pub product_id: Option<Uuid>,
    pub active: Option<bool>,
}
