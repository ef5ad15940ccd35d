// src/models/documents.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Tipos de documento numerados. Cada um tem seu próprio contador anual.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DocumentType {
    Invoice,
    Import,
    Export,
    Scrap,
    Internal,
    Production,
}

impl DocumentType {
    pub fn prefix(self) -> &'static str {
        match self {
            DocumentType::Invoice => "HD",
            DocumentType::Import => "PN",
            DocumentType::Export => "PX",
            DocumentType::Scrap => "XH",
            DocumentType::Internal => "XNB",
            DocumentType::Production => "XSX",
        }
    }

    /// Chave da linha na tabela `counters`.
    pub fn counter_name(self) -> &'static str {
        match self {
            DocumentType::Invoice => "invoice",
            DocumentType::Import => "import",
            DocumentType::Export => "export",
            DocumentType::Scrap => "scrap",
            DocumentType::Internal => "internal",
            DocumentType::Production => "production",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Counter {
    pub name: String,
    pub year: i32,
    pub last_number: i64,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DocumentNumber {
    #[schema(example = "HD26-00000001")]
    pub code: String,
}
