use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

// Nosso tipo de erro. A mensagem do `Display` é exatamente o que o caixa vê na tela.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Dados inválidos: {0}")]
    BadRequest(String),

    // --- Pré-condições (abortam a transação inteira) ---

    #[error("Estoque insuficiente para \"{name}\": disponível {available}, solicitado {requested}")]
    InsufficientStock { name: String, available: i32, requested: i32 },

    #[error("Estoque de brinde insuficiente para \"{name}\": disponível {available}, solicitado {requested}")]
    InsufficientGiftStock { name: String, available: i32, requested: i32 },

    #[error("Pontos insuficientes: necessário {required}, saldo atual {available}")]
    InsufficientPoints { required: i64, available: i64 },

    #[error("É preciso selecionar um cliente membro para resgatar brindes")]
    MemberRequiredForGift,

    #[error("Não é possível mudar a garantia de {from} para {to}")]
    InvalidWarrantyTransition { from: String, to: String },

    // --- Referências ausentes ---

    #[error("Produto não encontrado: {0}")]
    ProductNotFound(String),

    #[error("Brinde não encontrado: {0}")]
    GiftNotFound(Uuid),

    #[error("Cliente não encontrado: {0}")]
    CustomerNotFound(String),

    #[error("Pedido não encontrado: {0}")]
    OrderNotFound(Uuid),

    #[error("Garantia não encontrada: {0}")]
    WarrantyNotFound(String),

    #[error("Fornecedor não encontrado: {0}")]
    SupplierNotFound(Uuid),

    #[error("Documento não encontrado: {0}")]
    VoucherNotFound(String),

    // --- Duplicidades ---

    #[error("O telefone {0} já pertence a outro cliente")]
    DuplicatePhone(String),

    #[error("O número de série {0} já está em uma garantia ativa")]
    DuplicateSerial(String),

    #[error("Já existe um fornecedor chamado \"{0}\"")]
    DuplicateSupplierName(String),

    #[error("SKU já existe: {0}")]
    SkuAlreadyExists(String),

    #[error("Já existe uma categoria chamada \"{0}\"")]
    CategoryNameAlreadyExists(String),

    // --- Autenticação ---

    #[error("Token inválido")]
    InvalidToken,

    #[error("Operação restrita a administradores")]
    Forbidden,

    // Variante para erros de banco de dados
    #[error("Erro de banco de dados: {0}")]
    DatabaseError(#[from] sqlx::Error),

    // Variante genérica para qualquer outro erro inesperado
    #[error("Erro interno do servidor: {0}")]
    InternalServerError(#[from] anyhow::Error),
}

impl AppError {
    /// Conflito de escrita concorrente: a operação inteira pode ser refeita.
    /// 40001 = serialization_failure, 40P01 = deadlock_detected.
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::DatabaseError(sqlx::Error::Database(db_err)) => {
                matches!(db_err.code().as_deref(), Some("40001") | Some("40P01"))
            }
            _ => false,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,

            AppError::InsufficientStock { .. }
            | AppError::InsufficientGiftStock { .. }
            | AppError::InsufficientPoints { .. }
            | AppError::MemberRequiredForGift
            | AppError::InvalidWarrantyTransition { .. } => StatusCode::UNPROCESSABLE_ENTITY,

            AppError::ProductNotFound(_)
            | AppError::GiftNotFound(_)
            | AppError::CustomerNotFound(_)
            | AppError::OrderNotFound(_)
            | AppError::WarrantyNotFound(_)
            | AppError::SupplierNotFound(_)
            | AppError::VoucherNotFound(_) => StatusCode::NOT_FOUND,

            AppError::DuplicatePhone(_)
            | AppError::DuplicateSerial(_)
            | AppError::DuplicateSupplierName(_)
            | AppError::SkuAlreadyExists(_)
            | AppError::CategoryNameAlreadyExists(_) => StatusCode::CONFLICT,

            AppError::InvalidToken => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,

            AppError::DatabaseError(_) | AppError::InternalServerError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let body = match self {
            // Retorna todos os detalhes da validação, campo a campo.
            AppError::ValidationError(errors) => {
                let mut details = std::collections::HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors.iter()
                        .map(|e| e.message.as_ref().map(|m| m.to_string()).unwrap_or_else(|| e.code.to_string()))
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                json!({
                    "error": "Um ou mais campos são inválidos.",
                    "details": details,
                })
            }

            // Erros internos: o detalhe vai para o log, não para o cliente.
            ref e if status == StatusCode::INTERNAL_SERVER_ERROR => {
                tracing::error!("Erro Interno do Servidor: {}", e);
                json!({ "error": "Ocorreu um erro inesperado." })
            }

            e => json!({ "error": e.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}

/// Converte violação de unicidade do Postgres num erro de negócio, quando a constraint é conhecida.
pub(crate) fn map_unique_violation<F>(e: sqlx::Error, on_unique: F) -> AppError
where
    F: FnOnce(&str) -> Option<AppError>,
{
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() {
            let constraint = db_err.constraint().unwrap_or_default();
            if let Some(mapped) = on_unique(constraint) {
                return mapped;
            }
        }
    }
    e.into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precondition_errors_name_the_item() {
        let err = AppError::InsufficientStock {
            name: "iPhone 15".into(),
            available: 1,
            requested: 2,
        };
        let msg = err.to_string();
        assert!(msg.contains("iPhone 15"));
        assert!(msg.contains("disponível 1"));
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn duplicates_map_to_conflict() {
        assert_eq!(AppError::DuplicateSerial("SN1".into()).status_code(), StatusCode::CONFLICT);
        assert_eq!(AppError::DuplicatePhone("090".into()).status_code(), StatusCode::CONFLICT);
    }

    #[test]
    fn business_errors_are_not_retried() {
        assert!(!AppError::MemberRequiredForGift.is_retryable());
        assert!(!AppError::DatabaseError(sqlx::Error::RowNotFound).is_retryable());
    }
}
