// src/handlers/documents.rs

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::AuthenticatedActor,
    models::documents::{Counter, DocumentNumber, DocumentType},
};

/// Consome o próximo número da sequência (cada chamada gasta um número).
#[utoipa::path(
    get,
    path = "/api/documents/next-number/{type}",
    tag = "Documentos",
    params(("type" = DocumentType, Path, description = "invoice | import | export | scrap | internal | production")),
    responses(
        (status = 200, description = "Número alocado", body = DocumentNumber)
    ),
    security(("api_jwt" = []))
)]
pub async fn next_document_number(
    State(app_state): State<AppState>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path(doc_type): Path<DocumentType>,
) -> Result<impl IntoResponse, AppError> {
    let code = app_state.counter_service.next_document_number(doc_type).await?;
    tracing::info!(actor = %actor.name, code = %code, "Número de documento alocado");
    Ok(Json(DocumentNumber { code }))
}

#[utoipa::path(
    get,
    path = "/api/documents/counters",
    tag = "Documentos",
    responses((status = 200, description = "Último número usado por tipo", body = Vec<Counter>)),
    security(("api_jwt" = []))
)]
pub async fn list_counters(
    State(app_state): State<AppState>,
    _actor: AuthenticatedActor,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(app_state.counter_service.list_counters().await?))
}
