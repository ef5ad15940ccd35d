// src/handlers/warranties.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{error::AppError, validation::validate_not_blank},
    config::AppState,
    middleware::auth::AuthenticatedActor,
    models::warranty::{WarrantyItem, WarrantyStatus},
    services::warranty_service::ManualWarranty,
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterWarrantyPayload {
    #[validate(custom(function = "validate_not_blank"))]
    #[schema(example = "SN123456789")]
    pub serial_number: String,
    pub product_id: Uuid,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub purchase_date: Option<DateTime<Utc>>,
    // Sem valor, usa os meses de garantia do produto
    #[validate(range(min = 1, max = 120))]
    pub warranty_months: Option<i32>,
    pub note: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChangeWarrantyStatusPayload {
    pub status: WarrantyStatus,
    pub note: Option<String>,
}

#[utoipa::path(
    post,
    path = "/api/warranties",
    tag = "Garantias",
    request_body = RegisterWarrantyPayload,
    responses(
        (status = 201, description = "Garantia registrada", body = WarrantyItem),
        (status = 404, description = "Produto não encontrado"),
        (status = 409, description = "Número de série já em garantia ativa")
    ),
    security(("api_jwt" = []))
)]
pub async fn register_warranty(
    State(app_state): State<AppState>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Json(payload): Json<RegisterWarrantyPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let item = app_state
        .warranty_service
        .register(
            &ManualWarranty {
                serial_number: payload.serial_number,
                product_id: payload.product_id,
                customer_name: payload.customer_name,
                customer_phone: payload.customer_phone,
                purchase_date: payload.purchase_date,
                warranty_months: payload.warranty_months,
                note: payload.note,
            },
            &actor,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(item)))
}

#[utoipa::path(
    get,
    path = "/api/warranties",
    tag = "Garantias",
    responses((status = 200, description = "Garantias", body = Vec<WarrantyItem>)),
    security(("api_jwt" = []))
)]
pub async fn list_warranties(
    State(app_state): State<AppState>,
    _actor: AuthenticatedActor,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(app_state.warranty_service.list_warranties().await?))
}

#[utoipa::path(
    get,
    path = "/api/warranties/serial/{serial}",
    tag = "Garantias",
    params(("serial" = String, Path, description = "Número de série")),
    responses(
        (status = 200, description = "Histórico de garantias do serial", body = Vec<WarrantyItem>),
        (status = 404, description = "Nenhuma garantia para o serial")
    ),
    security(("api_jwt" = []))
)]
pub async fn find_by_serial(
    State(app_state): State<AppState>,
    _actor: AuthenticatedActor,
    Path(serial): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(app_state.warranty_service.find_by_serial(&serial).await?))
}

#[utoipa::path(
    post,
    path = "/api/warranties/{id}/status",
    tag = "Garantias",
    params(("id" = Uuid, Path, description = "ID da garantia")),
    request_body = ChangeWarrantyStatusPayload,
    responses(
        (status = 200, description = "Status alterado", body = WarrantyItem),
        (status = 404, description = "Garantia não encontrada"),
        (status = 422, description = "Transição não permitida")
    ),
    security(("api_jwt" = []))
)]
pub async fn change_status(
    State(app_state): State<AppState>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path(warranty_id): Path<Uuid>,
    Json(payload): Json<ChangeWarrantyStatusPayload>,
) -> Result<impl IntoResponse, AppError> {
    let item = app_state
        .warranty_service
        .change_status(warranty_id, payload.status, payload.note.as_deref(), &actor)
        .await?;
    Ok(Json(item))
}
