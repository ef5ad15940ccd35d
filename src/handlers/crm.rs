// src/handlers/crm.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{error::AppError, validation::validate_not_blank},
    config::AppState,
    middleware::auth::AuthenticatedActor,
    models::crm::{Customer, CustomerUpdate, NewCustomer},
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateCustomerPayload {
    #[validate(custom(function = "validate_not_blank"))]
    #[schema(example = "Trần Thị B")]
    pub name: String,

    #[validate(length(min = 8, max = 20, message = "Telefone inválido."))]
    #[schema(example = "0912345678")]
    pub phone: String,

    #[validate(email(message = "E-mail inválido."))]
    pub email: Option<String>,
    pub address: Option<String>,
}

#[utoipa::path(
    post,
    path = "/api/customers",
    tag = "Clientes",
    request_body = CreateCustomerPayload,
    responses(
        (status = 201, description = "Cliente cadastrado", body = Customer),
        (status = 409, description = "Telefone já cadastrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_customer(
    State(app_state): State<AppState>,
    _actor: AuthenticatedActor,
    Json(payload): Json<CreateCustomerPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let customer = app_state
        .crm_service
        .create_customer(&NewCustomer {
            name: payload.name.trim().to_string(),
            phone: payload.phone,
            email: payload.email,
            address: payload.address,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(customer)))
}

#[utoipa::path(
    get,
    path = "/api/customers",
    tag = "Clientes",
    responses((status = 200, description = "Clientes", body = Vec<Customer>)),
    security(("api_jwt" = []))
)]
pub async fn list_customers(
    State(app_state): State<AppState>,
    _actor: AuthenticatedActor,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(app_state.crm_service.list_customers().await?))
}

#[utoipa::path(
    get,
    path = "/api/customers/{id}",
    tag = "Clientes",
    params(("id" = Uuid, Path, description = "ID do cliente")),
    responses(
        (status = 200, description = "Cliente", body = Customer),
        (status = 404, description = "Cliente não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_customer(
    State(app_state): State<AppState>,
    _actor: AuthenticatedActor,
    Path(customer_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(app_state.crm_service.get_customer(customer_id).await?))
}

#[utoipa::path(
    get,
    path = "/api/customers/by-phone/{phone}",
    tag = "Clientes",
    params(("phone" = String, Path, description = "Telefone do cliente")),
    responses(
        (status = 200, description = "Cliente", body = Customer),
        (status = 404, description = "Cliente não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn find_by_phone(
    State(app_state): State<AppState>,
    _actor: AuthenticatedActor,
    Path(phone): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(app_state.crm_service.find_by_phone(&phone).await?))
}

/// Pontos e gasto acumulado não são editáveis.
#[utoipa::path(
    patch,
    path = "/api/customers/{id}",
    tag = "Clientes",
    params(("id" = Uuid, Path, description = "ID do cliente")),
    request_body = CustomerUpdate,
    responses(
        (status = 200, description = "Cliente atualizado", body = Customer),
        (status = 404, description = "Cliente não encontrado"),
        (status = 409, description = "Telefone já cadastrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_customer(
    State(app_state): State<AppState>,
    _actor: AuthenticatedActor,
    Path(customer_id): Path<Uuid>,
    Json(payload): Json<CustomerUpdate>,
) -> Result<impl IntoResponse, AppError> {
    if payload.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
        return Err(AppError::BadRequest("o nome não pode ficar em branco".into()));
    }
    Ok(Json(app_state.crm_service.update_customer(customer_id, &payload).await?))
}
