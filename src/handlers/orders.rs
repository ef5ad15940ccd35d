// src/handlers/orders.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::AuthenticatedActor,
    models::orders::{Order, OrderDraft},
};

#[utoipa::path(
    post,
    path = "/api/orders",
    tag = "Pedidos",
    request_body = OrderDraft,
    responses(
        (status = 201, description = "Pedido finalizado", body = Order),
        (status = 400, description = "Dados inválidos"),
        (status = 404, description = "Produto, brinde ou cliente não encontrado"),
        (status = 409, description = "Número de série já em garantia ativa"),
        (status = 422, description = "Estoque ou pontos insuficientes")
    ),
    security(("api_jwt" = []))
)]
pub async fn save_order(
    State(app_state): State<AppState>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Json(payload): Json<OrderDraft>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let order = app_state.order_service.save_order(&payload, &actor).await?;

    Ok((StatusCode::CREATED, Json(order)))
}

#[utoipa::path(
    post,
    path = "/api/orders/{id}/cancel",
    tag = "Pedidos",
    params(("id" = Uuid, Path, description = "ID do pedido")),
    responses(
        (status = 200, description = "Pedido cancelado (ou já estava)", body = bool),
        (status = 404, description = "Pedido não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn cancel_order(
    State(app_state): State<AppState>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path(order_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let ok = app_state.order_service.cancel_order(order_id, &actor).await?;
    Ok(Json(ok))
}

#[utoipa::path(
    delete,
    path = "/api/orders/{id}",
    tag = "Pedidos",
    params(("id" = Uuid, Path, description = "ID do pedido")),
    responses(
        (status = 204, description = "Pedido apagado (sem reverter efeitos)"),
        (status = 403, description = "Apenas administradores"),
        (status = 404, description = "Pedido não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn purge_order(
    State(app_state): State<AppState>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path(order_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    app_state.order_service.purge_order(order_id, &actor).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/orders",
    tag = "Pedidos",
    responses(
        (status = 200, description = "Pedidos, mais recentes primeiro", body = Vec<Order>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_orders(
    State(app_state): State<AppState>,
    _actor: AuthenticatedActor,
) -> Result<impl IntoResponse, AppError> {
    let orders = app_state.order_service.list_orders().await?;
    Ok(Json(orders))
}

#[utoipa::path(
    get,
    path = "/api/orders/{id}",
    tag = "Pedidos",
    params(("id" = Uuid, Path, description = "ID do pedido")),
    responses(
        (status = 200, description = "Pedido", body = Order),
        (status = 404, description = "Pedido não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_order(
    State(app_state): State<AppState>,
    _actor: AuthenticatedActor,
    Path(order_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let order = app_state.order_service.get_order(order_id).await?;
    Ok(Json(order))
}

#[utoipa::path(
    get,
    path = "/api/customers/{id}/orders",
    tag = "Pedidos",
    params(("id" = Uuid, Path, description = "ID do cliente")),
    responses(
        (status = 200, description = "Histórico de compras do cliente", body = Vec<Order>)
    ),
    security(("api_jwt" = []))
)]
pub async fn get_orders_by_customer(
    State(app_state): State<AppState>,
    _actor: AuthenticatedActor,
    Path(customer_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let orders = app_state.order_service.get_orders_by_customer(customer_id).await?;
    Ok(Json(orders))
}
