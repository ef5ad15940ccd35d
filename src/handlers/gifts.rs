// src/handlers/gifts.rs

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
    models::gifts::{Gift, GiftUpdate, NewGift},
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateGiftPayload {
    #[validate(custom(function = "validate_not_blank"))]
    pub name: String,

    #[validate(range(min = 1, message = "O custo em pontos deve ser positivo."))]
    #[schema(example = 50)]
    pub points_cost: i64,

    #[validate(range(min = 0))]
    #[serde(default)]
    pub stock: i32,

    // Produto do estoque que sai junto com o brinde
    pub product_id: Option<Uuid>,
}

#[utoipa::path(
    post,
    path = "/api/gifts",
    tag = "Brindes",
    request_body = CreateGiftPayload,
    responses(
        (status = 201, description = "Brinde criado", body = Gift),
        (status = 404, description = "Produto vinculado não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_gift(
    State(app_state): State<AppState>,
    _actor: AuthenticatedActor,
    Json(payload): Json<CreateGiftPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let gift = app_state
        .gift_service
        .create_gift(&NewGift {
            name: payload.name.trim().to_string(),
            points_cost: payload.points_cost,
            stock: payload.stock,
            product_id: payload.product_id,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(gift)))
}

#[utoipa::path(
    get,
    path = "/api/gifts",
    tag = "Brindes",
    responses((status = 200, description = "Brindes", body = Vec<Gift>)),
    security(("api_jwt" = []))
)]
pub async fn list_gifts(
    State(app_state): State<AppState>,
    _actor: AuthenticatedActor,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(app_state.gift_service.list_gifts().await?))
}

#[utoipa::path(
    patch,
    path = "/api/gifts/{id}",
    tag = "Brindes",
    params(("id" = Uuid, Path, description = "ID do brinde")),
    request_body = GiftUpdate,
    responses(
        (status = 200, description = "Brinde atualizado", body = Gift),
        (status = 404, description = "Brinde não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_gift(
    State(app_state): State<AppState>,
    _actor: AuthenticatedActor,
    Path(gift_id): Path<Uuid>,
    Json(payload): Json<GiftUpdate>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(app_state.gift_service.update_gift(gift_id, &payload).await?))
}
