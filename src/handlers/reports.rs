// src/handlers/reports.rs

use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::AuthenticatedActor,
    models::reports::{InventoryValuation, ProfitReport, ReportPeriod},
};

#[utoipa::path(
    get,
    path = "/api/reports/profit",
    tag = "Relatórios",
    params(ReportPeriod),
    responses((status = 200, description = "Lucro bruto dos pedidos finalizados", body = ProfitReport)),
    security(("api_jwt" = []))
)]
pub async fn profit(
    State(app_state): State<AppState>,
    _actor: AuthenticatedActor,
    Query(period): Query<ReportPeriod>,
) -> Result<impl IntoResponse, AppError> {
    if let (Some(from), Some(to)) = (period.from, period.to) {
        if from > to {
            return Err(AppError::BadRequest("o início do período é depois do fim".into()));
        }
    }
    Ok(Json(app_state.report_service.profit(&period).await?))
}

#[utoipa::path(
    get,
    path = "/api/reports/inventory-value",
    tag = "Relatórios",
    responses((status = 200, description = "Valor do estoque pelo custo médio", body = InventoryValuation)),
    security(("api_jwt" = []))
)]
pub async fn inventory_value(
    State(app_state): State<AppState>,
    _actor: AuthenticatedActor,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(app_state.report_service.inventory_value().await?))
}
