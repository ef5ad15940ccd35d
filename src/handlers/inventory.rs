// src/handlers/inventory.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::{
    common::{
        error::AppError,
        validation::{validate_not_blank, validate_not_negative},
    },
    config::AppState,
    middleware::auth::AuthenticatedActor,
    models::inventory::{
        Category, InventoryTransaction, LowStockEntry, NewProduct, Product, ProductKind,
        ProductUpdate, StockVoucherLine, StockVoucherResult, StockVoucherType, Supplier,
        SupplierUpdate, VoucherMetadata,
    },
};

fn validate_percentage(val: &Decimal) -> Result<(), ValidationError> {
    if *val < Decimal::ZERO || *val > Decimal::from(100) {
        let mut err = ValidationError::new("range");
        err.message = Some("A alíquota deve ficar entre 0 e 100.".into());
        return Err(err);
    }
    Ok(())
}

// ---
// Payload: CreateProduct
// ---
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductPayload {
    #[validate(custom(function = "validate_not_blank"))]
    #[schema(example = "IP15-128-BLK")]
    pub sku: String,

    #[validate(custom(function = "validate_not_blank"))]
    #[schema(example = "iPhone 15 128GB")]
    pub name: String,

    pub category_id: Option<Uuid>,

    #[validate(custom(function = "validate_not_negative"))]
    pub sale_price: Decimal,

    // Estoque que já existe na loja no momento do cadastro
    #[validate(range(min = 0, message = "O estoque inicial não pode ser negativo."))]
    #[serde(default)]
    pub initial_stock: i32,

    #[validate(custom(function = "validate_not_negative"))]
    #[serde(default)]
    pub initial_cost: Decimal,

    #[validate(range(min = 0))]
    #[serde(default)]
    pub min_stock: i32,

    #[serde(default = "default_unit")]
    pub unit: String,

    #[serde(default = "default_kind")]
    pub kind: ProductKind,

    #[validate(range(min = 0, max = 120))]
    #[serde(default)]
    pub warranty_months: i32,

    #[serde(default)]
    pub is_serialized: bool,

    #[validate(custom(function = "validate_percentage"))]
    #[serde(default)]
    pub vat_rate: Decimal,
}

fn default_unit() -> String {
    "cái".to_string()
}

fn default_kind() -> ProductKind {
    ProductKind::Product
}

impl CreateProductPayload {
    fn into_parts(self) -> (NewProduct, i32, Decimal) {
        let product = NewProduct {
            sku: self.sku.trim().to_string(),
            name: self.name.trim().to_string(),
            category_id: self.category_id,
            sale_price: self.sale_price,
            min_stock: self.min_stock,
            unit: self.unit,
            kind: self.kind,
            warranty_months: self.warranty_months,
            is_serialized: self.is_serialized,
            vat_rate: self.vat_rate,
        };
        (product, self.initial_stock, self.initial_cost)
    }
}

#[utoipa::path(
    post,
    path = "/api/inventory/products",
    tag = "Estoque",
    request_body = CreateProductPayload,
    responses(
        (status = 201, description = "Produto criado", body = Product),
        (status = 400, description = "Dados inválidos"),
        (status = 409, description = "SKU já existe")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_product(
    State(app_state): State<AppState>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Json(payload): Json<CreateProductPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let (product, initial_stock, initial_cost) = payload.into_parts();
    let product = app_state
        .inventory_service
        .create_product(&product, initial_stock, initial_cost, &actor)
        .await?;

    Ok((StatusCode::CREATED, Json(product)))
}

#[utoipa::path(
    get,
    path = "/api/inventory/products",
    tag = "Estoque",
    responses((status = 200, description = "Produtos", body = Vec<Product>)),
    security(("api_jwt" = []))
)]
pub async fn get_all_products(
    State(app_state): State<AppState>,
    _actor: AuthenticatedActor,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(app_state.inventory_service.get_all_products().await?))
}

#[utoipa::path(
    get,
    path = "/api/inventory/products/{id}",
    tag = "Estoque",
    params(("id" = Uuid, Path, description = "ID do produto")),
    responses(
        (status = 200, description = "Produto", body = Product),
        (status = 404, description = "Produto não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_product(
    State(app_state): State<AppState>,
    _actor: AuthenticatedActor,
    Path(product_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(app_state.inventory_service.get_product(product_id).await?))
}

/// Estoque e custo não são editáveis aqui: só mudam por documento de estoque ou venda.
#[utoipa::path(
    patch,
    path = "/api/inventory/products/{id}",
    tag = "Estoque",
    params(("id" = Uuid, Path, description = "ID do produto")),
    request_body = ProductUpdate,
    responses(
        (status = 200, description = "Produto atualizado", body = Product),
        (status = 404, description = "Produto não encontrado"),
        (status = 409, description = "SKU já existe")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_product(
    State(app_state): State<AppState>,
    _actor: AuthenticatedActor,
    Path(product_id): Path<Uuid>,
    Json(payload): Json<ProductUpdate>,
) -> Result<impl IntoResponse, AppError> {
    if payload.sale_price.is_some_and(|p| p < Decimal::ZERO)
        || payload.min_stock.is_some_and(|m| m < 0)
        || payload.warranty_months.is_some_and(|m| m < 0)
    {
        return Err(AppError::BadRequest("valores negativos não são permitidos".into()));
    }
    if let Some(rate) = &payload.vat_rate {
        validate_percentage(rate).map_err(|_| AppError::BadRequest("alíquota inválida".into()))?;
    }

    Ok(Json(app_state.inventory_service.update_product(product_id, &payload).await?))
}

#[utoipa::path(
    delete,
    path = "/api/inventory/products/{id}",
    tag = "Estoque",
    params(("id" = Uuid, Path, description = "ID do produto")),
    responses(
        (status = 204, description = "Produto apagado"),
        (status = 404, description = "Produto não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_product(
    State(app_state): State<AppState>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path(product_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    app_state.inventory_service.delete_product(product_id, &actor).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/inventory/products/low-stock",
    tag = "Estoque",
    responses((status = 200, description = "Produtos no limite mínimo ou abaixo", body = Vec<LowStockEntry>)),
    security(("api_jwt" = []))
)]
pub async fn get_low_stock(
    State(app_state): State<AppState>,
    _actor: AuthenticatedActor,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(app_state.inventory_service.get_low_stock().await?))
}

// ---
// Categorias
// ---
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateCategoryPayload {
    #[validate(custom(function = "validate_not_blank"))]
    #[schema(example = "Phụ kiện")]
    pub name: String,
    pub description: Option<String>,
}

#[utoipa::path(
    post,
    path = "/api/inventory/categories",
    tag = "Estoque",
    request_body = CreateCategoryPayload,
    responses(
        (status = 201, description = "Categoria criada", body = Category),
        (status = 409, description = "Nome já existe")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_category(
    State(app_state): State<AppState>,
    _actor: AuthenticatedActor,
    Json(payload): Json<CreateCategoryPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let category = app_state
        .inventory_service
        .create_category(&payload.name, payload.description.as_deref())
        .await?;
    Ok((StatusCode::CREATED, Json(category)))
}

#[utoipa::path(
    get,
    path = "/api/inventory/categories",
    tag = "Estoque",
    responses((status = 200, description = "Categorias", body = Vec<Category>)),
    security(("api_jwt" = []))
)]
pub async fn get_all_categories(
    State(app_state): State<AppState>,
    _actor: AuthenticatedActor,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(app_state.inventory_service.get_all_categories().await?))
}

// ---
// Fornecedores
// ---
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateSupplierPayload {
    #[validate(custom(function = "validate_not_blank"))]
    #[schema(example = "Digiworld")]
    pub name: String,
    pub phone: Option<String>,
    #[validate(email(message = "E-mail inválido."))]
    pub email: Option<String>,
    pub address: Option<String>,
    pub note: Option<String>,
}

#[utoipa::path(
    post,
    path = "/api/inventory/suppliers",
    tag = "Estoque",
    request_body = CreateSupplierPayload,
    responses(
        (status = 201, description = "Fornecedor criado", body = Supplier),
        (status = 409, description = "Nome já existe")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_supplier(
    State(app_state): State<AppState>,
    _actor: AuthenticatedActor,
    Json(payload): Json<CreateSupplierPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let supplier = app_state
        .inventory_service
        .create_supplier(
            &payload.name,
            payload.phone.as_deref(),
            payload.email.as_deref(),
            payload.address.as_deref(),
            payload.note.as_deref(),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(supplier)))
}

#[utoipa::path(
    get,
    path = "/api/inventory/suppliers",
    tag = "Estoque",
    responses((status = 200, description = "Fornecedores", body = Vec<Supplier>)),
    security(("api_jwt" = []))
)]
pub async fn get_all_suppliers(
    State(app_state): State<AppState>,
    _actor: AuthenticatedActor,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(app_state.inventory_service.get_all_suppliers().await?))
}

#[utoipa::path(
    patch,
    path = "/api/inventory/suppliers/{id}",
    tag = "Estoque",
    params(("id" = Uuid, Path, description = "ID do fornecedor")),
    request_body = SupplierUpdate,
    responses(
        (status = 200, description = "Fornecedor atualizado", body = Supplier),
        (status = 404, description = "Fornecedor não encontrado"),
        (status = 409, description = "Nome já existe")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_supplier(
    State(app_state): State<AppState>,
    _actor: AuthenticatedActor,
    Path(supplier_id): Path<Uuid>,
    Json(payload): Json<SupplierUpdate>,
) -> Result<impl IntoResponse, AppError> {
    if payload.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
        return Err(AppError::BadRequest("o nome não pode ficar em branco".into()));
    }
    Ok(Json(app_state.inventory_service.update_supplier(supplier_id, &payload).await?))
}

// ---
// Documentos de estoque (entrada / saída / descarte / uso interno)
// ---
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StockVoucherPayload {
    pub voucher_type: StockVoucherType,

    #[validate(length(min = 1, message = "O documento precisa de pelo menos uma linha."))]
    #[validate(nested)]
    pub lines: Vec<StockVoucherLine>,

    pub supplier_name: Option<String>,
    pub receiver_name: Option<String>,
    pub reference_number: Option<String>,
    pub reference_date: Option<NaiveDate>,
    pub note: Option<String>,
}

impl StockVoucherPayload {
    fn metadata(&self) -> VoucherMetadata {
        VoucherMetadata {
            supplier_name: self.supplier_name.clone(),
            receiver_name: self.receiver_name.clone(),
            reference_number: self.reference_number.clone(),
            reference_date: self.reference_date,
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/inventory/vouchers",
    tag = "Estoque",
    request_body = StockVoucherPayload,
    responses(
        (status = 201, description = "Documento gravado", body = StockVoucherResult),
        (status = 404, description = "Produto não encontrado"),
        (status = 422, description = "Estoque insuficiente")
    ),
    security(("api_jwt" = []))
)]
pub async fn save_stock_voucher(
    State(app_state): State<AppState>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Json(payload): Json<StockVoucherPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let result = app_state
        .stock_voucher_service
        .save_stock_voucher(
            payload.voucher_type,
            &payload.lines,
            &payload.metadata(),
            payload.note.as_deref(),
            &actor,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(result)))
}

#[utoipa::path(
    get,
    path = "/api/inventory/transactions",
    tag = "Estoque",
    responses((status = 200, description = "Livro-razão, mais recente primeiro", body = Vec<InventoryTransaction>)),
    security(("api_jwt" = []))
)]
pub async fn get_transactions(
    State(app_state): State<AppState>,
    _actor: AuthenticatedActor,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(app_state.inventory_service.get_transactions().await?))
}

#[utoipa::path(
    get,
    path = "/api/inventory/vouchers/{code}",
    tag = "Estoque",
    params(("code" = String, Path, description = "Código do documento, ex: PN26-00000001")),
    responses(
        (status = 200, description = "Linhas do documento", body = Vec<InventoryTransaction>),
        (status = 404, description = "Documento não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_voucher(
    State(app_state): State<AppState>,
    _actor: AuthenticatedActor,
    Path(code): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(app_state.inventory_service.get_voucher(&code).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn product_payload_defaults() {
        let payload: CreateProductPayload = serde_json::from_value(serde_json::json!({
            "sku": "CAB-USBC",
            "name": "Cáp USB-C",
            "salePrice": 99000
        }))
        .unwrap();

        assert!(payload.validate().is_ok());
        assert_eq!(payload.unit, "cái");
        assert_eq!(payload.kind, ProductKind::Product);
        assert_eq!(payload.initial_stock, 0);
    }

    #[test]
    fn negative_initial_stock_is_invalid() {
        let payload: CreateProductPayload = serde_json::from_value(serde_json::json!({
            "sku": "X",
            "name": "Y",
            "salePrice": 1,
            "initialStock": -3
        }))
        .unwrap();

        let errors = payload.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("initial_stock"));
    }

    #[test]
    fn voucher_payload_validates_lines() {
        let payload: StockVoucherPayload = serde_json::from_value(serde_json::json!({
            "voucherType": "export",
            "lines": [{ "productId": Uuid::nil(), "quantity": 0 }]
        }))
        .unwrap();
        assert!(payload.validate().is_err());

        let empty: StockVoucherPayload = serde_json::from_value(serde_json::json!({
            "voucherType": "import",
            "lines": []
        }))
        .unwrap();
        assert!(empty.validate().is_err());
    }

    #[test]
    fn voucher_line_quantity_has_an_upper_bound() {
        let payload: StockVoucherPayload = serde_json::from_value(serde_json::json!({
            "voucherType": "import",
            "lines": [{ "productId": Uuid::nil(), "quantity": i32::MAX, "unitPrice": 200 }]
        }))
        .unwrap();
        assert!(payload.validate().is_err());
    }
}
