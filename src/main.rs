//src/main.rs

use anyhow::Context;
use axum::{
    routing::{get, patch, post},
    Router,
};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod middleware;
mod models;
mod services;

use crate::config::{AppState, Settings};
use crate::docs::ApiDoc;

fn router(app_state: AppState) -> Router {
    let order_routes = Router::new()
        .route("/"
               ,post(handlers::orders::save_order)
               .get(handlers::orders::list_orders)
        )
        .route("/{id}"
               ,get(handlers::orders::get_order)
               .delete(handlers::orders::purge_order)
        )
        .route("/{id}/cancel", post(handlers::orders::cancel_order));

    let inventory_routes = Router::new()
        .route("/products"
               ,post(handlers::inventory::create_product)
               .get(handlers::inventory::get_all_products)
        )
        .route("/products/low-stock", get(handlers::inventory::get_low_stock))
        .route("/products/{id}"
               ,get(handlers::inventory::get_product)
               .patch(handlers::inventory::update_product)
               .delete(handlers::inventory::delete_product)
        )
        .route("/categories"
               ,post(handlers::inventory::create_category)
               .get(handlers::inventory::get_all_categories)
        )
        .route("/suppliers"
               ,post(handlers::inventory::create_supplier)
               .get(handlers::inventory::get_all_suppliers)
        )
        .route("/suppliers/{id}", patch(handlers::inventory::update_supplier))
        .route("/vouchers", post(handlers::inventory::save_stock_voucher))
        .route("/vouchers/{code}", get(handlers::inventory::get_voucher))
        .route("/transactions", get(handlers::inventory::get_transactions));

    let customer_routes = Router::new()
        .route("/"
               ,post(handlers::crm::create_customer)
               .get(handlers::crm::list_customers)
        )
        .route("/by-phone/{phone}", get(handlers::crm::find_by_phone))
        .route("/{id}"
               ,get(handlers::crm::get_customer)
               .patch(handlers::crm::update_customer)
        )
        .route("/{id}/orders", get(handlers::orders::get_orders_by_customer));

    let gift_routes = Router::new()
        .route("/"
               ,post(handlers::gifts::create_gift)
               .get(handlers::gifts::list_gifts)
        )
        .route("/{id}", patch(handlers::gifts::update_gift));

    let warranty_routes = Router::new()
        .route("/"
               ,post(handlers::warranties::register_warranty)
               .get(handlers::warranties::list_warranties)
        )
        .route("/serial/{serial}", get(handlers::warranties::find_by_serial))
        .route("/{id}/status", post(handlers::warranties::change_status));

    let report_routes = Router::new()
        .route("/profit", get(handlers::reports::profit))
        .route("/inventory-value", get(handlers::reports::inventory_value));

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/api/health", get(|| async { "OK" }))
        .route("/api/documents/next-number/{type}", get(handlers::documents::next_document_number))
        .route("/api/documents/counters", get(handlers::documents::list_counters))
        .nest("/api/orders", order_routes)
        .nest("/api/inventory", inventory_routes)
        .nest("/api/customers", customer_routes)
        .nest("/api/gifts", gift_routes)
        .nest("/api/warranties", warranty_routes)
        .nest("/api/reports", report_routes)
        .with_state(app_state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logger: RUST_LOG controla o nível (padrão "info")
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    let settings = Settings::from_env()?;

    // Se a configuração falhar, a aplicação não deve iniciar.
    let app_state = AppState::new(&settings)
        .await
        .context("Falha ao inicializar o estado da aplicação.")?;

    // Faz o app rodar as migrações do SQLx na inicialização
    sqlx::migrate!()
        .run(&app_state.db_pool)
        .await
        .context("Falha ao rodar as migrações do banco de dados.")?;

    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

    let app = router(app_state);

    // Inicia o servidor
    let listener = TcpListener::bind(&settings.bind_addr)
        .await
        .with_context(|| format!("Falha ao iniciar o listener TCP em {}", settings.bind_addr))?;
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr()?);

    axum::serve(listener, app)
        .await
        .context("Erro no servidor Axum")?;

    Ok(())
}
