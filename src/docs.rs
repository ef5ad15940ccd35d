// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Pedidos ---
        handlers::orders::save_order,
        handlers::orders::cancel_order,
        handlers::orders::purge_order,
        handlers::orders::list_orders,
        handlers::orders::get_order,
        handlers::orders::get_orders_by_customer,

        // --- Documentos ---
        handlers::documents::next_document_number,
        handlers::documents::list_counters,

        // --- Estoque ---
        handlers::inventory::create_product,
        handlers::inventory::get_all_products,
        handlers::inventory::get_product,
        handlers::inventory::update_product,
        handlers::inventory::delete_product,
        handlers::inventory::get_low_stock,
        handlers::inventory::create_category,
        handlers::inventory::get_all_categories,
        handlers::inventory::create_supplier,
        handlers::inventory::get_all_suppliers,
        handlers::inventory::update_supplier,
        handlers::inventory::save_stock_voucher,
        handlers::inventory::get_transactions,
        handlers::inventory::get_voucher,

        // --- Clientes ---
        handlers::crm::create_customer,
        handlers::crm::list_customers,
        handlers::crm::get_customer,
        handlers::crm::find_by_phone,
        handlers::crm::update_customer,

        // --- Brindes ---
        handlers::gifts::create_gift,
        handlers::gifts::list_gifts,
        handlers::gifts::update_gift,

        // --- Garantias ---
        handlers::warranties::register_warranty,
        handlers::warranties::list_warranties,
        handlers::warranties::find_by_serial,
        handlers::warranties::change_status,

        // --- Relatórios ---
        handlers::reports::profit,
        handlers::reports::inventory_value,
    ),
    components(
        schemas(
            // --- Pedidos ---
            models::orders::OrderStatus,
            models::orders::PaymentMethod,
            models::orders::OrderLine,
            models::orders::Order,
            models::orders::OrderLineDraft,
            models::orders::OrderDraft,
            models::orders::OrderTotals,

            // --- Documentos ---
            models::documents::DocumentType,
            models::documents::DocumentNumber,
            models::documents::Counter,

            // --- Estoque ---
            models::inventory::Category,
            models::inventory::ProductKind,
            models::inventory::Product,
            models::inventory::ProductUpdate,
            models::inventory::Supplier,
            models::inventory::SupplierUpdate,
            models::inventory::MovementType,
            models::inventory::InventoryTransaction,
            models::inventory::StockVoucherType,
            models::inventory::StockVoucherLine,
            models::inventory::StockVoucherResult,
            models::inventory::LowStockEntry,

            // --- Clientes / Brindes / Garantias ---
            models::crm::Customer,
            models::crm::CustomerUpdate,
            models::gifts::Gift,
            models::gifts::GiftUpdate,
            models::warranty::WarrantyStatus,
            models::warranty::WarrantyHistoryEntry,
            models::warranty::WarrantyItem,

            // --- Relatórios ---
            models::reports::ProfitReport,
            models::reports::InventoryValuation,

            // --- Payloads ---
            handlers::inventory::CreateProductPayload,
            handlers::inventory::CreateCategoryPayload,
            handlers::inventory::CreateSupplierPayload,
            handlers::inventory::StockVoucherPayload,
            handlers::crm::CreateCustomerPayload,
            handlers::gifts::CreateGiftPayload,
            handlers::warranties::RegisterWarrantyPayload,
            handlers::warranties::ChangeWarrantyStatusPayload,
        )
    ),
    tags(
        (name = "Pedidos", description = "Venda, cancelamento e histórico"),
        (name = "Documentos", description = "Numeração de documentos"),
        (name = "Estoque", description = "Produtos, fornecedores e livro-razão"),
        (name = "Clientes", description = "Cadastro e fidelidade"),
        (name = "Brindes", description = "Catálogo de brindes por pontos"),
        (name = "Garantias", description = "Garantias por número de série"),
        (name = "Relatórios", description = "Lucro e valor do estoque")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}
