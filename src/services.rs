pub mod counter_service;
pub mod crm_service;
pub mod gift_service;
pub mod inventory_service;
pub mod order_service;
pub mod report_service;
pub mod stock_ledger;
pub mod stock_voucher_service;
pub mod warranty_service;
