pub mod inventory_repo;
pub use inventory_repo::InventoryRepository;
pub mod crm_repo;
pub use crm_repo::CrmRepository;
pub mod order_repo;
pub use order_repo::OrderRepository;
pub mod gift_repo;
pub use gift_repo::GiftRepository;
pub mod warranty_repo;
pub use warranty_repo::WarrantyRepository;
pub mod counter_repo;
pub use counter_repo::CounterRepository;
