pub mod crm;
pub mod documents;
pub mod gifts;
pub mod inventory;
pub mod orders;
pub mod reports;
pub mod warranties;
