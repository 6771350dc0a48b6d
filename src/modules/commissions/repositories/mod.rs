pub mod commission_item_repository;

pub use commission_item_repository::{CommissionItemRepository, MySqlCommissionItemRepository};
