pub mod models;
pub mod repositories;
pub mod services;

pub use models::{CommissionItem, CommissionItemStatus, CommissionSource, CommissionSummary};
pub use repositories::{CommissionItemRepository, MySqlCommissionItemRepository};
pub use services::{CommissionCalculator, CommissionItemService};
