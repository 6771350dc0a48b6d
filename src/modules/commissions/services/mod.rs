pub mod commission_calculator;
pub mod commission_item_service;

pub use commission_calculator::CommissionCalculator;
pub use commission_item_service::CommissionItemService;
