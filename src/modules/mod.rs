pub mod advances;
pub mod commissions;
pub mod payables;
pub mod periods;
pub mod professionals;
pub mod rules;
