pub mod models;
pub mod repositories;
pub mod services;

pub use models::{CommissionPeriod, CreatePeriodRequest, PeriodFilter, PeriodStatus};
pub use repositories::{MySqlPeriodRepository, PeriodRepository};
pub use services::{ClosePeriodOutcome, PeriodService, ReconcileOutcome};
