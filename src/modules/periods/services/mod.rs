pub mod period_service;

pub use period_service::{ClosePeriodOutcome, PeriodService, ReconcileOutcome};
