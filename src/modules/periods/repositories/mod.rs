pub mod period_repository;

pub use period_repository::{MySqlPeriodRepository, PeriodRepository};
