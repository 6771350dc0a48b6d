pub mod models;
pub mod repositories;
pub mod services;

pub use models::{Advance, AdvanceFilter, AdvanceStatus, CreateAdvanceRequest};
pub use repositories::{AdvanceRepository, MySqlAdvanceRepository};
pub use services::AdvanceService;
