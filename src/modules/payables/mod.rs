pub mod models;
pub mod repositories;

pub use models::{CostType, EmittedPayable, PayableRequest, COMMISSION_PERIOD_ORIGIN};
pub use repositories::{MySqlPayableEmitter, PayableEmitter};
