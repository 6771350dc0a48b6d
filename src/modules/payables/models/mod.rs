pub mod payable;

pub use payable::{CostType, EmittedPayable, PayableRequest, COMMISSION_PERIOD_ORIGIN};
