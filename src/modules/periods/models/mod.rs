pub mod commission_period;

pub use commission_period::{
    ClosePeriodCommand, ClosedPeriod, CommissionPeriod, CreatePeriodRequest, PeriodFilter,
    PeriodStatus,
};
