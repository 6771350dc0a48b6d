pub mod commission_rule;

pub use commission_rule::{
    CalculationBase, CommissionRule, CommissionType, CreateRuleRequest, UpdateRuleRequest,
};
