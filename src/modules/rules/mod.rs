pub mod models;
pub mod repositories;
pub mod services;

pub use models::{CalculationBase, CommissionRule, CommissionType};
pub use repositories::{MySqlRuleRepository, RuleRepository};
pub use services::{ResolvedRule, RuleResolver, RuleService};
