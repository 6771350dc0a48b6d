pub mod rule_resolver;
pub mod rule_service;

pub use rule_resolver::{ResolvedRule, RuleResolver};
pub use rule_service::RuleService;
