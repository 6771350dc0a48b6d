pub mod rule_repository;

pub use rule_repository::{MySqlRuleRepository, RuleRepository};
