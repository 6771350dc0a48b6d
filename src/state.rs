use sqlx::MySqlPool;
use std::sync::Arc;

use crate::config::CommissionSettings;
use crate::modules::advances::{AdvanceService, MySqlAdvanceRepository};
use crate::modules::commissions::{CommissionItemService, MySqlCommissionItemRepository};
use crate::modules::payables::MySqlPayableEmitter;
use crate::modules::periods::{MySqlPeriodRepository, PeriodService};
use crate::modules::professionals::MySqlProfessionalDirectory;
use crate::modules::rules::{MySqlRuleRepository, RuleResolver, RuleService};

/// Use-case services wired onto the MySQL adapters
#[derive(Clone)]
pub struct AppState {
    pub pool: MySqlPool,
    pub rules: Arc<RuleService>,
    pub resolver: Arc<RuleResolver>,
    pub advances: Arc<AdvanceService>,
    pub items: Arc<CommissionItemService>,
    pub periods: Arc<PeriodService>,
}

impl AppState {
    pub fn new(pool: MySqlPool, settings: CommissionSettings) -> Self {
        let rule_repo = Arc::new(MySqlRuleRepository::new(pool.clone()));
        let advance_repo = Arc::new(MySqlAdvanceRepository::new(pool.clone()));
        let item_repo = Arc::new(MySqlCommissionItemRepository::new(pool.clone()));
        let period_repo = Arc::new(MySqlPeriodRepository::new(pool.clone()));
        let payables = Arc::new(MySqlPayableEmitter::new(pool.clone()));
        let professionals = Arc::new(MySqlProfessionalDirectory::new(pool.clone()));

        let resolver = Arc::new(RuleResolver::new(rule_repo.clone()));

        Self {
            rules: Arc::new(RuleService::new(rule_repo)),
            advances: Arc::new(AdvanceService::new(advance_repo.clone())),
            items: Arc::new(CommissionItemService::new(item_repo, resolver.clone())),
            periods: Arc::new(PeriodService::new(
                period_repo,
                advance_repo,
                payables,
                professionals,
                settings,
            )),
            resolver,
            pool,
        }
    }
}
