use chrono::NaiveDate;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::core::{AppError, Result};
use crate::modules::commissions::models::CommissionSource;
use crate::modules::rules::models::CommissionRule;
use crate::modules::rules::repositories::RuleRepository;

/// Rule chosen for a commissionable line and how it was chosen
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRule {
    pub rule: CommissionRule,
    pub source: CommissionSource,
}

/// Answers "which rule applies to this unit/tenant on this date"
///
/// Unit-scoped rules win over global ones; within one scope the store's
/// precedence order applies (priority ascending, newest first on ties).
/// Pure read: never writes.
pub struct RuleResolver {
    rules: Arc<dyn RuleRepository>,
}

impl RuleResolver {
    pub fn new(rules: Arc<dyn RuleRepository>) -> Self {
        Self { rules }
    }

    /// Resolve the effective rule, `None` when nothing applies
    pub async fn resolve(
        &self,
        tenant_id: Uuid,
        unit_id: Option<Uuid>,
        date: NaiveDate,
    ) -> Result<Option<CommissionRule>> {
        if let Some(unit_id) = unit_id {
            let unit_rules = self
                .rules
                .find_effective_by_unit(tenant_id, unit_id, date)
                .await?;
            if let Some(rule) = pick_most_specific(unit_rules, date) {
                debug!(
                    tenant_id = %tenant_id,
                    unit_id = %unit_id,
                    rule_id = %rule.id,
                    %date,
                    "Resolved unit-scoped commission rule"
                );
                return Ok(Some(rule));
            }
        }

        let global_rules = self.rules.find_effective_global(tenant_id, date).await?;
        let resolved = pick_most_specific(global_rules, date);

        match &resolved {
            Some(rule) => debug!(
                tenant_id = %tenant_id,
                rule_id = %rule.id,
                %date,
                "Resolved global commission rule"
            ),
            None => debug!(
                tenant_id = %tenant_id,
                unit_id = ?unit_id,
                %date,
                "No commission rule applies"
            ),
        }

        Ok(resolved)
    }

    /// Resolution for a commission item; an explicit rule id bypasses the
    /// hierarchy and marks the item as a manual override
    pub async fn resolve_for_item(
        &self,
        tenant_id: Uuid,
        unit_id: Option<Uuid>,
        date: NaiveDate,
        explicit_rule_id: Option<Uuid>,
    ) -> Result<Option<ResolvedRule>> {
        if let Some(rule_id) = explicit_rule_id {
            let rule = self
                .rules
                .find_by_id(tenant_id, rule_id)
                .await?
                .ok_or_else(|| AppError::RuleNotFound(rule_id.to_string()))?;

            return Ok(Some(ResolvedRule {
                rule,
                source: CommissionSource::Manual,
            }));
        }

        Ok(self
            .resolve(tenant_id, unit_id, date)
            .await?
            .map(|rule| ResolvedRule {
                rule,
                source: CommissionSource::Regra,
            }))
    }
}

/// Picks the winning rule among candidates of one scope
///
/// Re-checks validity and re-sorts so the outcome does not depend on the
/// store's filtering or ordering.
pub fn pick_most_specific(candidates: Vec<CommissionRule>, date: NaiveDate) -> Option<CommissionRule> {
    candidates
        .into_iter()
        .filter(|rule| rule.is_effective_on(date))
        .min_by(CommissionRule::precedence)
}
