use chrono::Utc;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::core::money::{parse_money, parse_rate};
use crate::core::validation::{parse_date, parse_optional_date, parse_optional_id, require_non_blank};
use crate::core::{AppError, Result};
use crate::modules::rules::models::{
    CalculationBase, CommissionRule, CommissionType, CreateRuleRequest, UpdateRuleRequest,
};
use crate::modules::rules::repositories::RuleRepository;

/// Operator-facing management of commission rules
pub struct RuleService {
    rules: Arc<dyn RuleRepository>,
}

impl RuleService {
    pub fn new(rules: Arc<dyn RuleRepository>) -> Self {
        Self { rules }
    }

    pub async fn create_rule(&self, tenant_id: Uuid, request: CreateRuleRequest) -> Result<CommissionRule> {
        let commission_type: CommissionType = request.commission_type.parse()?;
        let calculation_base = match request.calculation_base.as_deref() {
            Some(base) => base.parse()?,
            None => CalculationBase::Bruto,
        };

        let mut rule = CommissionRule::new(
            tenant_id,
            parse_optional_id("unit_id", request.unit_id.as_deref())?,
            require_non_blank("name", &request.name)?,
            commission_type,
            parse_rate("default_rate", &request.default_rate)?,
            calculation_base,
            parse_date("effective_from", &request.effective_from)?,
            parse_optional_date("effective_to", request.effective_to.as_deref())?,
        )?;
        rule.min_amount = parse_optional_money("min_amount", request.min_amount.as_deref())?;
        rule.max_amount = parse_optional_money("max_amount", request.max_amount.as_deref())?;
        rule.priority = request.priority;
        rule.validate()?;

        let created = self.rules.create(&rule).await?;

        info!(
            tenant_id = %tenant_id,
            rule_id = %created.id,
            unit_id = ?created.unit_id,
            commission_type = %created.commission_type,
            rate = %created.default_rate,
            "Commission rule created"
        );

        Ok(created)
    }

    pub async fn get_rule(&self, tenant_id: Uuid, id: Uuid) -> Result<CommissionRule> {
        self.rules
            .find_by_id(tenant_id, id)
            .await?
            .ok_or_else(|| AppError::RuleNotFound(id.to_string()))
    }

    pub async fn update_rule(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        request: UpdateRuleRequest,
    ) -> Result<CommissionRule> {
        let mut rule = self.get_rule(tenant_id, id).await?;

        if let Some(name) = request.name.as_deref() {
            rule.name = require_non_blank("name", name)?;
        }
        if let Some(commission_type) = request.commission_type.as_deref() {
            rule.commission_type = commission_type.parse()?;
        }
        if let Some(rate) = request.default_rate.as_deref() {
            rule.default_rate = parse_rate("default_rate", rate)?;
        }
        if let Some(min) = request.min_amount.as_deref() {
            rule.min_amount = parse_optional_money("min_amount", Some(min))?;
        }
        if let Some(max) = request.max_amount.as_deref() {
            rule.max_amount = parse_optional_money("max_amount", Some(max))?;
        }
        if let Some(base) = request.calculation_base.as_deref() {
            rule.calculation_base = base.parse()?;
        }
        if let Some(from) = request.effective_from.as_deref() {
            rule.effective_from = parse_date("effective_from", from)?;
        }
        if let Some(to) = request.effective_to.as_deref() {
            rule.effective_to = parse_optional_date("effective_to", Some(to))?;
        }
        if request.priority.is_some() {
            rule.priority = request.priority;
        }
        if let Some(is_active) = request.is_active {
            rule.is_active = is_active;
        }

        rule.validate()?;
        rule.updated_at = Utc::now();

        let updated = self.rules.update(&rule).await?;
        info!(tenant_id = %tenant_id, rule_id = %id, "Commission rule updated");

        Ok(updated)
    }

    pub async fn deactivate_rule(&self, tenant_id: Uuid, id: Uuid) -> Result<()> {
        if !self.rules.deactivate(tenant_id, id).await? {
            return Err(AppError::RuleNotFound(id.to_string()));
        }
        info!(tenant_id = %tenant_id, rule_id = %id, "Commission rule deactivated");
        Ok(())
    }

    /// Hard delete, only while no commission item references the rule
    pub async fn delete_rule(&self, tenant_id: Uuid, id: Uuid) -> Result<()> {
        self.get_rule(tenant_id, id).await?;

        if self.rules.is_referenced(tenant_id, id).await? {
            return Err(AppError::RuleInUse(id.to_string()));
        }

        if !self.rules.delete(tenant_id, id).await? {
            return Err(AppError::RuleNotFound(id.to_string()));
        }

        info!(tenant_id = %tenant_id, rule_id = %id, "Commission rule deleted");
        Ok(())
    }

    pub async fn list_active_rules(&self, tenant_id: Uuid) -> Result<Vec<CommissionRule>> {
        self.rules.list_active(tenant_id).await
    }
}

/// Blank clears the bound
fn parse_optional_money(field: &str, value: Option<&str>) -> Result<Option<rust_decimal::Decimal>> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => parse_money(field, v).map(Some),
    }
}
