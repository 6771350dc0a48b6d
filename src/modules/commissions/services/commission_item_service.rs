use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::core::money::{parse_money, parse_rate};
use crate::core::validation::{parse_date, parse_id, parse_optional_date, parse_optional_id, validate_date_range};
use crate::core::{AppError, Result};
use crate::modules::commissions::models::{
    CommissionItem, CommissionItemDraft, CommissionItemFilter, CommissionSource, CommissionSummary,
    CreateCommissionItemRequest, ProfessionalCommissionSummary, ServiceCommissionSummary,
    UpdateCommissionItemRequest,
};
use crate::modules::commissions::repositories::CommissionItemRepository;
use crate::modules::rules::models::CommissionType;
use crate::modules::rules::services::RuleResolver;

/// Rate chosen for a new item
struct RateSelection {
    rate: Decimal,
    commission_type: CommissionType,
    source: CommissionSource,
    rule_id: Option<Uuid>,
}

/// Commission item ledger use-cases
pub struct CommissionItemService {
    items: Arc<dyn CommissionItemRepository>,
    resolver: Arc<RuleResolver>,
}

impl CommissionItemService {
    pub fn new(items: Arc<dyn CommissionItemRepository>, resolver: Arc<RuleResolver>) -> Self {
        Self { items, resolver }
    }

    pub async fn create_item(&self, tenant_id: Uuid, request: CreateCommissionItemRequest) -> Result<CommissionItem> {
        let item = self.build_item(tenant_id, request).await?;
        let created = self.items.create(&item).await?;

        info!(
            tenant_id = %tenant_id,
            item_id = %created.id,
            professional_id = %created.professional_id,
            source = %created.commission_source,
            commission_value = %created.commission_value,
            "Commission item created"
        );

        Ok(created)
    }

    /// Validates and rates every line before writing any of them
    pub async fn create_batch(
        &self,
        tenant_id: Uuid,
        requests: Vec<CreateCommissionItemRequest>,
    ) -> Result<Vec<CommissionItem>> {
        let mut items = Vec::with_capacity(requests.len());
        for request in requests {
            items.push(self.build_item(tenant_id, request).await?);
        }

        let created = self.items.create_batch(&items).await?;
        info!(tenant_id = %tenant_id, count = created.len(), "Commission items created");
        Ok(created)
    }

    pub async fn get_item(&self, tenant_id: Uuid, id: Uuid) -> Result<CommissionItem> {
        self.items
            .find_by_id(tenant_id, id)
            .await?
            .ok_or_else(|| AppError::ItemNotFound(id.to_string()))
    }

    pub async fn get_by_command_item(&self, tenant_id: Uuid, command_item_id: Uuid) -> Result<Option<CommissionItem>> {
        self.items.find_by_command_item(tenant_id, command_item_id).await
    }

    pub async fn list_items(&self, tenant_id: Uuid, filter: &CommissionItemFilter) -> Result<Vec<CommissionItem>> {
        self.items.list(tenant_id, filter).await
    }

    /// Descriptive corrections on a pending item; value fields never change
    pub async fn update_item(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        request: UpdateCommissionItemRequest,
    ) -> Result<CommissionItem> {
        let mut item = self.get_item(tenant_id, id).await?;
        if !item.is_pending() {
            return Err(AppError::ItemCannotUpdate(item.status.to_string()));
        }

        if let Some(date) = parse_optional_date("reference_date", request.reference_date.as_deref())? {
            item.reference_date = date;
        }
        if let Some(service_id) = parse_optional_id("service_id", request.service_id.as_deref())? {
            item.service_id = Some(service_id);
        }
        if let Some(appointment_id) = parse_optional_id("appointment_id", request.appointment_id.as_deref())? {
            item.appointment_id = Some(appointment_id);
        }
        item.updated_at = Utc::now();

        if !self.items.update(&item).await? {
            return Err(self
                .lost_race(tenant_id, id, |current| AppError::ItemCannotUpdate(current.status.to_string()))
                .await);
        }

        info!(tenant_id = %tenant_id, item_id = %id, "Commission item updated");
        Ok(item)
    }

    pub async fn process_item(&self, tenant_id: Uuid, id: Uuid, period_id: Uuid) -> Result<CommissionItem> {
        let mut item = self.get_item(tenant_id, id).await?;
        let now = Utc::now();
        item.process(period_id, now)?;

        if !self.items.process(tenant_id, id, period_id, now).await? {
            return Err(self
                .lost_race(tenant_id, id, |current| AppError::ItemAlreadyProcessed(current.id.to_string()))
                .await);
        }

        info!(tenant_id = %tenant_id, item_id = %id, period_id = %period_id, "Commission item processed");
        Ok(item)
    }

    /// Idempotent: items already processed are not touched and not counted
    pub async fn assign_to_period(
        &self,
        tenant_id: Uuid,
        professional_id: Uuid,
        period_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<u64> {
        validate_date_range(start, end)?;

        let assigned = self
            .items
            .assign_to_period(tenant_id, professional_id, period_id, start, end, Utc::now())
            .await?;

        info!(
            tenant_id = %tenant_id,
            professional_id = %professional_id,
            period_id = %period_id,
            assigned,
            "Commission items assigned to period"
        );
        Ok(assigned)
    }

    pub async fn delete_item(&self, tenant_id: Uuid, id: Uuid) -> Result<()> {
        let item = self.get_item(tenant_id, id).await?;
        item.ensure_deletable()?;

        if !self.items.delete(tenant_id, id).await? {
            return Err(self
                .lost_race(tenant_id, id, |current| AppError::ItemCannotDelete(current.status.to_string()))
                .await);
        }

        info!(tenant_id = %tenant_id, item_id = %id, "Commission item deleted");
        Ok(())
    }

    /// Cancellation from the point of sale; an unknown command item is a no-op
    pub async fn delete_by_command_item(&self, tenant_id: Uuid, command_item_id: Uuid) -> Result<()> {
        let Some(item) = self.items.find_by_command_item(tenant_id, command_item_id).await? else {
            debug!(
                tenant_id = %tenant_id,
                command_item_id = %command_item_id,
                "No commission item for command item; nothing to delete"
            );
            return Ok(());
        };

        self.delete_item(tenant_id, item.id).await
    }

    pub async fn sum_by_date_range(
        &self,
        tenant_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
        professional_id: Option<Uuid>,
    ) -> Result<CommissionSummary> {
        validate_date_range(from, to)?;
        self.items.sum_by_date_range(tenant_id, from, to, professional_id).await
    }

    pub async fn summary_by_professional(
        &self,
        tenant_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<ProfessionalCommissionSummary>> {
        validate_date_range(from, to)?;
        self.items.summary_by_professional(tenant_id, from, to).await
    }

    pub async fn summary_by_service(
        &self,
        tenant_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<ServiceCommissionSummary>> {
        validate_date_range(from, to)?;
        self.items.summary_by_service(tenant_id, from, to).await
    }

    async fn build_item(&self, tenant_id: Uuid, request: CreateCommissionItemRequest) -> Result<CommissionItem> {
        let professional_id = parse_id("professional_id", &request.professional_id)?;
        let unit_id = parse_optional_id("unit_id", request.unit_id.as_deref())?;
        let gross_value = parse_money("gross_value", &request.gross_value)?;
        let reference_date = parse_date("reference_date", &request.reference_date)?;

        let selection = self
            .select_rate(tenant_id, unit_id, reference_date, &request)
            .await?;

        CommissionItem::new(CommissionItemDraft {
            tenant_id,
            unit_id,
            professional_id,
            command_id: parse_optional_id("command_id", request.command_id.as_deref())?,
            command_item_id: parse_optional_id("command_item_id", request.command_item_id.as_deref())?,
            appointment_id: parse_optional_id("appointment_id", request.appointment_id.as_deref())?,
            service_id: parse_optional_id("service_id", request.service_id.as_deref())?,
            gross_value,
            commission_rate: selection.rate,
            commission_type: selection.commission_type,
            commission_source: selection.source,
            rule_id: selection.rule_id,
            reference_date,
        })
    }

    /// Explicit rule, then explicit rate, then the rule hierarchy
    async fn select_rate(
        &self,
        tenant_id: Uuid,
        unit_id: Option<Uuid>,
        date: NaiveDate,
        request: &CreateCommissionItemRequest,
    ) -> Result<RateSelection> {
        let explicit_rule_id = parse_optional_id("rule_id", request.rule_id.as_deref())?;

        if explicit_rule_id.is_none() {
            if let Some(rate) = request.commission_rate.as_deref().filter(|r| !r.trim().is_empty()) {
                let rate = parse_rate("commission_rate", rate)?;
                let commission_type = request
                    .commission_type
                    .as_deref()
                    .ok_or_else(|| AppError::validation("commission_type is required with commission_rate"))?
                    .parse::<CommissionType>()?;
                let source = match request.commission_source.as_deref() {
                    Some(s) if !s.trim().is_empty() => s.parse::<CommissionSource>()?,
                    _ => CommissionSource::Manual,
                };
                if source == CommissionSource::Regra {
                    return Err(AppError::validation(
                        "commission_source REGRA requires a rule; send rule_id or omit the rate",
                    ));
                }

                return Ok(RateSelection {
                    rate,
                    commission_type,
                    source,
                    rule_id: None,
                });
            }
        }

        let resolved = self
            .resolver
            .resolve_for_item(tenant_id, unit_id, date, explicit_rule_id)
            .await?
            .ok_or_else(|| {
                AppError::NoApplicableRule(format!(
                    "tenant {} unit {} on {}",
                    tenant_id,
                    unit_id.map_or_else(|| "-".to_string(), |u| u.to_string()),
                    date
                ))
            })?;

        Ok(RateSelection {
            rate: resolved.rule.default_rate,
            commission_type: resolved.rule.commission_type,
            source: resolved.source,
            rule_id: Some(resolved.rule.id),
        })
    }

    /// A guarded write matched nothing: report why
    async fn lost_race<F>(&self, tenant_id: Uuid, id: Uuid, condition: F) -> AppError
    where
        F: FnOnce(&CommissionItem) -> AppError,
    {
        match self.items.find_by_id(tenant_id, id).await {
            Ok(Some(current)) => {
                warn!(
                    tenant_id = %tenant_id,
                    item_id = %id,
                    status = %current.status,
                    "Commission item changed concurrently; write rejected"
                );
                condition(&current)
            }
            Ok(None) => AppError::ItemNotFound(id.to_string()),
            Err(e) => e,
        }
    }
}
