// Commission period lifecycle and the close procedure
//
// The close deducts approved advances, binds the period's items and moves
// the period to FECHADO in one step; payable emission runs afterwards,
// best-effort, and can be retried through reconciliation.

#[path = "../helpers/mod.rs"]
mod helpers;

use barber_commission::config::CommissionSettings;
use barber_commission::core::AppError;
use barber_commission::modules::advances::models::AdvanceStatus;
use barber_commission::modules::commissions::models::CommissionItemStatus;
use barber_commission::modules::payables::models::{CostType, COMMISSION_PERIOD_ORIGIN};
use barber_commission::modules::periods::models::{CreatePeriodRequest, PeriodFilter};
use barber_commission::modules::periods::PeriodStatus;
use chrono::{Duration, NaiveDate};
use helpers::*;
use rust_decimal_macros::dec;
use uuid::Uuid;

/// One professional with a 200.00 sale at 50% and an approved 80.00 advance
struct Scenario {
    ctx: TestContext,
    professional_id: Uuid,
    period_id: Uuid,
    item_id: Uuid,
    advance_id: Uuid,
}

async fn scenario() -> Scenario {
    scenario_with(TestContext::new()).await
}

async fn scenario_with(ctx: TestContext) -> Scenario {
    let professional_id = ctx.store.add_professional(ctx.tenant_id, "Joao Silva");
    ctx.global_rule("50").await;

    let period = ctx.open_period(professional_id, "2025-01").await;
    let item = ctx.item(professional_id, "200.00", "2025-01-15").await;
    let advance = ctx.approved_advance(professional_id, "80.00").await;

    Scenario {
        professional_id,
        period_id: period.id,
        item_id: item.id,
        advance_id: advance.id,
        ctx,
    }
}

#[tokio::test]
async fn test_close_end_to_end() {
    let s = scenario().await;
    let ctx = &s.ctx;
    let closer = Uuid::new_v4();

    let outcome = ctx.periods.close_period(ctx.tenant_id, s.period_id, closer).await.unwrap();

    assert_eq!(outcome.advances_deducted, 1);
    assert_eq!(outcome.total_advances_amount, dec!(80.00));
    assert_eq!(outcome.total_advances_formatted, "80.00");
    assert_eq!(outcome.items_processed, 1);

    let period = &outcome.period;
    assert_eq!(period.status, PeriodStatus::Fechado);
    assert_eq!(period.closed_by, Some(closer));
    assert_eq!(period.total_gross, dec!(200.00));
    assert_eq!(period.total_commission, dec!(100.00));
    assert_eq!(period.total_advances, dec!(80.00));
    assert_eq!(period.total_net, dec!(20.00));
    assert_eq!(period.items_count, 1);

    let payable = outcome.payable.as_ref().expect("A payable should be emitted");
    assert_eq!(payable.amount, dec!(20.00));
    assert_eq!(payable.description, "Commission 2025-01 - Joao Silva");
    let closed_on = period.closed_at.unwrap().date_naive();
    assert_eq!(payable.due_date, closed_on + Duration::days(7));
    assert_eq!(period.conta_pagar_id, Some(payable.id));

    let item = ctx.store.item(s.item_id).unwrap();
    assert_eq!(item.status, CommissionItemStatus::Processado);
    assert_eq!(item.period_id, Some(s.period_id));

    let advance = ctx.store.advance(s.advance_id).unwrap();
    assert_eq!(advance.status, AdvanceStatus::Deducted);
    assert_eq!(advance.deduction_period_id, Some(s.period_id));

    let stored = ctx.store.period(s.period_id).unwrap();
    assert_eq!(stored.status, PeriodStatus::Fechado);
    assert_eq!(stored.total_net, dec!(20.00));
    assert_eq!(stored.conta_pagar_id, Some(payable.id));
}

#[tokio::test]
async fn test_payable_request_shape() {
    let s = scenario().await;
    let ctx = &s.ctx;

    ctx.periods.close_period(ctx.tenant_id, s.period_id, Uuid::new_v4()).await.unwrap();

    let payables = ctx.store.payables();
    assert_eq!(payables.len(), 1);
    let (request, _) = &payables[0];
    assert_eq!(request.category, "commission");
    assert_eq!(request.supplier, "Joao Silva");
    assert_eq!(request.cost_type, CostType::Variavel);
    assert!(!request.recurring);
    assert_eq!(request.observations.as_deref(), Some("Period 2025-01-01 to 2025-01-31"));
    assert_eq!(request.origin_type, COMMISSION_PERIOD_ORIGIN);
    assert_eq!(request.origin_id, s.period_id);
}

#[tokio::test]
async fn test_second_close_fails_without_mutation() {
    let s = scenario().await;
    let ctx = &s.ctx;

    let first = ctx.periods.close_period(ctx.tenant_id, s.period_id, Uuid::new_v4()).await.unwrap();
    let late_advance = ctx.approved_advance(s.professional_id, "30.00").await;

    let second = ctx.periods.close_period(ctx.tenant_id, s.period_id, Uuid::new_v4()).await;
    assert!(matches!(second, Err(AppError::PeriodCannotClose(_))));

    let stored = ctx.store.period(s.period_id).unwrap();
    assert_eq!(stored.closed_by, first.period.closed_by);
    assert_eq!(stored.total_advances, dec!(80.00));
    assert_eq!(ctx.store.payables().len(), 1);
    assert_eq!(ctx.store.advance(late_advance.id).unwrap().status, AdvanceStatus::Approved);
}

#[tokio::test]
async fn test_close_unknown_period() {
    let ctx = TestContext::new();

    let result = ctx.periods.close_period(ctx.tenant_id, Uuid::new_v4(), Uuid::new_v4()).await;
    assert!(matches!(result, Err(AppError::PeriodNotFound(_))));
}

#[tokio::test]
async fn test_only_own_advances_deducted() {
    let s = scenario().await;
    let ctx = &s.ctx;
    let other = ctx.approved_advance(Uuid::new_v4(), "500.00").await;
    let pending = ctx
        .advances
        .create_advance(ctx.tenant_id, TestDataFactory::advance_request(s.professional_id, "10.00"))
        .await
        .unwrap();

    let outcome = ctx.periods.close_period(ctx.tenant_id, s.period_id, Uuid::new_v4()).await.unwrap();

    assert_eq!(outcome.advances_deducted, 1);
    assert_eq!(ctx.store.advance(other.id).unwrap().status, AdvanceStatus::Approved);
    assert_eq!(ctx.store.advance(pending.id).unwrap().status, AdvanceStatus::Pending);
}

#[tokio::test]
async fn test_several_advances_summed() {
    let s = scenario().await;
    let ctx = &s.ctx;
    let second = ctx.approved_advance(s.professional_id, "15.50").await;

    let outcome = ctx.periods.close_period(ctx.tenant_id, s.period_id, Uuid::new_v4()).await.unwrap();

    assert_eq!(outcome.advances_deducted, 2);
    assert_eq!(outcome.total_advances_formatted, "95.50");
    assert_eq!(outcome.period.total_net, dec!(4.50));
    for id in [s.advance_id, second.id] {
        let advance = ctx.store.advance(id).unwrap();
        assert_eq!(advance.status, AdvanceStatus::Deducted);
        assert_eq!(advance.deduction_period_id, Some(s.period_id));
    }
}

#[tokio::test]
async fn test_non_positive_net_emits_no_payable() {
    let s = scenario().await;
    let ctx = &s.ctx;
    ctx.approved_advance(s.professional_id, "20.00").await;

    let outcome = ctx.periods.close_period(ctx.tenant_id, s.period_id, Uuid::new_v4()).await.unwrap();

    assert_eq!(outcome.period.total_net, dec!(0.00));
    assert_eq!(outcome.period.status, PeriodStatus::Fechado);
    assert!(outcome.payable.is_none());
    assert!(outcome.period.conta_pagar_id.is_none());
    assert!(ctx.store.payables().is_empty());
    assert_eq!(outcome.items_processed, 1);
}

#[tokio::test]
async fn test_adjustments_enter_net() {
    let s = scenario().await;
    let ctx = &s.ctx;

    let adjusted = ctx
        .periods
        .set_adjustments(ctx.tenant_id, s.period_id, "15.00", Some("Product bonus".to_string()))
        .await
        .unwrap();
    assert_eq!(adjusted.total_adjustments, dec!(15.00));
    assert_eq!(adjusted.notes.as_deref(), Some("Product bonus"));

    let outcome = ctx.periods.close_period(ctx.tenant_id, s.period_id, Uuid::new_v4()).await.unwrap();
    assert_eq!(outcome.period.total_net, dec!(35.00));
    assert_eq!(outcome.payable.unwrap().amount, dec!(35.00));

    let late = ctx.periods.set_adjustments(ctx.tenant_id, s.period_id, "1.00", None).await;
    assert!(matches!(late, Err(AppError::PeriodCannotAdjust(_))));
}

#[tokio::test]
async fn test_advance_lookup_failure_closes_without_deductions() {
    let s = scenario().await;
    let ctx = &s.ctx;
    ctx.store.fail(FailPoint::FindApprovedAdvances);

    let outcome = ctx.periods.close_period(ctx.tenant_id, s.period_id, Uuid::new_v4()).await.unwrap();

    assert_eq!(outcome.advances_deducted, 0);
    assert_eq!(outcome.total_advances_formatted, "0.00");
    assert_eq!(outcome.period.total_net, dec!(100.00));
    assert_eq!(outcome.period.status, PeriodStatus::Fechado);
    assert_eq!(ctx.store.advance(s.advance_id).unwrap().status, AdvanceStatus::Approved);
}

#[tokio::test]
async fn test_item_sweep_failure_uses_stored_totals() {
    let s = scenario().await;
    let ctx = &s.ctx;

    let refreshed = ctx.periods.refresh_totals(ctx.tenant_id, s.period_id).await.unwrap();
    assert_eq!(refreshed.total_commission, dec!(100.00));

    // Sold after the last refresh; not seen by the close
    let late = ctx.item(s.professional_id, "100.00", "2025-01-20").await;
    ctx.store.fail(FailPoint::ItemSweep);

    let outcome = ctx.periods.close_period(ctx.tenant_id, s.period_id, Uuid::new_v4()).await.unwrap();
    assert_eq!(outcome.period.status, PeriodStatus::Fechado);
    assert_eq!(outcome.period.total_commission, dec!(100.00));
    assert_eq!(outcome.period.total_net, dec!(20.00));
    assert_eq!(outcome.items_processed, 0);
    assert_eq!(outcome.advances_deducted, 1);

    for id in [s.item_id, late.id] {
        let item = ctx.store.item(id).unwrap();
        assert_eq!(item.status, CommissionItemStatus::Pendente);
        assert!(item.period_id.is_none());
    }
}

#[tokio::test]
async fn test_summary_read_failure_does_not_block_close() {
    let s = scenario().await;
    let ctx = &s.ctx;
    ctx.store.fail(FailPoint::PeriodSummary);

    let refresh = ctx.periods.refresh_totals(ctx.tenant_id, s.period_id).await;
    assert!(refresh.is_err());

    let outcome = ctx.periods.close_period(ctx.tenant_id, s.period_id, Uuid::new_v4()).await.unwrap();
    assert_eq!(outcome.period.total_commission, dec!(100.00));
    assert_eq!(outcome.period.total_net, dec!(20.00));
    assert_eq!(outcome.items_processed, 1);
}

#[tokio::test]
async fn test_close_totals_exactly_the_bound_items() {
    let s = scenario().await;
    let ctx = &s.ctx;

    // Stale running totals must not leak into the close
    ctx.periods.refresh_totals(ctx.tenant_id, s.period_id).await.unwrap();
    let late = ctx.item(s.professional_id, "60.00", "2025-01-31").await;
    let next_month = ctx.item(s.professional_id, "40.00", "2025-02-01").await;
    let colleague = ctx.item(Uuid::new_v4(), "500.00", "2025-01-10").await;

    let outcome = ctx.periods.close_period(ctx.tenant_id, s.period_id, Uuid::new_v4()).await.unwrap();

    assert_eq!(outcome.items_processed, 2);
    assert_eq!(outcome.period.items_count, 2);
    assert_eq!(outcome.period.total_gross, dec!(260.00));
    assert_eq!(outcome.period.total_commission, dec!(130.00));
    assert_eq!(outcome.period.total_net, dec!(50.00));

    for id in [s.item_id, late.id] {
        assert_eq!(ctx.store.item(id).unwrap().period_id, Some(s.period_id));
    }
    for id in [next_month.id, colleague.id] {
        let item = ctx.store.item(id).unwrap();
        assert_eq!(item.status, CommissionItemStatus::Pendente);
        assert!(item.period_id.is_none());
    }
}

#[tokio::test]
async fn test_payable_failure_is_reconciled() {
    let s = scenario().await;
    let ctx = &s.ctx;
    ctx.store.fail(FailPoint::EmitPayable);

    let outcome = ctx.periods.close_period(ctx.tenant_id, s.period_id, Uuid::new_v4()).await.unwrap();
    assert_eq!(outcome.period.status, PeriodStatus::Fechado);
    assert!(outcome.payable.is_none());
    assert!(outcome.period.conta_pagar_id.is_none());
    assert_eq!(outcome.advances_deducted, 1);

    ctx.store.recover(FailPoint::EmitPayable);
    let reconciled = ctx.periods.reconcile_closed_period(ctx.tenant_id, s.period_id).await.unwrap();
    let payable = reconciled.payable.expect("Reconcile should emit the payable");
    assert_eq!(payable.amount, dec!(20.00));
    assert_eq!(reconciled.period.conta_pagar_id, Some(payable.id));

    let again = ctx.periods.reconcile_closed_period(ctx.tenant_id, s.period_id).await.unwrap();
    assert_eq!(again.payable.map(|p| p.id), Some(payable.id));
    assert_eq!(ctx.store.payables().len(), 1);
    assert_eq!(ctx.store.period(s.period_id).unwrap().conta_pagar_id, Some(payable.id));
}

#[tokio::test]
async fn test_link_failure_is_reconciled() {
    let s = scenario().await;
    let ctx = &s.ctx;
    ctx.store.fail(FailPoint::LinkPayable);

    let outcome = ctx.periods.close_period(ctx.tenant_id, s.period_id, Uuid::new_v4()).await.unwrap();
    let payable = outcome.payable.expect("Payable emitted before linking");
    assert!(outcome.period.conta_pagar_id.is_none());

    ctx.store.recover(FailPoint::LinkPayable);
    let reconciled = ctx.periods.reconcile_closed_period(ctx.tenant_id, s.period_id).await.unwrap();
    assert_eq!(reconciled.period.conta_pagar_id, Some(payable.id));
    assert_eq!(ctx.store.payables().len(), 1);
}

#[tokio::test]
async fn test_reconcile_leaves_late_items_pending() {
    let s = scenario().await;
    let ctx = &s.ctx;

    ctx.periods.close_period(ctx.tenant_id, s.period_id, Uuid::new_v4()).await.unwrap();
    ctx.periods.mark_as_paid(ctx.tenant_id, s.period_id, Uuid::new_v4()).await.unwrap();

    // Dated inside the paid period's span but recorded afterwards
    let late = ctx.item(s.professional_id, "400.00", "2025-01-20").await;

    let reconciled = ctx.periods.reconcile_closed_period(ctx.tenant_id, s.period_id).await.unwrap();
    assert_eq!(reconciled.period.status, PeriodStatus::Pago);
    assert_eq!(reconciled.period.total_commission, dec!(100.00));

    let late = ctx.store.item(late.id).unwrap();
    assert_eq!(late.status, CommissionItemStatus::Pendente);
    assert!(late.period_id.is_none());

    let stored = ctx.store.period(s.period_id).unwrap();
    assert_eq!(stored.total_commission, dec!(100.00));
    assert_eq!(stored.items_count, 1);
}

#[tokio::test]
async fn test_directory_failure_uses_placeholder_name() {
    let s = scenario().await;
    let ctx = &s.ctx;
    ctx.store.fail(FailPoint::FindProfessional);

    let outcome = ctx.periods.close_period(ctx.tenant_id, s.period_id, Uuid::new_v4()).await.unwrap();

    let payable = outcome.payable.unwrap();
    assert_eq!(payable.description, "Commission 2025-01 - Professional");
}

#[tokio::test]
async fn test_failed_close_leaves_everything_untouched() {
    let s = scenario().await;
    let ctx = &s.ctx;
    ctx.store.fail(FailPoint::ClosePeriod);

    let result = ctx.periods.close_period(ctx.tenant_id, s.period_id, Uuid::new_v4()).await;
    assert!(result.is_err());

    let period = ctx.store.period(s.period_id).unwrap();
    assert_eq!(period.status, PeriodStatus::Aberto);
    assert_eq!(period.total_advances, dec!(0));
    assert_eq!(ctx.store.advance(s.advance_id).unwrap().status, AdvanceStatus::Approved);
    assert_eq!(ctx.store.item(s.item_id).unwrap().status, CommissionItemStatus::Pendente);
    assert!(ctx.store.payables().is_empty());

    ctx.store.recover(FailPoint::ClosePeriod);
    let outcome = ctx.periods.close_period(ctx.tenant_id, s.period_id, Uuid::new_v4()).await.unwrap();
    assert_eq!(outcome.period.total_net, dec!(20.00));
}

#[tokio::test]
async fn test_due_days_configurable() {
    let settings = CommissionSettings {
        payable_due_days: 15,
        ..Default::default()
    };
    let s = scenario_with(TestContext::with_settings(settings)).await;
    let ctx = &s.ctx;

    let outcome = ctx.periods.close_period(ctx.tenant_id, s.period_id, Uuid::new_v4()).await.unwrap();

    let closed_on = outcome.period.closed_at.unwrap().date_naive();
    assert_eq!(outcome.payable.unwrap().due_date, closed_on + Duration::days(15));
}

#[tokio::test]
async fn test_unrepresentable_due_date_skips_payable() {
    let settings = CommissionSettings {
        payable_due_days: i64::MAX,
        ..Default::default()
    };
    let s = scenario_with(TestContext::with_settings(settings)).await;
    let ctx = &s.ctx;

    let outcome = ctx.periods.close_period(ctx.tenant_id, s.period_id, Uuid::new_v4()).await.unwrap();

    assert_eq!(outcome.period.status, PeriodStatus::Fechado);
    assert_eq!(outcome.period.total_net, dec!(20.00));
    assert!(outcome.payable.is_none());
    assert!(ctx.store.payables().is_empty());
}

#[tokio::test]
async fn test_reconcile_requires_closed_period() {
    let s = scenario().await;
    let ctx = &s.ctx;

    let result = ctx.periods.reconcile_closed_period(ctx.tenant_id, s.period_id).await;
    assert!(matches!(result, Err(AppError::PeriodNotClosed(_))));
}

#[tokio::test]
async fn test_pay_only_after_close() {
    let s = scenario().await;
    let ctx = &s.ctx;
    let payer = Uuid::new_v4();

    let early = ctx.periods.mark_as_paid(ctx.tenant_id, s.period_id, payer).await;
    assert!(matches!(early, Err(AppError::PeriodCannotPay(_))));

    ctx.periods.close_period(ctx.tenant_id, s.period_id, Uuid::new_v4()).await.unwrap();
    let paid = ctx.periods.mark_as_paid(ctx.tenant_id, s.period_id, payer).await.unwrap();
    assert_eq!(paid.status, PeriodStatus::Pago);
    assert_eq!(paid.paid_by, Some(payer));
    assert_eq!(ctx.store.period(s.period_id).unwrap().status, PeriodStatus::Pago);

    let twice = ctx.periods.mark_as_paid(ctx.tenant_id, s.period_id, payer).await;
    assert!(matches!(twice, Err(AppError::PeriodCannotPay(_))));

    // Reconciliation still works on a paid period
    let reconciled = ctx.periods.reconcile_closed_period(ctx.tenant_id, s.period_id).await.unwrap();
    assert_eq!(reconciled.period.status, PeriodStatus::Pago);
}

#[tokio::test]
async fn test_delete_only_while_open() {
    let s = scenario().await;
    let ctx = &s.ctx;

    let other_professional = Uuid::new_v4();
    let open = ctx.open_period(other_professional, "2025-01").await;
    ctx.periods.delete_period(ctx.tenant_id, open.id).await.unwrap();
    assert!(ctx.store.period(open.id).is_none());

    ctx.periods.close_period(ctx.tenant_id, s.period_id, Uuid::new_v4()).await.unwrap();
    let result = ctx.periods.delete_period(ctx.tenant_id, s.period_id).await;
    assert!(matches!(result, Err(AppError::PeriodCannotDelete(_))));
}

#[tokio::test]
async fn test_next_month_after_close() {
    let s = scenario().await;
    let ctx = &s.ctx;
    ctx.periods.close_period(ctx.tenant_id, s.period_id, Uuid::new_v4()).await.unwrap();

    let february = ctx.open_period(s.professional_id, "2025-02").await;
    assert_ne!(february.id, s.period_id);
    assert_eq!(february.period_start, NaiveDate::from_ymd_opt(2025, 2, 1).unwrap());
    assert_eq!(february.period_end, NaiveDate::from_ymd_opt(2025, 2, 28).unwrap());

    let filter = PeriodFilter {
        professional_id: Some(s.professional_id),
        ..Default::default()
    };
    let periods = ctx.periods.list_periods(ctx.tenant_id, &filter).await.unwrap();
    assert_eq!(periods.len(), 2);
    assert_eq!(periods[0].id, february.id);
}

#[tokio::test]
async fn test_period_summary_and_refresh() {
    let s = scenario().await;
    let ctx = &s.ctx;
    ctx.item(s.professional_id, "50.00", "2025-01-31").await;
    ctx.item(s.professional_id, "50.00", "2025-02-01").await;

    let summary = ctx.periods.period_summary(ctx.tenant_id, s.period_id).await.unwrap();
    assert_eq!(summary.total_gross, dec!(250.00));
    assert_eq!(summary.total_commission, dec!(125.00));
    assert_eq!(summary.items_count, 2);

    let refreshed = ctx.periods.refresh_totals(ctx.tenant_id, s.period_id).await.unwrap();
    assert_eq!(refreshed.total_net, dec!(125.00));
    assert_eq!(ctx.store.period(s.period_id).unwrap().total_commission, dec!(125.00));
}

#[tokio::test]
async fn test_explicit_creation() {
    let ctx = TestContext::new();
    let professional_id = Uuid::new_v4();

    let created = ctx
        .periods
        .create_period(
            ctx.tenant_id,
            CreatePeriodRequest {
                professional_id: Some(professional_id.to_string()),
                reference_month: "2025-03".to_string(),
                period_start: Some("2025-03-01".to_string()),
                period_end: Some("2025-03-15".to_string()),
                notes: Some("First fortnight".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(created.period_end, NaiveDate::from_ymd_opt(2025, 3, 15).unwrap());
    assert_eq!(created.notes.as_deref(), Some("First fortnight"));

    // The open period is returned instead of a second one
    let again = ctx.open_period(professional_id, "2025-04").await;
    assert_eq!(again.id, created.id);

    let inverted = ctx
        .periods
        .create_period(
            ctx.tenant_id,
            CreatePeriodRequest {
                reference_month: "2025-03".to_string(),
                period_start: Some("2025-03-20".to_string()),
                period_end: Some("2025-03-01".to_string()),
                ..Default::default()
            },
        )
        .await;
    assert!(inverted.unwrap_err().is_validation());

    let derived = ctx
        .periods
        .create_period(
            ctx.tenant_id,
            CreatePeriodRequest {
                reference_month: "  ".to_string(),
                period_start: Some("2025-05-16".to_string()),
                period_end: Some("2025-05-31".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(derived.reference_month, "2025-05");
    assert_eq!(derived.period_start, NaiveDate::from_ymd_opt(2025, 5, 16).unwrap());

    let no_month_no_start = ctx
        .periods
        .create_period(ctx.tenant_id, CreatePeriodRequest::default())
        .await;
    assert!(no_month_no_start.unwrap_err().is_validation());

    let bad_month = ctx
        .periods
        .create_period(
            ctx.tenant_id,
            CreatePeriodRequest {
                reference_month: "March".to_string(),
                ..Default::default()
            },
        )
        .await;
    assert!(bad_month.unwrap_err().is_validation());
}
