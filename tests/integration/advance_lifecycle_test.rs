// Advance ledger state machine
//
// PENDING -> APPROVED -> DEDUCTED, PENDING -> REJECTED,
// PENDING | APPROVED -> CANCELLED. Illegal transitions fail with a named
// error and leave the record untouched.

#[path = "../helpers/mod.rs"]
mod helpers;

use barber_commission::core::AppError;
use barber_commission::modules::advances::models::{AdvanceFilter, AdvanceStatus};
use helpers::*;
use rust_decimal_macros::dec;
use uuid::Uuid;

#[tokio::test]
async fn test_create_starts_pending() {
    let ctx = TestContext::new();
    let professional_id = Uuid::new_v4();

    let advance = ctx
        .advances
        .create_advance(ctx.tenant_id, TestDataFactory::advance_request(professional_id, "150.00"))
        .await
        .unwrap();

    assert_eq!(advance.status, AdvanceStatus::Pending);
    assert_eq!(advance.amount, dec!(150.00));
    assert_eq!(advance.professional_id, professional_id);
    assert!(advance.deduction_period_id.is_none());
}

#[tokio::test]
async fn test_create_rejects_bad_input() {
    let ctx = TestContext::new();
    let professional_id = Uuid::new_v4();

    for amount in ["0", "-10.00", "ten", "10.123", "79228162514264337593543950335"] {
        let result = ctx
            .advances
            .create_advance(ctx.tenant_id, TestDataFactory::advance_request(professional_id, amount))
            .await;
        assert!(result.unwrap_err().is_validation(), "amount '{}'", amount);
    }

    let mut request = TestDataFactory::advance_request(professional_id, "10.00");
    request.professional_id = "someone".to_string();
    let result = ctx.advances.create_advance(ctx.tenant_id, request).await;
    assert!(result.unwrap_err().is_validation());
}

#[tokio::test]
async fn test_approve_then_deduct() {
    let ctx = TestContext::new();
    let professional_id = Uuid::new_v4();
    let approver = Uuid::new_v4();
    let period_id = Uuid::new_v4();

    let advance = ctx
        .advances
        .create_advance(ctx.tenant_id, TestDataFactory::advance_request(professional_id, "80.00"))
        .await
        .unwrap();

    let approved = ctx.advances.approve_advance(ctx.tenant_id, advance.id, approver).await.unwrap();
    assert_eq!(approved.status, AdvanceStatus::Approved);
    assert_eq!(approved.approved_by, Some(approver));
    assert!(approved.approved_at.is_some());

    let deducted = ctx.advances.mark_deducted(ctx.tenant_id, advance.id, period_id).await.unwrap();
    assert_eq!(deducted.status, AdvanceStatus::Deducted);
    assert_eq!(deducted.deduction_period_id, Some(period_id));

    let stored = ctx.store.advance(advance.id).unwrap();
    assert_eq!(stored.status, AdvanceStatus::Deducted);
    assert_eq!(stored.deduction_period_id, Some(period_id));
}

#[tokio::test]
async fn test_approve_twice_fails() {
    let ctx = TestContext::new();
    let advance = ctx.approved_advance(Uuid::new_v4(), "50.00").await;

    let result = ctx.advances.approve_advance(ctx.tenant_id, advance.id, Uuid::new_v4()).await;
    assert!(matches!(result, Err(AppError::AdvanceCannotApprove(_))));
}

#[tokio::test]
async fn test_reject_requires_reason() {
    let ctx = TestContext::new();
    let advance = ctx
        .advances
        .create_advance(ctx.tenant_id, TestDataFactory::advance_request(Uuid::new_v4(), "50.00"))
        .await
        .unwrap();

    let result = ctx.advances.reject_advance(ctx.tenant_id, advance.id, Uuid::new_v4(), "   ").await;
    assert!(result.unwrap_err().is_validation());
    assert_eq!(ctx.store.advance(advance.id).unwrap().status, AdvanceStatus::Pending);

    let rejected = ctx
        .advances
        .reject_advance(ctx.tenant_id, advance.id, Uuid::new_v4(), "Over monthly limit")
        .await
        .unwrap();
    assert_eq!(rejected.status, AdvanceStatus::Rejected);
    assert_eq!(rejected.rejection_reason.as_deref(), Some("Over monthly limit"));
}

#[tokio::test]
async fn test_reject_after_approval_fails() {
    let ctx = TestContext::new();
    let advance = ctx.approved_advance(Uuid::new_v4(), "50.00").await;

    let result = ctx
        .advances
        .reject_advance(ctx.tenant_id, advance.id, Uuid::new_v4(), "Too late")
        .await;
    assert!(matches!(result, Err(AppError::AdvanceCannotReject(_))));
    assert_eq!(ctx.store.advance(advance.id).unwrap().status, AdvanceStatus::Approved);
}

#[tokio::test]
async fn test_deduct_requires_approval() {
    let ctx = TestContext::new();
    let advance = ctx
        .advances
        .create_advance(ctx.tenant_id, TestDataFactory::advance_request(Uuid::new_v4(), "50.00"))
        .await
        .unwrap();

    let result = ctx.advances.mark_deducted(ctx.tenant_id, advance.id, Uuid::new_v4()).await;
    assert!(matches!(result, Err(AppError::AdvanceCannotDeduct(_))));
}

#[tokio::test]
async fn test_cancel_from_pending_and_approved_only() {
    let ctx = TestContext::new();
    let professional_id = Uuid::new_v4();

    let pending = ctx
        .advances
        .create_advance(ctx.tenant_id, TestDataFactory::advance_request(professional_id, "10.00"))
        .await
        .unwrap();
    let cancelled = ctx.advances.cancel_advance(ctx.tenant_id, pending.id).await.unwrap();
    assert_eq!(cancelled.status, AdvanceStatus::Cancelled);

    let approved = ctx.approved_advance(professional_id, "20.00").await;
    let cancelled = ctx.advances.cancel_advance(ctx.tenant_id, approved.id).await.unwrap();
    assert_eq!(cancelled.status, AdvanceStatus::Cancelled);

    let again = ctx.advances.cancel_advance(ctx.tenant_id, approved.id).await;
    assert!(matches!(again, Err(AppError::AdvanceCannotCancel(_))));
}

#[tokio::test]
async fn test_delete_only_while_pending() {
    let ctx = TestContext::new();
    let professional_id = Uuid::new_v4();

    let pending = ctx
        .advances
        .create_advance(ctx.tenant_id, TestDataFactory::advance_request(professional_id, "10.00"))
        .await
        .unwrap();
    ctx.advances.delete_advance(ctx.tenant_id, pending.id).await.unwrap();
    let gone = ctx.advances.get_advance(ctx.tenant_id, pending.id).await;
    assert!(matches!(gone, Err(AppError::AdvanceNotFound(_))));

    let approved = ctx.approved_advance(professional_id, "20.00").await;
    let result = ctx.advances.delete_advance(ctx.tenant_id, approved.id).await;
    assert!(matches!(result, Err(AppError::AdvanceCannotDelete(_))));
}

#[tokio::test]
async fn test_unknown_advance_is_not_found() {
    let ctx = TestContext::new();

    let result = ctx.advances.approve_advance(ctx.tenant_id, Uuid::new_v4(), Uuid::new_v4()).await;
    assert!(result.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_other_tenant_cannot_see_advance() {
    let ctx = TestContext::new();
    let advance = ctx.approved_advance(Uuid::new_v4(), "10.00").await;

    let result = ctx.advances.get_advance(Uuid::new_v4(), advance.id).await;
    assert!(matches!(result, Err(AppError::AdvanceNotFound(_))));
}

#[tokio::test]
async fn test_balance_and_listing() {
    let ctx = TestContext::new();
    let professional_id = Uuid::new_v4();

    ctx.approved_advance(professional_id, "80.00").await;
    ctx.approved_advance(professional_id, "20.50").await;
    ctx.advances
        .create_advance(ctx.tenant_id, TestDataFactory::advance_request(professional_id, "15.00"))
        .await
        .unwrap();
    ctx.approved_advance(Uuid::new_v4(), "999.00").await;

    let balance = ctx
        .advances
        .balance_for_professional(ctx.tenant_id, professional_id)
        .await
        .unwrap();
    assert_eq!(balance.approved, dec!(100.50));
    assert_eq!(balance.pending, dec!(15.00));

    let approved = ctx
        .advances
        .approved_for_professional(ctx.tenant_id, professional_id)
        .await
        .unwrap();
    assert_eq!(approved.len(), 2);

    let pending = ctx
        .advances
        .pending_for_professional(ctx.tenant_id, professional_id)
        .await
        .unwrap();
    assert_eq!(pending.len(), 1);

    let filter = AdvanceFilter {
        professional_id: Some(professional_id),
        status: Some(AdvanceStatus::Approved),
        ..Default::default()
    };
    let listed = ctx.advances.list_advances(ctx.tenant_id, &filter).await.unwrap();
    assert_eq!(listed.len(), 2);
}
