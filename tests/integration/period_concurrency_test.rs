// Races between concurrent requests
//
// Guarded writes in the store decide the winner: one close per period,
// one open period per professional, one transition per advance or item.

#[path = "../helpers/mod.rs"]
mod helpers;

use std::collections::HashSet;

use barber_commission::core::AppError;
use barber_commission::modules::advances::models::AdvanceStatus;
use barber_commission::modules::periods::PeriodStatus;
use helpers::*;
use rust_decimal_macros::dec;
use uuid::Uuid;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_close_has_one_winner() {
    let ctx = TestContext::new();
    let professional_id = ctx.store.add_professional(ctx.tenant_id, "Carla");
    ctx.global_rule("50").await;
    let period = ctx.open_period(professional_id, "2025-01").await;
    ctx.item(professional_id, "200.00", "2025-01-15").await;
    let advance = ctx.approved_advance(professional_id, "80.00").await;

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let periods = ctx.periods.clone();
            let tenant_id = ctx.tenant_id;
            let period_id = period.id;
            tokio::spawn(async move { periods.close_period(tenant_id, period_id, Uuid::new_v4()).await })
        })
        .collect();

    let mut closed = 0;
    for task in tasks {
        match task.await.expect("Close task panicked") {
            Ok(outcome) => {
                closed += 1;
                assert_eq!(outcome.advances_deducted, 1);
                assert_eq!(outcome.period.total_net, dec!(20.00));
            }
            Err(e) => assert!(matches!(e, AppError::PeriodCannotClose(_)), "unexpected error: {}", e),
        }
    }

    assert_eq!(closed, 1);
    let stored = ctx.store.period(period.id).unwrap();
    assert_eq!(stored.status, PeriodStatus::Fechado);
    assert_eq!(stored.total_advances, dec!(80.00));
    assert_eq!(ctx.store.payables().len(), 1);
    assert_eq!(ctx.store.advance(advance.id).unwrap().status, AdvanceStatus::Deducted);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_open_yields_single_period() {
    let ctx = TestContext::new();
    let professional_id = Uuid::new_v4();

    let tasks: Vec<_> = (0..16)
        .map(|_| {
            let periods = ctx.periods.clone();
            let tenant_id = ctx.tenant_id;
            tokio::spawn(async move {
                periods
                    .get_or_create_open_period(tenant_id, professional_id, "2025-01", None)
                    .await
            })
        })
        .collect();

    let mut ids = HashSet::new();
    for task in tasks {
        ids.insert(task.await.expect("Open task panicked").expect("Open failed").id);
    }

    assert_eq!(ids.len(), 1);
    assert_eq!(ctx.store.open_periods(ctx.tenant_id, professional_id), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_open_periods_are_per_professional() {
    let ctx = TestContext::new();
    let professionals: Vec<Uuid> = (0..4).map(|_| Uuid::new_v4()).collect();

    let tasks: Vec<_> = professionals
        .iter()
        .flat_map(|&professional_id| std::iter::repeat(professional_id).take(4))
        .map(|professional_id| {
            let periods = ctx.periods.clone();
            let tenant_id = ctx.tenant_id;
            tokio::spawn(async move {
                periods
                    .get_or_create_open_period(tenant_id, professional_id, "2025-01", None)
                    .await
            })
        })
        .collect();

    for task in tasks {
        task.await.expect("Open task panicked").expect("Open failed");
    }

    for professional_id in professionals {
        assert_eq!(ctx.store.open_periods(ctx.tenant_id, professional_id), 1);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_approve_and_reject() {
    let ctx = TestContext::new();
    let advance = ctx
        .advances
        .create_advance(ctx.tenant_id, TestDataFactory::advance_request(Uuid::new_v4(), "40.00"))
        .await
        .unwrap();

    let approve = {
        let advances = ctx.advances.clone();
        let tenant_id = ctx.tenant_id;
        let id = advance.id;
        tokio::spawn(async move { advances.approve_advance(tenant_id, id, Uuid::new_v4()).await })
    };
    let reject = {
        let advances = ctx.advances.clone();
        let tenant_id = ctx.tenant_id;
        let id = advance.id;
        tokio::spawn(async move { advances.reject_advance(tenant_id, id, Uuid::new_v4(), "Duplicate").await })
    };

    let approved = approve.await.unwrap();
    let rejected = reject.await.unwrap();
    assert!(approved.is_ok() != rejected.is_ok(), "exactly one transition must win");

    let stored = ctx.store.advance(advance.id).unwrap();
    match (approved, rejected) {
        (Ok(_), Err(e)) => {
            assert_eq!(stored.status, AdvanceStatus::Approved);
            assert!(matches!(e, AppError::AdvanceCannotReject(_)));
        }
        (Err(e), Ok(_)) => {
            assert_eq!(stored.status, AdvanceStatus::Rejected);
            assert!(matches!(e, AppError::AdvanceCannotApprove(_)));
        }
        _ => unreachable!(),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_item_processing() {
    let ctx = TestContext::new();
    ctx.global_rule("50").await;
    let item = ctx.item(Uuid::new_v4(), "100.00", "2025-01-15").await;

    let tasks: Vec<_> = (0..6)
        .map(|_| {
            let items = ctx.items.clone();
            let tenant_id = ctx.tenant_id;
            let id = item.id;
            tokio::spawn(async move { items.process_item(tenant_id, id, Uuid::new_v4()).await })
        })
        .collect();

    let mut winners = Vec::new();
    for task in tasks {
        match task.await.expect("Process task panicked") {
            Ok(processed) => winners.push(processed.period_id),
            Err(e) => assert!(matches!(e, AppError::ItemAlreadyProcessed(_)), "unexpected error: {}", e),
        }
    }

    assert_eq!(winners.len(), 1);
    assert_eq!(ctx.store.item(item.id).unwrap().period_id, winners[0]);
}
