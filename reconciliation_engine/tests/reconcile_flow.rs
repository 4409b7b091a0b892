//! End-to-end tests for the reconciliation flow against a real (throwaway) SQLite store.
//!
//! These cover the properties the engine exists for: idempotent replays, convergence when both
//! ingestion paths race on the same order, terminal states that are never overwritten, and
//! shortfall handling that keeps the paid order but flags the gap.
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use reconciliation_engine::{
    db_types::{OutcomeStatus, PaymentStatus},
    events::{EventHandler, EventProducers, Handler, StockShortfallEvent},
    traits::FlagKind,
    InventoryManagement,
    OrderManagement,
    ReconcileApi,
    ReconcileResult,
    ReconciliationDatabase,
    ReconciliationError,
    StockOutcome,
};
use tokio::sync::Barrier;

mod support;

use support::{outcome, prepare_test_env, seed_order};

#[tokio::test]
async fn pending_outcomes_are_noops() {
    let db = prepare_test_env().await;
    let order = seed_order(&db, "R-0001", &[("widget", 1, 1000, 5)]).await;
    let api = ReconcileApi::new(db, EventProducers::default());

    let result = api
        .reconcile(&order.reference, &outcome("R-0001", "txn-1", 1000, OutcomeStatus::Pending))
        .await
        .expect("reconcile failed");
    assert_eq!(result, ReconcileResult::NoChange);

    let stored = api.db().fetch_order_by_reference(&order.reference).await.unwrap().unwrap();
    assert_eq!(stored.payment_status, PaymentStatus::Pending);
    assert!(stored.gateway_tx_id.is_none());
    assert_eq!(api.db().stock_level("widget").await.unwrap(), Some(5));
}

#[tokio::test]
async fn replayed_approvals_decrement_stock_exactly_once() {
    let db = prepare_test_env().await;
    let order = seed_order(&db, "R-0002", &[("widget", 2, 1000, 10)]).await;
    let api = ReconcileApi::new(db, EventProducers::default());
    let approved = outcome("R-0002", "txn-2", 2000, OutcomeStatus::Approved);

    let first = api.reconcile(&order.reference, &approved).await.unwrap();
    let ReconcileResult::Transitioned { order: updated, stock } = first else {
        panic!("expected a transition, got {first:?}");
    };
    assert_eq!(updated.payment_status, PaymentStatus::Approved);
    assert!(updated.stock_applied);
    assert_eq!(updated.gateway_tx_id.as_deref(), Some("txn-2"));
    assert_eq!(stock, StockOutcome::Applied);

    // the gateway redelivers the same webhook
    let second = api.reconcile(&order.reference, &approved).await.unwrap();
    let ReconcileResult::AlreadyApplied { stock, .. } = second else {
        panic!("expected an idempotent replay, got {second:?}");
    };
    assert_eq!(stock, StockOutcome::AlreadyApplied);
    assert_eq!(api.db().stock_level("widget").await.unwrap(), Some(8));
}

#[tokio::test]
async fn terminal_states_are_never_overwritten() {
    let db = prepare_test_env().await;
    let order = seed_order(&db, "R-0003", &[("widget", 1, 4400, 3)]).await;
    let api = ReconcileApi::new(db, EventProducers::default());

    let declined = api
        .reconcile(&order.reference, &outcome("R-0003", "txn-3", 4400, OutcomeStatus::Declined))
        .await
        .unwrap();
    assert!(matches!(declined, ReconcileResult::Transitioned { .. }));

    // a late approval for the same reference must not win
    let late = api
        .reconcile(&order.reference, &outcome("R-0003", "txn-3b", 4400, OutcomeStatus::Approved))
        .await
        .unwrap();
    let ReconcileResult::ConflictFlagged { order: stored, incoming } = late else {
        panic!("expected a flagged conflict, got {late:?}");
    };
    assert_eq!(stored.payment_status, PaymentStatus::Declined);
    assert_eq!(incoming, PaymentStatus::Approved);

    let flags = api.db().fetch_review_flags(&order.reference).await.unwrap();
    assert_eq!(flags.len(), 1);
    assert_eq!(flags[0].kind, FlagKind::Conflict);
    // no stock moved for a declined order
    assert_eq!(api.db().stock_level("widget").await.unwrap(), Some(3));
}

#[tokio::test]
async fn error_outcomes_settle_as_declined() {
    let db = prepare_test_env().await;
    let order = seed_order(&db, "R-0004", &[("widget", 1, 500, 1)]).await;
    let api = ReconcileApi::new(db, EventProducers::default());

    let result = api.reconcile(&order.reference, &outcome("R-0004", "txn-4", 500, OutcomeStatus::Error)).await.unwrap();
    let ReconcileResult::Transitioned { order: stored, stock } = result else {
        panic!("expected a transition, got {result:?}");
    };
    assert_eq!(stored.payment_status, PaymentStatus::Declined);
    assert_eq!(stock, StockOutcome::NotApplicable);
}

#[tokio::test]
async fn unknown_references_are_reported() {
    let db = prepare_test_env().await;
    let api = ReconcileApi::new(db, EventProducers::default());
    let ghost = outcome("R-9999", "txn-9", 100, OutcomeStatus::Approved);

    let err = api.reconcile(&ghost.order_reference, &ghost).await.unwrap_err();
    assert!(matches!(err, ReconciliationError::OrderNotFound(_)));
}

/// The scenario from the design discussion: order R-1001 with two line items totaling 50000;
/// the webhook and the verification poll deliver the approval simultaneously. Exactly one
/// inventory decrement per product must survive.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_approvals_converge() {
    let db = prepare_test_env().await;
    let order = seed_order(&db, "R-1001", &[("hoodie", 2, 15000, 10), ("mug", 1, 20000, 4)]).await;
    let barrier = Arc::new(Barrier::new(2));

    let mut tasks = Vec::new();
    for _ in 0..2 {
        // the same transaction arriving via both ingestion paths at once
        let db = db.clone();
        let barrier = Arc::clone(&barrier);
        let reference = order.reference.clone();
        let approved = outcome("R-1001", "txn-hook", 50000, OutcomeStatus::Approved);
        tasks.push(tokio::spawn(async move {
            let api = ReconcileApi::new(db, EventProducers::default());
            barrier.wait().await;
            api.reconcile(&reference, &approved).await
        }));
    }
    let mut winners = 0;
    for task in tasks {
        let result = task.await.unwrap().expect("reconcile failed under contention");
        match result {
            ReconcileResult::Transitioned { .. } => winners += 1,
            ReconcileResult::AlreadyApplied { .. } => {},
            other => panic!("unexpected result under race: {other:?}"),
        }
    }
    assert_eq!(winners, 1, "exactly one caller may win the transition");

    let stored = db.fetch_order_by_reference(&order.reference).await.unwrap().unwrap();
    assert_eq!(stored.payment_status, PaymentStatus::Approved);
    assert!(stored.stock_applied);
    assert_eq!(db.stock_level("hoodie").await.unwrap(), Some(8));
    assert_eq!(db.stock_level("mug").await.unwrap(), Some(3));
}

#[tokio::test]
async fn shortfalls_flag_the_order_and_resume_after_restock() {
    let db = prepare_test_env().await;
    let order = seed_order(&db, "R-0005", &[("hoodie", 3, 1000, 1), ("mug", 1, 2000, 5)]).await;

    let shortfalls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&shortfalls);
    let hook: Handler<StockShortfallEvent> = Arc::new(move |ev| {
        let seen = Arc::clone(&seen);
        Box::pin(async move {
            assert_eq!(ev.missing, vec!["hoodie".to_string()]);
            seen.fetch_add(1, Ordering::SeqCst);
        })
    });
    let handler = EventHandler::new(8, hook);
    let producers = EventProducers { stock_shortfall_producer: vec![handler.subscribe()], ..Default::default() };
    let api = ReconcileApi::new(db.clone(), producers);
    let running = tokio::spawn(handler.start_handler());

    let approved = outcome("R-0005", "txn-5", 5000, OutcomeStatus::Approved);
    let result = api.reconcile(&order.reference, &approved).await.unwrap();
    let ReconcileResult::Transitioned { order: stored, stock } = result else {
        panic!("expected a transition, got {result:?}");
    };
    // the payment stands even though stock could not cover it
    assert_eq!(stored.payment_status, PaymentStatus::Approved);
    assert!(!stored.stock_applied);
    assert_eq!(stock, StockOutcome::Shortfall(vec!["hoodie".to_string()]));
    // the coverable item was applied, the short item was not
    assert_eq!(db.stock_level("mug").await.unwrap(), Some(4));
    assert_eq!(db.stock_level("hoodie").await.unwrap(), Some(1));
    let flags = db.fetch_review_flags(&order.reference).await.unwrap();
    assert_eq!(flags.len(), 1);
    assert_eq!(flags[0].kind, FlagKind::StockShortfall);

    // operator restocks; the next replay completes the journal without touching the mug again
    db.set_stock_level("hoodie", 3).await.unwrap();
    let replay = api.reconcile(&order.reference, &approved).await.unwrap();
    let ReconcileResult::AlreadyApplied { order: stored, stock } = replay else {
        panic!("expected a resuming replay, got {replay:?}");
    };
    assert!(stored.stock_applied);
    assert_eq!(stock, StockOutcome::Applied);
    assert_eq!(db.stock_level("hoodie").await.unwrap(), Some(0));
    assert_eq!(db.stock_level("mug").await.unwrap(), Some(4));

    drop(api);
    running.await.unwrap();
    assert_eq!(shortfalls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn verification_can_find_orders_by_transaction_id() {
    let db = prepare_test_env().await;
    let order = seed_order(&db, "R-0006", &[("widget", 1, 900, 2)]).await;
    let api = ReconcileApi::new(db, EventProducers::default());

    assert!(api.db().fetch_order_by_transaction_id("txn-6").await.unwrap().is_none());
    api.reconcile(&order.reference, &outcome("R-0006", "txn-6", 900, OutcomeStatus::Approved)).await.unwrap();
    let found = api.db().fetch_order_by_transaction_id("txn-6").await.unwrap().unwrap();
    assert_eq!(found.reference, order.reference);
}
