use std::sync::atomic::{AtomicUsize, Ordering};

use actix_web::{http::StatusCode, web, web::ServiceConfig};
use gateway_tools::GatewayApiError;
use ors_common::Money;
use reconciliation_engine::{
    db_types::{FulfillmentStatus, GatewayOutcome, OrderReference, OutcomeStatus, PaymentStatus},
    events::EventProducers,
    traits::StockOutcome,
    ReconcileApi,
};

use super::{
    helpers::{get_request, order_fixture},
    mocks::{MockAdapter, MockReconDb},
};
use crate::{data_objects::VerificationResult, routes::VerifyPaymentRoute};

fn gateway_outcome(status: OutcomeStatus) -> GatewayOutcome {
    GatewayOutcome {
        transaction_id: "txn-1".to_string(),
        order_reference: OrderReference::from("R-1001"),
        amount: Money::from_cents(50000),
        currency: "USD".to_string(),
        status,
    }
}

#[actix_web::test]
async fn verification_settles_and_reports_the_order() {
    let _ = env_logger::try_init().ok();
    let (status, body) = get_request("/payments/verify/txn-1", configure_settles).await;
    assert_eq!(status, StatusCode::OK);
    let result: VerificationResult = serde_json::from_str(&body).expect("body did not parse");
    assert_eq!(result.payment_status, PaymentStatus::Approved);
    assert_eq!(result.fulfillment_status, FulfillmentStatus::Processing);
    assert_eq!(result.total_amount, Money::from_cents(50000));
}

#[actix_web::test]
async fn pending_transactions_report_the_stored_state() {
    let _ = env_logger::try_init().ok();
    let (status, body) = get_request("/payments/verify/txn-1", configure_pending).await;
    assert_eq!(status, StatusCode::OK);
    let result: VerificationResult = serde_json::from_str(&body).expect("body did not parse");
    assert_eq!(result.payment_status, PaymentStatus::Pending);
}

#[actix_web::test]
async fn gateway_outages_degrade_to_last_known_state() {
    let _ = env_logger::try_init().ok();
    let (status, body) = get_request("/payments/verify/txn-1", configure_outage_with_history).await;
    assert_eq!(status, StatusCode::OK);
    let result: VerificationResult = serde_json::from_str(&body).expect("body did not parse");
    assert_eq!(result.payment_status, PaymentStatus::Approved);
}

#[actix_web::test]
async fn gateway_outages_without_history_are_not_guessed() {
    let _ = env_logger::try_init().ok();
    let (status, body) = get_request("/payments/verify/txn-1", configure_outage_blank).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body.contains("Payment status unknown"), "unexpected body: {body}");
}

#[actix_web::test]
async fn unknown_references_are_not_found() {
    let _ = env_logger::try_init().ok();
    let (status, body) = get_request("/payments/verify/txn-1", configure_no_order).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.contains("No order correlates"), "unexpected body: {body}");
}

fn register(cfg: &mut ServiceConfig, db: MockReconDb, adapter: MockAdapter) {
    let api = ReconcileApi::new(db, EventProducers::default());
    cfg.service(web::scope("/payments").service(VerifyPaymentRoute::<MockReconDb, MockAdapter>::new()))
        .app_data(web::Data::new(api))
        .app_data(web::Data::new(adapter));
}

fn configure_settles(cfg: &mut ServiceConfig) {
    let mut adapter = MockAdapter::new();
    adapter
        .expect_fetch_transaction()
        .withf(|tx_id| tx_id == "txn-1")
        .returning(|_| Ok(gateway_outcome(OutcomeStatus::Approved)));
    let mut db = MockReconDb::new();
    let fetches = AtomicUsize::new(0);
    db.expect_fetch_order_by_reference().returning(move |_| {
        let settled = fetches.fetch_add(1, Ordering::SeqCst) > 0;
        Ok(Some(if settled {
            order_fixture(PaymentStatus::Approved, true)
        } else {
            order_fixture(PaymentStatus::Pending, false)
        }))
    });
    db.expect_transition_payment_status()
        .returning(|_, _, _, _| Ok(Some(order_fixture(PaymentStatus::Approved, false))));
    db.expect_apply_stock_for_order().returning(|_| Ok(StockOutcome::Applied));
    register(cfg, db, adapter);
}

fn configure_pending(cfg: &mut ServiceConfig) {
    let mut adapter = MockAdapter::new();
    adapter.expect_fetch_transaction().returning(|_| Ok(gateway_outcome(OutcomeStatus::Pending)));
    let mut db = MockReconDb::new();
    db.expect_fetch_order_by_reference().returning(|_| Ok(Some(order_fixture(PaymentStatus::Pending, false))));
    register(cfg, db, adapter);
}

fn configure_outage_with_history(cfg: &mut ServiceConfig) {
    let mut adapter = MockAdapter::new();
    adapter.expect_fetch_transaction().returning(|_| Err(GatewayApiError::Timeout.into()));
    let mut db = MockReconDb::new();
    db.expect_fetch_order_by_transaction_id()
        .withf(|tx_id| tx_id == "txn-1")
        .returning(|_| Ok(Some(order_fixture(PaymentStatus::Approved, true))));
    register(cfg, db, adapter);
}

fn configure_outage_blank(cfg: &mut ServiceConfig) {
    let mut adapter = MockAdapter::new();
    adapter.expect_fetch_transaction().returning(|_| Err(GatewayApiError::Timeout.into()));
    let mut db = MockReconDb::new();
    db.expect_fetch_order_by_transaction_id().returning(|_| Ok(None));
    register(cfg, db, adapter);
}

fn configure_no_order(cfg: &mut ServiceConfig) {
    let mut adapter = MockAdapter::new();
    adapter.expect_fetch_transaction().returning(|_| Ok(gateway_outcome(OutcomeStatus::Approved)));
    let mut db = MockReconDb::new();
    db.expect_fetch_order_by_reference().returning(|_| Ok(None));
    register(cfg, db, adapter);
}
