use std::sync::atomic::{AtomicUsize, Ordering};

use actix_web::{http::StatusCode, web, web::ServiceConfig};
use reconciliation_engine::{
    db_types::PaymentStatus,
    events::EventProducers,
    traits::StockOutcome,
    ReconcileApi,
};

use super::{
    helpers::{order_fixture, post_request, signed_headers, test_adapter, webhook_event},
    mocks::MockReconDb,
};
use crate::{integrations::gateway::RestGatewayAdapter, routes::GatewayWebhookRoute};

#[actix_web::test]
async fn authentic_approval_settles_the_order() {
    let _ = env_logger::try_init().ok();
    let event = webhook_event("approved");
    let (status, body) = post_request("/gateway/webhook", signed_headers(&event), &event, configure_approval).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(r#""success":true"#), "unexpected body: {body}");
    assert!(body.contains("Outcome applied."), "unexpected body: {body}");
}

#[actix_web::test]
async fn replayed_webhooks_are_acknowledged() {
    let _ = env_logger::try_init().ok();
    let event = webhook_event("approved");
    let (status, body) = post_request("/gateway/webhook", signed_headers(&event), &event, configure_replay).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Already applied."), "unexpected body: {body}");
}

#[actix_web::test]
async fn tampered_signatures_change_nothing() {
    let _ = env_logger::try_init().ok();
    let event = webhook_event("approved");
    let mut headers = signed_headers(&event);
    headers[0].1.replace_range(0..6, "zzzzzz");
    // the untouched-db configuration panics on any store call
    let (status, body) = post_request("/gateway/webhook", headers, &event, configure_untouched).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("signature does not match"), "unexpected body: {body}");
}

#[actix_web::test]
async fn unsigned_webhooks_are_rejected() {
    let _ = env_logger::try_init().ok();
    let event = webhook_event("approved");
    let (status, body) = post_request("/gateway/webhook", vec![], &event, configure_untouched).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("No webhook signature"), "unexpected body: {body}");
}

#[actix_web::test]
async fn early_webhooks_are_acknowledged_without_effect() {
    // the webhook can legitimately outrun the order-creation write; the gateway must still get
    // a 200 so its scheduled redelivery can land later
    let _ = env_logger::try_init().ok();
    let event = webhook_event("approved");
    let (status, body) = post_request("/gateway/webhook", signed_headers(&event), &event, configure_no_order).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(r#""success":false"#), "unexpected body: {body}");
    assert!(body.contains("Order not found."), "unexpected body: {body}");
}

#[actix_web::test]
async fn authentic_gibberish_is_acknowledged_and_flagged_in_logs() {
    let _ = env_logger::try_init().ok();
    let event = webhook_event("halted_sideways");
    let (status, body) = post_request("/gateway/webhook", signed_headers(&event), &event, configure_untouched).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Unknown transaction status"), "unexpected body: {body}");
}

#[actix_web::test]
async fn conflicting_signals_are_flagged_not_applied() {
    let _ = env_logger::try_init().ok();
    let event = webhook_event("declined");
    let (status, body) = post_request("/gateway/webhook", signed_headers(&event), &event, configure_conflict).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Conflicting signal recorded for review."), "unexpected body: {body}");
}

fn register(cfg: &mut ServiceConfig, db: MockReconDb) {
    let api = ReconcileApi::new(db, EventProducers::default());
    cfg.service(web::scope("/gateway").service(GatewayWebhookRoute::<MockReconDb, RestGatewayAdapter>::new()))
        .app_data(web::Data::new(api))
        .app_data(web::Data::new(test_adapter()));
}

fn configure_approval(cfg: &mut ServiceConfig) {
    let mut db = MockReconDb::new();
    let fetches = AtomicUsize::new(0);
    db.expect_fetch_order_by_reference().returning(move |_| {
        // pending before the transition, settled on the post-transition re-read
        let settled = fetches.fetch_add(1, Ordering::SeqCst) > 0;
        Ok(Some(if settled {
            order_fixture(PaymentStatus::Approved, true)
        } else {
            order_fixture(PaymentStatus::Pending, false)
        }))
    });
    db.expect_transition_payment_status()
        .withf(|_, expected, target, _| *expected == PaymentStatus::Pending && *target == PaymentStatus::Approved)
        .returning(|_, _, _, _| Ok(Some(order_fixture(PaymentStatus::Approved, false))));
    db.expect_apply_stock_for_order().returning(|_| Ok(StockOutcome::Applied));
    register(cfg, db);
}

fn configure_replay(cfg: &mut ServiceConfig) {
    let mut db = MockReconDb::new();
    db.expect_fetch_order_by_reference().returning(|_| Ok(Some(order_fixture(PaymentStatus::Approved, true))));
    register(cfg, db);
}

fn configure_untouched(cfg: &mut ServiceConfig) {
    // no expectations: any store access panics the test
    register(cfg, MockReconDb::new());
}

fn configure_no_order(cfg: &mut ServiceConfig) {
    let mut db = MockReconDb::new();
    db.expect_fetch_order_by_reference().returning(|_| Ok(None));
    register(cfg, db);
}

fn configure_conflict(cfg: &mut ServiceConfig) {
    let mut db = MockReconDb::new();
    db.expect_fetch_order_by_reference().returning(|_| Ok(Some(order_fixture(PaymentStatus::Approved, true))));
    db.expect_record_conflict()
        .withf(|order, incoming, _| {
            order.payment_status == PaymentStatus::Approved && *incoming == PaymentStatus::Declined
        })
        .returning(|_, _, _| Ok(()));
    register(cfg, db);
}
