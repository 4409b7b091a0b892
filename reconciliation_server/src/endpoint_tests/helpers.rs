use std::time::Duration;

use actix_web::{body::MessageBody, http::StatusCode, test, test::TestRequest, web::ServiceConfig, App};
use chrono::{TimeZone, Utc};
use gateway_tools::{helpers::calculate_signature, GatewayConfig, GatewayTransaction, WebhookEvent};
use ors_common::{Money, Secret};
use reconciliation_engine::db_types::{FulfillmentStatus, Order, OrderReference, PaymentStatus};
use serde::Serialize;

use crate::integrations::gateway::{RestGatewayAdapter, SIGNATURE_HEADER};

// Integrity secret for tests. DO NOT re-use this value anywhere.
pub const TEST_SECRET: &str = "test-integrity-secret-000";

/// A real adapter wired to an unreachable gateway: signature verification works, lookups fail
/// fast. Webhook tests get the genuine authenticity gate this way.
pub fn test_adapter() -> RestGatewayAdapter {
    let config = GatewayConfig {
        base_url: "http://127.0.0.1:9".to_string(),
        integrity_secret: Secret::new(TEST_SECRET.to_string()),
        lookup_timeout: Duration::from_secs(1),
    };
    RestGatewayAdapter::new(&config, true).expect("Failed to build test adapter")
}

pub async fn get_request(path: &str, configure: fn(&mut ServiceConfig)) -> (StatusCode, String) {
    let req = TestRequest::get().uri(path).to_request();
    let app = App::new().configure(configure);
    let service = test::init_service(app).await;
    let res = test::call_service(&service, req).await;
    let status = res.status();
    let body = String::from_utf8_lossy(&res.into_body().try_into_bytes().unwrap()).into_owned();
    (status, body)
}

pub async fn post_request<B: Serialize>(
    path: &str,
    headers: Vec<(&'static str, String)>,
    body: &B,
    configure: fn(&mut ServiceConfig),
) -> (StatusCode, String) {
    let mut req = TestRequest::post().uri(path).set_json(body);
    for (name, value) in headers {
        req = req.insert_header((name, value));
    }
    let req = req.to_request();
    let app = App::new().configure(configure);
    let service = test::init_service(app).await;
    let res = test::call_service(&service, req).await;
    let status = res.status();
    let body = String::from_utf8_lossy(&res.into_body().try_into_bytes().unwrap()).into_owned();
    (status, body)
}

pub fn order_fixture(payment_status: PaymentStatus, stock_applied: bool) -> Order {
    let fulfillment_status =
        if payment_status == PaymentStatus::Approved { FulfillmentStatus::Processing } else { FulfillmentStatus::Pending };
    let gateway_tx_id = (payment_status != PaymentStatus::Pending).then(|| "txn-1".to_string());
    Order {
        id: 1,
        reference: OrderReference::from("R-1001"),
        customer_id: "1".to_string(),
        total_amount: Money::from_cents(50000),
        currency: "USD".to_string(),
        payment_status,
        fulfillment_status,
        stock_applied,
        gateway_tx_id,
        created_at: Utc.with_ymd_and_hms(2024, 2, 29, 13, 30, 0).unwrap(),
        updated_at: Utc.with_ymd_and_hms(2024, 2, 29, 13, 30, 0).unwrap(),
    }
}

pub fn webhook_event(status: &str) -> WebhookEvent {
    WebhookEvent {
        event_type: "transaction.updated".to_string(),
        transaction: GatewayTransaction {
            id: "txn-1".to_string(),
            reference: "R-1001".to_string(),
            status: status.to_string(),
            amount_in_cents: 50000,
            currency: "USD".to_string(),
        },
    }
}

pub fn signed_headers(event: &WebhookEvent) -> Vec<(&'static str, String)> {
    vec![(SIGNATURE_HEADER, calculate_signature(TEST_SECRET, &event.transaction))]
}
