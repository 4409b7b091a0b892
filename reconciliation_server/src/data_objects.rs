use std::fmt::Display;

use ors_common::Money;
use reconciliation_engine::db_types::{FulfillmentStatus, Order, PaymentStatus};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }

    pub fn failure<S: Display>(message: S) -> Self {
        Self { success: false, message: message.to_string() }
    }
}

/// The normalized order view the verification endpoint serves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub payment_status: PaymentStatus,
    pub fulfillment_status: FulfillmentStatus,
    pub total_amount: Money,
}

impl From<&Order> for VerificationResult {
    fn from(order: &Order) -> Self {
        Self {
            payment_status: order.payment_status,
            fulfillment_status: order.fulfillment_status,
            total_amount: order.total_amount,
        }
    }
}
