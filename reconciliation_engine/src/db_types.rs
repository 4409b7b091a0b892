use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use log::error;
use ors_common::Money;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

use crate::traits::ReconciliationError;

//--------------------------------------   OrderReference   ----------------------------------------------------------
/// The caller-supplied idempotent reference that correlates an order with gateway transactions.
///
/// Gateways only ever see this string, never the store-internal order id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct OrderReference(pub String);

impl FromStr for OrderReference {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for OrderReference {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for OrderReference {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Display for OrderReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl OrderReference {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, Error)]
#[error("Invalid status value: {0}")]
pub struct ConversionError(String);

impl ConversionError {
    pub fn new<S: Into<String>>(msg: S) -> Self {
        Self(msg.into())
    }
}

//--------------------------------------   PaymentStatus   -----------------------------------------------------------
/// Settlement state of an order.
///
/// `Approved`, `Declined` and `Voided` are terminal: the engine never transitions out of them.
/// `Error` exists in the stored vocabulary for the administrative override path, but the engine
/// itself only ever writes terminal states (provider errors are folded into `Declined` before
/// they reach the store).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum PaymentStatus {
    /// No definitive gateway signal has been applied yet.
    Pending,
    /// The payment settled; stock is (being) applied.
    Approved,
    /// The gateway reported the payment as failed.
    Declined,
    /// The transaction was reversed at the gateway.
    Voided,
    /// Administrative quarantine state.
    Error,
}

impl PaymentStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PaymentStatus::Approved | PaymentStatus::Declined | PaymentStatus::Voided)
    }
}

impl Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentStatus::Pending => write!(f, "Pending"),
            PaymentStatus::Approved => write!(f, "Approved"),
            PaymentStatus::Declined => write!(f, "Declined"),
            PaymentStatus::Voided => write!(f, "Voided"),
            PaymentStatus::Error => write!(f, "Error"),
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Approved" => Ok(Self::Approved),
            "Declined" => Ok(Self::Declined),
            "Voided" => Ok(Self::Voided),
            "Error" => Ok(Self::Error),
            s => Err(ConversionError(format!("Invalid payment status: {s}"))),
        }
    }
}

impl From<String> for PaymentStatus {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid payment status: {value}. But this conversion cannot fail. Defaulting to Pending");
            PaymentStatus::Pending
        })
    }
}

//--------------------------------------  FulfillmentStatus  ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum FulfillmentStatus {
    /// Awaiting an approved payment.
    Pending,
    /// Payment approved; handed to the fulfillment pipeline.
    Processing,
    Shipped,
    Delivered,
    /// Set by the manual cancellation path, outside this engine.
    Cancelled,
}

impl Display for FulfillmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FulfillmentStatus::Pending => write!(f, "Pending"),
            FulfillmentStatus::Processing => write!(f, "Processing"),
            FulfillmentStatus::Shipped => write!(f, "Shipped"),
            FulfillmentStatus::Delivered => write!(f, "Delivered"),
            FulfillmentStatus::Cancelled => write!(f, "Cancelled"),
        }
    }
}

impl FromStr for FulfillmentStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Processing" => Ok(Self::Processing),
            "Shipped" => Ok(Self::Shipped),
            "Delivered" => Ok(Self::Delivered),
            "Cancelled" => Ok(Self::Cancelled),
            s => Err(ConversionError(format!("Invalid fulfillment status: {s}"))),
        }
    }
}

//--------------------------------------   OutcomeStatus   -----------------------------------------------------------
/// Normalized transaction status as reported by a gateway adapter.
///
/// This is the closed vocabulary the engine operates on; provider-specific status strings are
/// folded into it exactly once, at the adapter boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutcomeStatus {
    Approved,
    Declined,
    Voided,
    Pending,
    Error,
}

impl OutcomeStatus {
    /// The payment status this outcome drives the order towards. `None` means the outcome is
    /// not actionable (the gateway has not settled yet).
    ///
    /// Provider `Error` reports are definitive failures of the attempt and map to `Declined`;
    /// transport-level trouble never becomes an outcome at all.
    pub fn target_payment_status(&self) -> Option<PaymentStatus> {
        match self {
            OutcomeStatus::Approved => Some(PaymentStatus::Approved),
            OutcomeStatus::Declined | OutcomeStatus::Error => Some(PaymentStatus::Declined),
            OutcomeStatus::Voided => Some(PaymentStatus::Voided),
            OutcomeStatus::Pending => None,
        }
    }
}

impl Display for OutcomeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutcomeStatus::Approved => write!(f, "Approved"),
            OutcomeStatus::Declined => write!(f, "Declined"),
            OutcomeStatus::Voided => write!(f, "Voided"),
            OutcomeStatus::Pending => write!(f, "Pending"),
            OutcomeStatus::Error => write!(f, "Error"),
        }
    }
}

//--------------------------------------   GatewayOutcome   ----------------------------------------------------------
/// A normalized gateway signal, produced by an adapter from either ingestion path.
///
/// Transient value object; it is never persisted and carries no identity beyond the transaction
/// it names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayOutcome {
    /// The gateway's transaction identifier.
    pub transaction_id: String,
    /// The order reference the transaction settles.
    pub order_reference: OrderReference,
    /// The transacted amount.
    pub amount: Money,
    /// ISO-4217 currency code.
    pub currency: String,
    pub status: OutcomeStatus,
}

//--------------------------------------        Order       ----------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub reference: OrderReference,
    pub customer_id: String,
    pub total_amount: Money,
    pub currency: String,
    pub payment_status: PaymentStatus,
    pub fulfillment_status: FulfillmentStatus,
    /// True once inventory has been decremented for this order. Never unset.
    pub stock_applied: bool,
    /// The transaction id of the first reconciled outcome, if any.
    pub gateway_tx_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------      LineItem      ----------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct LineItem {
    pub id: i64,
    pub order_id: i64,
    pub product_id: String,
    pub quantity: i64,
    /// Price per unit at order time. A snapshot; never re-read from the catalog.
    pub unit_price: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewLineItem {
    pub product_id: String,
    pub quantity: i64,
    pub unit_price: Money,
}

impl NewLineItem {
    pub fn new<S: Into<String>>(product_id: S, quantity: i64, unit_price: Money) -> Self {
        Self { product_id: product_id.into(), quantity, unit_price }
    }

    pub fn subtotal(&self) -> Money {
        self.unit_price * self.quantity
    }
}

//--------------------------------------      NewOrder      ----------------------------------------------------------
/// A not-yet-stored order, handed in by the order-creation collaborator.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub reference: OrderReference,
    pub customer_id: String,
    /// The declared total. Must match the sum of line subtotals to within one cent.
    pub total_amount: Money,
    pub currency: String,
    pub items: Vec<NewLineItem>,
    pub created_at: DateTime<Utc>,
}

impl NewOrder {
    pub fn new(reference: OrderReference, customer_id: String, total_amount: Money, items: Vec<NewLineItem>) -> Self {
        Self { reference, customer_id, total_amount, currency: "USD".to_string(), items, created_at: Utc::now() }
    }

    /// Checks the invariants the store refuses to persist without: at least one line item,
    /// positive quantities, and a declared total within rounding tolerance of the item sum.
    pub fn validate(&self) -> Result<(), ReconciliationError> {
        if self.items.is_empty() {
            return Err(ReconciliationError::EmptyOrder(self.reference.clone()));
        }
        if self.items.iter().any(|i| i.quantity <= 0) {
            return Err(ReconciliationError::NonPositiveQuantity(self.reference.clone()));
        }
        let computed: Money = self.items.iter().map(NewLineItem::subtotal).sum();
        if !self.total_amount.is_within_tolerance_of(computed) {
            return Err(ReconciliationError::InconsistentTotal {
                reference: self.reference.clone(),
                declared: self.total_amount,
                computed,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn outcome_status_mapping() {
        assert_eq!(OutcomeStatus::Approved.target_payment_status(), Some(PaymentStatus::Approved));
        assert_eq!(OutcomeStatus::Declined.target_payment_status(), Some(PaymentStatus::Declined));
        assert_eq!(OutcomeStatus::Error.target_payment_status(), Some(PaymentStatus::Declined));
        assert_eq!(OutcomeStatus::Voided.target_payment_status(), Some(PaymentStatus::Voided));
        assert_eq!(OutcomeStatus::Pending.target_payment_status(), None);
    }

    #[test]
    fn terminal_statuses() {
        assert!(PaymentStatus::Approved.is_terminal());
        assert!(PaymentStatus::Declined.is_terminal());
        assert!(PaymentStatus::Voided.is_terminal());
        assert!(!PaymentStatus::Pending.is_terminal());
        assert!(!PaymentStatus::Error.is_terminal());
    }

    #[test]
    fn payment_status_round_trip() {
        for status in
            [PaymentStatus::Pending, PaymentStatus::Approved, PaymentStatus::Declined, PaymentStatus::Voided]
        {
            assert_eq!(status.to_string().parse::<PaymentStatus>().unwrap(), status);
        }
        assert!("Paid".parse::<PaymentStatus>().is_err());
    }

    fn two_item_order(total: Money) -> NewOrder {
        let items =
            vec![NewLineItem::new("prod-1", 2, Money::from_cents(15000)), NewLineItem::new("prod-2", 1, Money::from_cents(20000))];
        NewOrder::new(OrderReference::from("R-1001"), "cust-7".to_string(), total, items)
    }

    #[test]
    fn order_totals_must_be_consistent() {
        assert!(two_item_order(Money::from_cents(50000)).validate().is_ok());
        // one cent of rounding slack is absorbed
        assert!(two_item_order(Money::from_cents(50001)).validate().is_ok());
        let err = two_item_order(Money::from_cents(50002)).validate().unwrap_err();
        assert!(matches!(err, ReconciliationError::InconsistentTotal { .. }));
    }

    #[test]
    fn orders_need_items() {
        let order = NewOrder::new(OrderReference::from("R-2"), "c".to_string(), Money::from_cents(0), vec![]);
        assert!(matches!(order.validate().unwrap_err(), ReconciliationError::EmptyOrder(_)));
    }
}
