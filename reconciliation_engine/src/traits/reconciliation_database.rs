use ors_common::Money;
use thiserror::Error;

use crate::{
    db_types::{Order, OrderReference, PaymentStatus},
    traits::{OrderManagement, ReviewFlag, StockOutcome},
};

/// The storage contract the reconciliation engine drives.
///
/// Everything concurrency-sensitive in the system funnels through the two conditional writes
/// defined here. No backend method may ever implement them as a read followed by a write: the
/// gap between the two is exactly where duplicate and concurrent gateway signals corrupt state.
#[allow(async_fn_in_trait)]
pub trait ReconciliationDatabase: OrderManagement {
    /// The URL of the database.
    fn url(&self) -> &str;

    /// Atomically moves an order's payment status from `expected` to `target`, recording the
    /// gateway transaction id on first contact. The write applies only if the stored status
    /// still equals `expected` (compare-and-swap); `None` means another caller transitioned the
    /// order first and the engine must re-read.
    ///
    /// A transition into `Approved` also moves a `Pending` fulfillment status to `Processing`,
    /// in the same statement.
    async fn transition_payment_status(
        &self,
        order_id: i64,
        expected: PaymentStatus,
        target: PaymentStatus,
        transaction_id: &str,
    ) -> Result<Option<Order>, ReconciliationError>;

    /// Applies the order's inventory effect, at most once per line item.
    ///
    /// Each line item is decremented through a journal insert plus conditional decrement in one
    /// store transaction, so the operation is safe to call any number of times, from any number
    /// of processes, including to resume a run that crashed halfway. Items that cannot be
    /// covered are flagged for review and reported in [`StockOutcome::Shortfall`]; the order's
    /// `stock_applied` marker is only set once every item has been journaled.
    async fn apply_stock_for_order(&self, order: &Order) -> Result<StockOutcome, ReconciliationError>;

    /// Records a conflicting terminal signal for manual review. Never mutates the order.
    async fn record_conflict(
        &self,
        order: &Order,
        incoming: PaymentStatus,
        transaction_id: &str,
    ) -> Result<(), ReconciliationError>;

    /// Fetches the review flags recorded against an order reference, oldest first.
    async fn fetch_review_flags(&self, reference: &OrderReference) -> Result<Vec<ReviewFlag>, ReconciliationError>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), ReconciliationError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Error)]
pub enum ReconciliationError {
    #[error("We have an internal database engine error (configuration/uptime etc.): {0}")]
    DatabaseError(String),
    #[error("No order exists for reference {0}")]
    OrderNotFound(OrderReference),
    #[error("Gave up reconciling order {0}: the payment status kept moving underneath us")]
    TransitionContention(OrderReference),
    #[error("Order {0} has no line items")]
    EmptyOrder(OrderReference),
    #[error("Order {0} has a line item with a non-positive quantity")]
    NonPositiveQuantity(OrderReference),
    #[error("Order {reference} declares a total of {declared} but its line items sum to {computed}")]
    InconsistentTotal { reference: OrderReference, declared: Money, computed: Money },
}

impl From<sqlx::Error> for ReconciliationError {
    fn from(e: sqlx::Error) -> Self {
        ReconciliationError::DatabaseError(e.to_string())
    }
}
