use crate::{
    db_types::{LineItem, NewOrder, Order, OrderReference},
    traits::ReconciliationError,
};

/// Read access to orders, plus the order-creation collaborator's entry point.
///
/// Order creation itself happens upstream at checkout time; `insert_order` is the contract that
/// collaborator writes through. It is idempotent and enforces the amount-consistency bound, so
/// an order whose declared total disagrees with its line items by more than rounding noise never
/// exists in the store.
#[allow(async_fn_in_trait)]
pub trait OrderManagement {
    /// Fetches the order correlated with the given gateway-facing reference.
    async fn fetch_order_by_reference(&self, reference: &OrderReference) -> Result<Option<Order>, ReconciliationError>;

    /// Fetches the order that recorded the given gateway transaction id, if any has.
    async fn fetch_order_by_transaction_id(&self, transaction_id: &str) -> Result<Option<Order>, ReconciliationError>;

    /// Fetches the line items for an order.
    async fn fetch_line_items(&self, order_id: i64) -> Result<Vec<LineItem>, ReconciliationError>;

    /// Validates and stores a new order in `Pending` state, in a single atomic transaction.
    /// This call is idempotent: if an order with the same reference exists, it is returned
    /// unchanged with `false` in the second slot.
    async fn insert_order(&self, order: NewOrder) -> Result<(Order, bool), ReconciliationError>;
}
