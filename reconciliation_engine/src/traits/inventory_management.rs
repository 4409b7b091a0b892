use crate::traits::ReconciliationError;

/// The slice of the catalog collaborator's inventory the engine is allowed to touch.
///
/// The conditional decrement itself is not exposed here: it only ever runs inside
/// [`ReconciliationDatabase::apply_stock_for_order`](crate::traits::ReconciliationDatabase),
/// where it is journaled. These methods exist for seeding and observing stock levels.
#[allow(async_fn_in_trait)]
pub trait InventoryManagement {
    /// Creates or replaces the available quantity for a product.
    async fn set_stock_level(&self, product_id: &str, available: i64) -> Result<(), ReconciliationError>;

    /// Returns the available quantity for a product, or `None` for unknown products.
    async fn stock_level(&self, product_id: &str) -> Result<Option<i64>, ReconciliationError>;
}
