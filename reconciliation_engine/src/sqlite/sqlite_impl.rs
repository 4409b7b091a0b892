//! `SqliteDatabase` is a concrete reconciliation backend.
//!
//! Unsurprisingly, it uses SQLite, and implements all the traits defined in the
//! [`crate::traits`] module. Both conditional primitives land as single UPDATE statements whose
//! affected-row count decides the winner, so correctness survives any number of concurrent
//! server processes on one store.
use std::fmt::Debug;

use log::*;
use sqlx::SqlitePool;

use super::db::{flags, inventory, new_pool, orders};
use crate::{
    db_types::{LineItem, NewOrder, Order, OrderReference, PaymentStatus},
    traits::{
        FlagKind,
        InventoryManagement,
        OrderManagement,
        ReconciliationDatabase,
        ReconciliationError,
        ReviewFlag,
        StockOutcome,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, ReconciliationError> {
        let pool = new_pool(url, max_connections).await?;
        Ok(Self { url: url.to_string(), pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Brings the schema up to date. Run once at startup (and by the test harness).
    pub async fn run_migrations(&self) -> Result<(), ReconciliationError> {
        sqlx::migrate!("./src/sqlite/migrations")
            .run(&self.pool)
            .await
            .map_err(|e| ReconciliationError::DatabaseError(e.to_string()))
    }
}

impl OrderManagement for SqliteDatabase {
    async fn fetch_order_by_reference(&self, reference: &OrderReference) -> Result<Option<Order>, ReconciliationError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order_by_reference(reference, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_order_by_transaction_id(&self, transaction_id: &str) -> Result<Option<Order>, ReconciliationError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order_by_transaction_id(transaction_id, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_line_items(&self, order_id: i64) -> Result<Vec<LineItem>, ReconciliationError> {
        let mut conn = self.pool.acquire().await?;
        let items = orders::fetch_line_items(order_id, &mut conn).await?;
        Ok(items)
    }

    async fn insert_order(&self, order: NewOrder) -> Result<(Order, bool), ReconciliationError> {
        order.validate()?;
        let mut tx = self.pool.begin().await?;
        let (order, inserted) = orders::idempotent_insert(order, &mut tx).await?;
        tx.commit().await?;
        Ok((order, inserted))
    }
}

impl InventoryManagement for SqliteDatabase {
    async fn set_stock_level(&self, product_id: &str, available: i64) -> Result<(), ReconciliationError> {
        let mut conn = self.pool.acquire().await?;
        inventory::set_stock_level(product_id, available, &mut conn).await?;
        Ok(())
    }

    async fn stock_level(&self, product_id: &str) -> Result<Option<i64>, ReconciliationError> {
        let mut conn = self.pool.acquire().await?;
        let level = inventory::stock_level(product_id, &mut conn).await?;
        Ok(level)
    }
}

impl ReconciliationDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn transition_payment_status(
        &self,
        order_id: i64,
        expected: PaymentStatus,
        target: PaymentStatus,
        transaction_id: &str,
    ) -> Result<Option<Order>, ReconciliationError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::transition_payment_status(order_id, expected, target, transaction_id, &mut conn).await?;
        Ok(order)
    }

    /// Works through the order's line items one store transaction at a time. Per item: claim the
    /// journal slot, then decrement. A claim that fails means the item was applied by an earlier
    /// or concurrent run and is skipped; a decrement that fails rolls the claim back and flags
    /// the item. `stock_applied` is only set once the whole journal exists.
    async fn apply_stock_for_order(&self, order: &Order) -> Result<StockOutcome, ReconciliationError> {
        if order.stock_applied {
            return Ok(StockOutcome::AlreadyApplied);
        }
        let items = self.fetch_line_items(order.id).await?;
        let mut missing = Vec::new();
        for item in &items {
            let mut tx = self.pool.begin().await?;
            let claimed = inventory::record_movement(order.id, &item.product_id, item.quantity, &mut tx).await?;
            if !claimed {
                trace!("🗃️📦️ {} already applied for order {}. Skipping.", item.product_id, order.reference);
                tx.rollback().await?;
                continue;
            }
            if inventory::try_decrement(&item.product_id, item.quantity, &mut tx).await? {
                tx.commit().await?;
                debug!("🗃️📦️ Decremented {} by {} for order {}", item.product_id, item.quantity, order.reference);
            } else {
                tx.rollback().await?;
                warn!(
                    "🗃️📦️ Insufficient stock of {} for order {} (wanted {})",
                    item.product_id, order.reference, item.quantity
                );
                let detail = format!("Cannot decrement {} by {}: insufficient stock", item.product_id, item.quantity);
                let mut conn = self.pool.acquire().await?;
                flags::insert_flag(
                    &order.reference,
                    FlagKind::StockShortfall,
                    &detail,
                    order.gateway_tx_id.as_deref(),
                    &mut conn,
                )
                .await?;
                missing.push(item.product_id.clone());
            }
        }
        if missing.is_empty() {
            let mut conn = self.pool.acquire().await?;
            let newly_marked = orders::mark_stock_applied(order.id, &mut conn).await?;
            Ok(if newly_marked { StockOutcome::Applied } else { StockOutcome::AlreadyApplied })
        } else {
            Ok(StockOutcome::Shortfall(missing))
        }
    }

    async fn record_conflict(
        &self,
        order: &Order,
        incoming: PaymentStatus,
        transaction_id: &str,
    ) -> Result<(), ReconciliationError> {
        let detail = format!("Order is {} but the gateway reported {}", order.payment_status, incoming);
        let mut conn = self.pool.acquire().await?;
        flags::insert_flag(&order.reference, FlagKind::Conflict, &detail, Some(transaction_id), &mut conn).await?;
        Ok(())
    }

    async fn fetch_review_flags(&self, reference: &OrderReference) -> Result<Vec<ReviewFlag>, ReconciliationError> {
        let mut conn = self.pool.acquire().await?;
        let flags = flags::flags_for_reference(reference, &mut conn).await?;
        Ok(flags)
    }

    async fn close(&mut self) -> Result<(), ReconciliationError> {
        self.pool.close().await;
        Ok(())
    }
}
