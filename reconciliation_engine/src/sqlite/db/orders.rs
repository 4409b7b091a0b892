use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{LineItem, NewOrder, Order, OrderReference, PaymentStatus},
    traits::ReconciliationError,
};

/// Inserts the order into the database, returning `false` in the second slot if an order with
/// the same reference already exists.
pub async fn idempotent_insert(
    order: NewOrder,
    conn: &mut SqliteConnection,
) -> Result<(Order, bool), ReconciliationError> {
    let inserted = match fetch_order_by_reference(&order.reference, conn).await? {
        Some(order) => (order, false),
        None => {
            let order = insert_order(order, conn).await?;
            debug!("🗃️ Order {} inserted with id {}", order.reference, order.id);
            (order, true)
        },
    };
    Ok(inserted)
}

/// Inserts a new order and its line items using the given connection. This is not atomic on its
/// own; embed the call in a transaction and pass `&mut *tx` as the connection argument.
async fn insert_order(order: NewOrder, conn: &mut SqliteConnection) -> Result<Order, ReconciliationError> {
    let inserted: Order = sqlx::query_as(
        r#"
            INSERT INTO orders (reference, customer_id, total_amount, currency, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *;
        "#,
    )
    .bind(order.reference)
    .bind(order.customer_id)
    .bind(order.total_amount)
    .bind(order.currency)
    .bind(order.created_at)
    .fetch_one(&mut *conn)
    .await?;
    for item in order.items {
        sqlx::query("INSERT INTO order_items (order_id, product_id, quantity, unit_price) VALUES ($1, $2, $3, $4)")
            .bind(inserted.id)
            .bind(item.product_id)
            .bind(item.quantity)
            .bind(item.unit_price)
            .execute(&mut *conn)
            .await?;
    }
    Ok(inserted)
}

/// Returns the order correlated with the given reference.
pub async fn fetch_order_by_reference(
    reference: &OrderReference,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE reference = $1")
        .bind(reference.as_str())
        .fetch_optional(conn)
        .await?;
    Ok(order)
}

/// Returns the order that recorded the given gateway transaction id, if any.
pub async fn fetch_order_by_transaction_id(
    transaction_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE gateway_tx_id = $1")
        .bind(transaction_id)
        .fetch_optional(conn)
        .await?;
    Ok(order)
}

/// Returns the line items for an order, in insertion order.
pub async fn fetch_line_items(order_id: i64, conn: &mut SqliteConnection) -> Result<Vec<LineItem>, sqlx::Error> {
    let items = sqlx::query_as("SELECT * FROM order_items WHERE order_id = $1 ORDER BY id")
        .bind(order_id)
        .fetch_all(conn)
        .await?;
    Ok(items)
}

/// The compare-and-swap at the heart of the engine. Moves `payment_status` to `target` only if
/// the stored value still equals `expected`; anything else means another caller got there first
/// and `None` is returned. The first outcome to touch the order also stamps its transaction id,
/// and an approval releases the order to fulfillment in the same statement.
pub async fn transition_payment_status(
    order_id: i64,
    expected: PaymentStatus,
    target: PaymentStatus,
    transaction_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as(
        r#"
            UPDATE orders SET
                payment_status = $1,
                fulfillment_status = CASE
                    WHEN $1 = 'Approved' AND fulfillment_status = 'Pending' THEN 'Processing'
                    ELSE fulfillment_status
                END,
                gateway_tx_id = COALESCE(gateway_tx_id, $2),
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $3 AND payment_status = $4
            RETURNING *;
        "#,
    )
    .bind(target)
    .bind(transaction_id)
    .bind(order_id)
    .bind(expected)
    .fetch_optional(conn)
    .await?;
    Ok(order)
}

/// Marks the order's inventory as fully applied. Returns `false` if the marker was already set.
pub async fn mark_stock_applied(order_id: i64, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let result =
        sqlx::query("UPDATE orders SET stock_applied = 1, updated_at = CURRENT_TIMESTAMP WHERE id = $1 AND stock_applied = 0")
            .bind(order_id)
            .execute(conn)
            .await?;
    Ok(result.rows_affected() > 0)
}
