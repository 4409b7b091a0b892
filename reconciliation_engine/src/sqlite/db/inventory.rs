use sqlx::SqliteConnection;

/// Creates or replaces the available quantity for a product.
pub async fn set_stock_level(product_id: &str, available: i64, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
            INSERT INTO inventory (product_id, available) VALUES ($1, $2)
            ON CONFLICT (product_id) DO UPDATE SET available = excluded.available, updated_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(product_id)
    .bind(available)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn stock_level(product_id: &str, conn: &mut SqliteConnection) -> Result<Option<i64>, sqlx::Error> {
    sqlx::query_scalar("SELECT available FROM inventory WHERE product_id = $1")
        .bind(product_id)
        .fetch_optional(conn)
        .await
}

/// The conditional decrement: takes `quantity` off the product's availability only if that much
/// is actually there. Returns `false` (and changes nothing) otherwise.
pub async fn try_decrement(product_id: &str, quantity: i64, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE inventory SET available = available - $1, updated_at = CURRENT_TIMESTAMP WHERE product_id = $2 AND available >= $1",
    )
    .bind(quantity)
    .bind(product_id)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Claims the journal slot for one line item's decrement. Returns `false` if the slot was
/// already claimed, i.e. this item's decrement has been applied before.
pub async fn record_movement(
    order_id: i64,
    product_id: &str,
    quantity: i64,
    conn: &mut SqliteConnection,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO stock_movements (order_id, product_id, quantity) VALUES ($1, $2, $3) ON CONFLICT DO NOTHING",
    )
    .bind(order_id)
    .bind(product_id)
    .bind(quantity)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() > 0)
}
