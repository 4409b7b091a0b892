use sqlx::SqliteConnection;

use crate::{
    db_types::OrderReference,
    traits::{FlagKind, ReviewFlag},
};

/// Records a call for operator attention. Identical flags (same order, kind and detail) are
/// collapsed, so replayed signals do not pile up duplicate work items.
pub async fn insert_flag(
    reference: &OrderReference,
    kind: FlagKind,
    detail: &str,
    gateway_tx_id: Option<&str>,
    conn: &mut SqliteConnection,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
            INSERT INTO review_flags (order_reference, kind, detail, gateway_tx_id)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT DO NOTHING
        "#,
    )
    .bind(reference.as_str())
    .bind(kind)
    .bind(detail)
    .bind(gateway_tx_id)
    .execute(conn)
    .await?;
    Ok(())
}

/// Fetches the flags recorded against an order reference, oldest first.
pub async fn flags_for_reference(
    reference: &OrderReference,
    conn: &mut SqliteConnection,
) -> Result<Vec<ReviewFlag>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM review_flags WHERE order_reference = $1 ORDER BY id")
        .bind(reference.as_str())
        .fetch_all(conn)
        .await
}
