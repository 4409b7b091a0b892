//! # SQLite database methods
//!
//! Low-level SQLite interactions, kept as plain functions over a `&mut SqliteConnection` so that
//! callers can run them against a pooled connection or inside an open transaction without any
//! code changes.
use sqlx::{sqlite::SqlitePoolOptions, Error as SqlxError, SqlitePool};

pub mod flags;
pub mod inventory;
pub mod orders;

pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, SqlxError> {
    let pool = SqlitePoolOptions::new().max_connections(max_connections).connect(url).await?;
    Ok(pool)
}
