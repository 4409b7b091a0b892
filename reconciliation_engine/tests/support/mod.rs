use log::*;
use ors_common::Money;
use reconciliation_engine::{
    db_types::{GatewayOutcome, NewLineItem, NewOrder, Order, OrderReference, OutcomeStatus},
    InventoryManagement,
    OrderManagement,
    SqliteDatabase,
};
use sqlx::{migrate::MigrateDatabase, Sqlite};

/// Creates a fresh throwaway database with the schema applied and enough pool headroom for the
/// concurrency tests.
pub async fn prepare_test_env() -> SqliteDatabase {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    let url = random_db_url();
    let _ = Sqlite::drop_database(&url).await;
    Sqlite::create_database(&url).await.expect("Error creating test database");
    let db = SqliteDatabase::new_with_url(&url, 8).await.expect("Error connecting to test database");
    db.run_migrations().await.expect("Error running DB migrations");
    info!("🚀️ Test database ready at {url}");
    db
}

pub fn random_db_url() -> String {
    format!("sqlite://{}/ors_test_store_{}.db", std::env::temp_dir().display(), rand::random::<u64>())
}

/// Stores a pending order along with stock for each of its products.
pub async fn seed_order(db: &SqliteDatabase, reference: &str, items: &[(&str, i64, i64, i64)]) -> Order {
    for (product_id, _, _, available) in items {
        db.set_stock_level(product_id, *available).await.expect("Error seeding inventory");
    }
    let line_items = items
        .iter()
        .map(|(product_id, qty, unit_price, _)| NewLineItem::new(*product_id, *qty, Money::from_cents(*unit_price)))
        .collect::<Vec<_>>();
    let total: Money = line_items.iter().map(NewLineItem::subtotal).sum();
    let order = NewOrder::new(OrderReference::from(reference), "cust-1".to_string(), total, line_items);
    let (order, inserted) = db.insert_order(order).await.expect("Error inserting order");
    assert!(inserted, "expected a fresh order for {reference}");
    order
}

pub fn outcome(reference: &str, transaction_id: &str, amount: i64, status: OutcomeStatus) -> GatewayOutcome {
    GatewayOutcome {
        transaction_id: transaction_id.to_string(),
        order_reference: OrderReference::from(reference),
        amount: Money::from_cents(amount),
        currency: "USD".to_string(),
        status,
    }
}
