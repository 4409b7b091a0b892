//! Order–Payment Reconciliation Engine
//!
//! This library drives orders to a terminal, consistent settlement state from the gateway
//! signals the server ingests. It is provider-agnostic: by the time anything reaches this crate
//! it has been normalized into a [`db_types::GatewayOutcome`].
//!
//! The library is divided into three main sections:
//! 1. Storage contracts and backends ([`mod@traits`], [`SqliteDatabase`]). Correctness under
//!    duplicate and concurrent signals rests entirely on the two atomic conditional writes the
//!    backend provides; there is deliberately no in-process locking anywhere, so any number of
//!    server instances can share one store.
//! 2. The reconciliation API ([`mod@rec_api`]). [`ReconcileApi::reconcile`] is the only code
//!    path that mutates order state or inventory.
//! 3. Event hooks ([`mod@events`]). Subscribers are notified when orders are approved and when
//!    an approval could not be covered by stock.
pub mod db_types;
pub mod events;
pub mod rec_api;
#[cfg(feature = "sqlite")]
mod sqlite;
pub mod traits;

pub use rec_api::{ReconcileApi, ReconcileResult};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
pub use traits::{
    InventoryManagement,
    OrderManagement,
    ReconciliationDatabase,
    ReconciliationError,
    StockOutcome,
};
