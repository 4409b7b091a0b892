//! Behaviour contracts for reconciliation backends.
//!
//! A storage backend supports the engine by implementing these traits. The split mirrors the
//! shared resources of the system: [`OrderManagement`] is the read side plus the order-creation
//! collaborator contract, [`InventoryManagement`] owns per-product quantities, and
//! [`ReconciliationDatabase`] adds the two atomic conditional writes everything else hangs off.
mod data_objects;
mod inventory_management;
mod order_management;
mod reconciliation_database;

pub use data_objects::{FlagKind, ReviewFlag, StockOutcome};
pub use inventory_management::InventoryManagement;
pub use order_management::OrderManagement;
pub use reconciliation_database::{ReconciliationDatabase, ReconciliationError};
