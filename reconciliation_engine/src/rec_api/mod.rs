//! The reconciliation engine public API.
//!
//! [`ReconcileApi`] is the single authority that turns normalized gateway outcomes into durable
//! order-state transitions and inventory effects. Backends plug in by implementing the traits in
//! [`crate::traits`].
mod objects;
pub mod reconcile_api;

pub use objects::ReconcileResult;
pub use reconcile_api::ReconcileApi;
