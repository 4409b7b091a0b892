use serde::{Deserialize, Serialize};

use crate::{
    db_types::{Order, PaymentStatus},
    traits::StockOutcome,
};

/// What a reconcile call did.
///
/// Conflicts and shortfalls are results, not errors: the engine has already recorded them for
/// review, and the ingestion layer acknowledges them so the gateway stops retrying.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReconcileResult {
    /// The outcome was still `Pending`; nothing to apply.
    NoChange,
    /// Identical terminal signal replayed; state unchanged. `stock` reports any resumed
    /// inventory work (an interrupted approval is completed on replay).
    AlreadyApplied { order: Order, stock: StockOutcome },
    /// This caller won the transition. `stock` carries the inventory effect for approvals.
    Transitioned { order: Order, stock: StockOutcome },
    /// The order is terminal and the incoming signal disagrees. Flagged, not applied.
    ConflictFlagged { order: Order, incoming: PaymentStatus },
}

impl ReconcileResult {
    /// The order's state as of this call, where one was involved.
    pub fn order(&self) -> Option<&Order> {
        match self {
            ReconcileResult::NoChange => None,
            ReconcileResult::AlreadyApplied { order, .. }
            | ReconcileResult::Transitioned { order, .. }
            | ReconcileResult::ConflictFlagged { order, .. } => Some(order),
        }
    }
}
