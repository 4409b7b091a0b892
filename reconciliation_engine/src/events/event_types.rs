use serde::{Deserialize, Serialize};

use crate::{db_types::Order, traits::StockOutcome};

/// Published when an order wins its transition into `Approved`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderApprovedEvent {
    pub order: Order,
    pub stock: StockOutcome,
}

impl OrderApprovedEvent {
    pub fn new(order: Order, stock: StockOutcome) -> Self {
        Self { order, stock }
    }
}

/// Published when an approved order could not be covered by available stock.
///
/// Subscribers should treat this as an operator alert: the payment has settled and will not be
/// rolled back, so somebody has to resolve the shortfall by hand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockShortfallEvent {
    pub order: Order,
    /// The product ids that could not be decremented.
    pub missing: Vec<String>,
}

impl StockShortfallEvent {
    pub fn new(order: Order, missing: Vec<String>) -> Self {
        Self { order, missing }
    }
}
