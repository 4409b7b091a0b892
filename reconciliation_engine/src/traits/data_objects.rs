use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};

use crate::db_types::ConversionError;

/// The inventory side effect of a reconcile call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StockOutcome {
    /// The transition was not an approval; inventory is untouched.
    NotApplicable,
    /// Every line item has been decremented (this call may have resumed an interrupted run).
    Applied,
    /// Inventory had already been applied for this order.
    AlreadyApplied,
    /// The listed products could not be decremented. Review flags have been recorded; the
    /// order's `stock_applied` stays false so a later replay retries the missing items.
    Shortfall(Vec<String>),
}

impl StockOutcome {
    pub fn is_shortfall(&self) -> bool {
        matches!(self, StockOutcome::Shortfall(_))
    }
}

/// Why an order was flagged for manual review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum FlagKind {
    /// A terminal order received a different terminal signal. Neither source is assumed
    /// authoritative; an operator decides.
    Conflict,
    /// An approved order could not be covered by available stock.
    StockShortfall,
}

impl Display for FlagKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FlagKind::Conflict => write!(f, "Conflict"),
            FlagKind::StockShortfall => write!(f, "StockShortfall"),
        }
    }
}

impl FromStr for FlagKind {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Conflict" => Ok(Self::Conflict),
            "StockShortfall" => Ok(Self::StockShortfall),
            s => Err(ConversionError::new(format!("Invalid flag kind: {s}"))),
        }
    }
}

/// A stored call for operator attention.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ReviewFlag {
    pub id: i64,
    pub order_reference: String,
    pub kind: FlagKind,
    pub detail: String,
    pub gateway_tx_id: Option<String>,
    pub created_at: DateTime<Utc>,
}
