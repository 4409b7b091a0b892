use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{GatewayOutcome, Order, OrderReference, PaymentStatus},
    events::{EventProducers, OrderApprovedEvent, StockShortfallEvent},
    rec_api::ReconcileResult,
    traits::{OrderManagement, ReconciliationDatabase, ReconciliationError, StockOutcome},
};

/// How often a lost compare-and-swap is retried before the call gives up. Contention on a single
/// order is two or three concurrent signals at worst, so a handful of attempts is plenty.
pub const MAX_TRANSITION_ATTEMPTS: usize = 3;

/// `ReconcileApi` is the primary API for settling orders in response to gateway outcome events,
/// whichever ingestion path they arrive on.
///
/// It holds no state of its own. All coordination happens through the backend's atomic
/// conditional writes, so any number of `ReconcileApi` instances (including in separate
/// processes) can work the same store concurrently.
pub struct ReconcileApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for ReconcileApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ReconcileApi")
    }
}

impl<B> ReconcileApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }
}

impl<B> ReconcileApi<B>
where B: ReconciliationDatabase
{
    /// Drives an order towards the state a gateway outcome reports, idempotently and
    /// convergently under races with other callers.
    ///
    /// The effect per current/incoming state pair:
    ///
    /// | Current \ Incoming | Pending  | Approved    | Declined/Error | Voided      |
    /// |--------------------|----------|-------------|----------------|-------------|
    /// | Pending, Error     | NoChange | transition¹ | transition     | transition  |
    /// | Approved           | NoChange | replay²     | conflict³      | conflict³   |
    /// | Declined           | NoChange | conflict³   | replay         | conflict³   |
    /// | Voided             | NoChange | conflict³   | conflict³      | replay      |
    ///
    /// ¹ The winning caller also applies the order's inventory effect, at most once per line
    ///   item, and publishes [`OrderApprovedEvent`].
    /// ² A replayed approval on an order whose inventory work was interrupted resumes it.
    /// ³ Recorded for manual review and reported as [`ReconcileResult::ConflictFlagged`];
    ///   terminal state is never overwritten and no precedence between sources is invented.
    ///
    /// A lost compare-and-swap re-reads and retries, [`MAX_TRANSITION_ATTEMPTS`] times in all,
    /// then fails with [`ReconciliationError::TransitionContention`].
    pub async fn reconcile(
        &self,
        reference: &OrderReference,
        outcome: &GatewayOutcome,
    ) -> Result<ReconcileResult, ReconciliationError> {
        let target = match outcome.status.target_payment_status() {
            Some(t) => t,
            None => {
                trace!("🔁️ Outcome for order {reference} is still pending. Nothing to do.");
                return Ok(ReconcileResult::NoChange);
            },
        };
        for attempt in 1..=MAX_TRANSITION_ATTEMPTS {
            let order = self
                .db
                .fetch_order_by_reference(reference)
                .await?
                .ok_or_else(|| ReconciliationError::OrderNotFound(reference.clone()))?;
            if !outcome.amount.is_within_tolerance_of(order.total_amount) {
                warn!(
                    "🔁️ Gateway reports {} for order {reference}, which declares {}. Proceeding, but this wants a \
                     look.",
                    outcome.amount, order.total_amount
                );
            }
            if order.payment_status.is_terminal() {
                return self.reconcile_terminal(order, target, outcome).await;
            }
            match self.db.transition_payment_status(order.id, order.payment_status, target, &outcome.transaction_id).await?
            {
                Some(updated) => {
                    debug!(
                        "🔁️ Order {reference} transitioned {} -> {} (txid {})",
                        order.payment_status, target, outcome.transaction_id
                    );
                    return self.finish_transition(updated).await;
                },
                None => {
                    debug!("🔁️ Lost the {reference} transition race on attempt {attempt}. Re-reading.");
                },
            }
        }
        warn!("🔁️ Order {reference} was still contended after {MAX_TRANSITION_ATTEMPTS} attempts");
        Err(ReconciliationError::TransitionContention(reference.clone()))
    }

    /// Handles outcomes against an order that already reached a terminal state: idempotent
    /// replays pass through (resuming interrupted inventory work), disagreements are flagged.
    async fn reconcile_terminal(
        &self,
        order: Order,
        target: PaymentStatus,
        outcome: &GatewayOutcome,
    ) -> Result<ReconcileResult, ReconciliationError> {
        if order.payment_status == target {
            let stock = if target == PaymentStatus::Approved {
                if order.stock_applied {
                    StockOutcome::AlreadyApplied
                } else {
                    warn!("🔁️ Order {} is approved but stock was never applied. Resuming.", order.reference);
                    self.apply_stock(&order).await?
                }
            } else {
                StockOutcome::NotApplicable
            };
            trace!("🔁️ Idempotent replay of {} for order {}", target, order.reference);
            let order = self.refreshed(order).await?;
            return Ok(ReconcileResult::AlreadyApplied { order, stock });
        }
        warn!(
            "🔁️ Conflicting signal for order {}: stored {} but gateway (txid {}) says {}. Flagging for review.",
            order.reference, order.payment_status, outcome.transaction_id, target
        );
        self.db.record_conflict(&order, target, &outcome.transaction_id).await?;
        Ok(ReconcileResult::ConflictFlagged { order, incoming: target })
    }

    /// Completes a transition this caller won: applies inventory for approvals and notifies
    /// subscribers.
    async fn finish_transition(&self, order: Order) -> Result<ReconcileResult, ReconciliationError> {
        let stock = if order.payment_status == PaymentStatus::Approved {
            self.apply_stock(&order).await?
        } else {
            StockOutcome::NotApplicable
        };
        let order = self.refreshed(order).await?;
        if order.payment_status == PaymentStatus::Approved {
            self.call_order_approved_hook(&order, &stock).await;
        }
        Ok(ReconcileResult::Transitioned { order, stock })
    }

    async fn apply_stock(&self, order: &Order) -> Result<StockOutcome, ReconciliationError> {
        let stock = self.db.apply_stock_for_order(order).await?;
        match &stock {
            StockOutcome::Applied => {
                debug!("🔁️📦️ Inventory decremented for order {}", order.reference);
            },
            StockOutcome::Shortfall(missing) => {
                error!(
                    "🔁️📦️ Order {} is approved but {} line item(s) could not be covered by stock: {}. Flagged for \
                     manual reconciliation. The payment stands.",
                    order.reference,
                    missing.len(),
                    missing.join(", ")
                );
                self.call_stock_shortfall_hook(order, missing.clone()).await;
            },
            _ => {},
        }
        Ok(stock)
    }

    /// Re-reads the order so the returned record reflects flags set after the transition
    /// (notably `stock_applied`).
    async fn refreshed(&self, order: Order) -> Result<Order, ReconciliationError> {
        Ok(self.db.fetch_order_by_reference(&order.reference).await?.unwrap_or(order))
    }

    async fn call_order_approved_hook(&self, order: &Order, stock: &StockOutcome) {
        for emitter in &self.producers.order_approved_producer {
            trace!("🔁️📦️ Notifying order approved hook subscribers");
            let event = OrderApprovedEvent::new(order.clone(), stock.clone());
            emitter.publish_event(event).await;
        }
    }

    async fn call_stock_shortfall_hook(&self, order: &Order, missing: Vec<String>) {
        for emitter in &self.producers.stock_shortfall_producer {
            trace!("🔁️📦️ Notifying stock shortfall hook subscribers");
            let event = StockShortfallEvent::new(order.clone(), missing.clone());
            emitter.publish_event(event).await;
        }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn db_mut(&mut self) -> &mut B {
        &mut self.db
    }
}
