//! The payment-gateway adapter.
//!
//! Everything provider-specific funnels through here: webhook payloads are authenticated and
//! folded into the engine's closed [`GatewayOutcome`] vocabulary, and the verification path's
//! active lookups go out through `gateway_tools`. The engine itself never sees a provider status
//! string or a signature header.
use gateway_tools::{helpers, GatewayApi, GatewayApiError, GatewayConfig, GatewayTransaction, WebhookEvent};
use log::trace;
use ors_common::{Money, Secret};
use reconciliation_engine::db_types::{GatewayOutcome, OrderReference, OutcomeStatus};
use thiserror::Error;

/// The header the gateway delivers its webhook signature in.
pub const SIGNATURE_HEADER: &str = "x-gateway-signature";

/// The webhook payload could not be authenticated. Nothing in it may be acted on.
#[derive(Debug, Clone, Error)]
pub enum AuthenticityError {
    #[error("No webhook signature was supplied.")]
    MissingSignature,
    #[error("The webhook signature does not match the payload.")]
    InvalidSignature,
}

/// The gateway could not be consulted, or said something unintelligible. Strictly "status
/// unknown, retry later"; never evidence that a payment failed.
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("Gateway lookup failed. {0}")]
    Upstream(#[from] GatewayApiError),
    #[error("{0}")]
    Conversion(#[from] OutcomeConversionError),
}

/// Why a webhook was not turned into an outcome.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// Reject with a 4xx; the sender is not the gateway.
    #[error(transparent)]
    Authenticity(#[from] AuthenticityError),
    /// Authentic but unintelligible; acknowledge and alert, or the gateway redelivers forever.
    #[error(transparent)]
    Conversion(#[from] OutcomeConversionError),
}

#[derive(Debug, Clone, Error)]
#[error("Could not convert the gateway transaction into an outcome. {0}.")]
pub struct OutcomeConversionError(pub String);

/// Folds a wire transaction into the engine's closed outcome vocabulary.
///
/// Unknown status strings are a hard conversion error: guessing a terminal state for vocabulary
/// we have never seen is how orders get mis-settled.
pub fn outcome_from_transaction(tx: &GatewayTransaction) -> Result<GatewayOutcome, OutcomeConversionError> {
    let status = match tx.status.to_ascii_lowercase().as_str() {
        "approved" | "settled" | "success" => OutcomeStatus::Approved,
        "declined" | "failed" => OutcomeStatus::Declined,
        "voided" | "reversed" => OutcomeStatus::Voided,
        "pending" | "processing" => OutcomeStatus::Pending,
        "error" => OutcomeStatus::Error,
        other => return Err(OutcomeConversionError(format!("Unknown transaction status '{other}'"))),
    };
    if tx.amount_in_cents < 0 {
        return Err(OutcomeConversionError(format!("Negative amount {} on transaction {}", tx.amount_in_cents, tx.id)));
    }
    Ok(GatewayOutcome {
        transaction_id: tx.id.clone(),
        order_reference: OrderReference::from(tx.reference.as_str()),
        amount: Money::from_cents(tx.amount_in_cents),
        currency: tx.currency.clone(),
        status,
    })
}

/// The normalized adapter contract both ingestion paths work against. One implementation per
/// payment provider; handlers stay generic over it.
#[allow(async_fn_in_trait)]
pub trait GatewayAdapter {
    /// Verifies a webhook's signature and normalizes its transaction. Pure translation; no
    /// order or inventory state is touched here.
    fn parse_webhook<'a>(&self, signature: Option<&'a str>, event: &WebhookEvent) -> Result<GatewayOutcome, WebhookError>;

    /// Actively fetches the current state of a transaction from the provider.
    async fn fetch_transaction(&self, transaction_id: &str) -> Result<GatewayOutcome, AdapterError>;
}

/// Adapter for the gateway's REST API and HMAC webhook scheme.
#[derive(Clone)]
pub struct RestGatewayAdapter {
    api: GatewayApi,
    integrity_secret: Secret<String>,
    signature_checks: bool,
}

impl RestGatewayAdapter {
    pub fn new(config: &GatewayConfig, signature_checks: bool) -> Result<Self, GatewayApiError> {
        let api = GatewayApi::new(config.clone())?;
        Ok(Self { api, integrity_secret: config.integrity_secret.clone(), signature_checks })
    }
}

impl GatewayAdapter for RestGatewayAdapter {
    fn parse_webhook<'a>(&self, signature: Option<&'a str>, event: &WebhookEvent) -> Result<GatewayOutcome, WebhookError> {
        if self.signature_checks {
            let signature = signature.ok_or(AuthenticityError::MissingSignature)?;
            if !helpers::verify_signature(self.integrity_secret.reveal(), &event.transaction, signature) {
                return Err(AuthenticityError::InvalidSignature.into());
            }
            trace!("🔐️ Webhook signature for transaction {} checks out", event.transaction.id);
        } else {
            trace!("🔐️ Signature checks are disabled. Trusting webhook payload.");
        }
        Ok(outcome_from_transaction(&event.transaction)?)
    }

    async fn fetch_transaction(&self, transaction_id: &str) -> Result<GatewayOutcome, AdapterError> {
        let tx = self.api.fetch_transaction(transaction_id).await?;
        Ok(outcome_from_transaction(&tx)?)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn tx(status: &str) -> GatewayTransaction {
        GatewayTransaction {
            id: "txn_1".to_string(),
            reference: "R-1001".to_string(),
            status: status.to_string(),
            amount_in_cents: 50000,
            currency: "USD".to_string(),
        }
    }

    #[test]
    fn provider_vocabulary_is_closed_here() {
        assert_eq!(outcome_from_transaction(&tx("approved")).unwrap().status, OutcomeStatus::Approved);
        assert_eq!(outcome_from_transaction(&tx("SETTLED")).unwrap().status, OutcomeStatus::Approved);
        assert_eq!(outcome_from_transaction(&tx("failed")).unwrap().status, OutcomeStatus::Declined);
        assert_eq!(outcome_from_transaction(&tx("reversed")).unwrap().status, OutcomeStatus::Voided);
        assert_eq!(outcome_from_transaction(&tx("processing")).unwrap().status, OutcomeStatus::Pending);
        assert_eq!(outcome_from_transaction(&tx("error")).unwrap().status, OutcomeStatus::Error);
    }

    #[test]
    fn unknown_vocabulary_is_never_guessed() {
        assert!(outcome_from_transaction(&tx("definitely_fine_probably")).is_err());
    }

    #[test]
    fn negative_amounts_are_rejected() {
        let mut tx = tx("approved");
        tx.amount_in_cents = -100;
        assert!(outcome_from_transaction(&tx).is_err());
    }
}
