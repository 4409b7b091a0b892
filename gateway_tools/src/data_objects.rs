use serde::{Deserialize, Serialize};

/// A transaction as the gateway reports it, in both webhook pushes and lookup responses.
///
/// `status` is kept as the raw provider string here. Folding it into a closed status enum is the
/// adapter's job, so that unknown vocabulary is rejected in exactly one place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayTransaction {
    /// The gateway's transaction identifier.
    pub id: String,
    /// The merchant-supplied order reference this transaction settles.
    pub reference: String,
    /// Provider status vocabulary, e.g. "approved", "declined", "pending".
    pub status: String,
    /// The transacted amount in minor currency units.
    pub amount_in_cents: i64,
    /// ISO-4217 currency code.
    pub currency: String,
}

/// The body of a webhook push from the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEvent {
    pub event_type: String,
    pub transaction: GatewayTransaction,
}

/// Response envelope of the transaction-lookup endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionResponse {
    pub transaction: GatewayTransaction,
}

#[cfg(test)]
mod test {
    use super::WebhookEvent;

    #[test]
    fn webhook_event_deserializes() {
        let json = r#"{
            "event_type": "transaction.updated",
            "transaction": {
                "id": "txn_81734",
                "reference": "R-1001",
                "status": "approved",
                "amount_in_cents": 50000,
                "currency": "USD"
            }
        }"#;
        let event: WebhookEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.event_type, "transaction.updated");
        assert_eq!(event.transaction.reference, "R-1001");
        assert_eq!(event.transaction.amount_in_cents, 50000);
    }
}
