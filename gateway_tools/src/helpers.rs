//! The gateway's webhook authenticity scheme.
//!
//! The gateway signs every webhook push with HMAC-SHA256 over a canonical string assembled from
//! the transaction's reference, amount and currency, keyed with the shared integrity secret. The
//! hex-encoded MAC travels in the `x-gateway-signature` header. Nothing in a webhook body may be
//! trusted before this signature has been checked.
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::data_objects::GatewayTransaction;

type HmacSha256 = Hmac<Sha256>;

/// The canonical string the gateway signs: `{reference}:{amount_in_cents}:{currency}`.
pub fn canonical_signature_string(tx: &GatewayTransaction) -> String {
    format!("{}:{}:{}", tx.reference, tx.amount_in_cents, tx.currency)
}

/// Computes the hex-encoded HMAC-SHA256 signature for a transaction.
pub fn calculate_signature(secret: &str, tx: &GatewayTransaction) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(canonical_signature_string(tx).as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Verifies a signature against the transaction's canonical string in constant time.
///
/// A missing, non-hex, truncated or mismatching signature all return `false`.
pub fn verify_signature(secret: &str, tx: &GatewayTransaction, provided: &str) -> bool {
    let provided = match hex::decode(provided.trim()) {
        Ok(bytes) => bytes,
        Err(_) => return false,
    };
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(canonical_signature_string(tx).as_bytes());
    mac.verify_slice(&provided).is_ok()
}

#[cfg(test)]
mod test {
    use super::*;

    fn sample_tx() -> GatewayTransaction {
        GatewayTransaction {
            id: "txn_81734".to_string(),
            reference: "R-1001".to_string(),
            status: "approved".to_string(),
            amount_in_cents: 50000,
            currency: "USD".to_string(),
        }
    }

    #[test]
    fn canonical_string_layout() {
        assert_eq!(canonical_signature_string(&sample_tx()), "R-1001:50000:USD");
    }

    #[test]
    fn signature_round_trip() {
        let tx = sample_tx();
        let sig = calculate_signature("s3cret", &tx);
        assert!(verify_signature("s3cret", &tx, &sig));
    }

    #[test]
    fn tampered_amount_is_rejected() {
        let mut tx = sample_tx();
        let sig = calculate_signature("s3cret", &tx);
        tx.amount_in_cents = 1;
        assert!(!verify_signature("s3cret", &tx, &sig));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let tx = sample_tx();
        let sig = calculate_signature("s3cret", &tx);
        assert!(!verify_signature("not-the-secret", &tx, &sig));
    }

    #[test]
    fn garbage_signatures_are_rejected() {
        let tx = sample_tx();
        assert!(!verify_signature("s3cret", &tx, ""));
        assert!(!verify_signature("s3cret", &tx, "not hex at all"));
        assert!(!verify_signature("s3cret", &tx, "deadbeef"));
    }
}
