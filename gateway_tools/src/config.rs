use std::time::Duration;

use log::*;
use ors_common::Secret;

const DEFAULT_LOOKUP_TIMEOUT_SECS: u64 = 10;

/// Connection settings for the payment gateway.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Base URL of the gateway API, e.g. "https://api.gateway.example.com/v1".
    pub base_url: String,
    /// Shared secret keying the webhook HMAC signatures.
    pub integrity_secret: Secret<String>,
    /// Hard deadline for transaction-lookup calls. A stalled gateway must never hang the
    /// verification endpoint.
    pub lookup_timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: String::default(),
            integrity_secret: Secret::default(),
            lookup_timeout: Duration::from_secs(DEFAULT_LOOKUP_TIMEOUT_SECS),
        }
    }
}

impl GatewayConfig {
    pub fn new_from_env_or_default() -> Self {
        let base_url = std::env::var("ORS_GATEWAY_URL").unwrap_or_else(|_| {
            warn!("ORS_GATEWAY_URL not set, using (probably useless) default");
            "https://localhost:9443".to_string()
        });
        let integrity_secret = Secret::new(std::env::var("ORS_GATEWAY_SECRET").unwrap_or_else(|_| {
            warn!("ORS_GATEWAY_SECRET not set. Webhook signatures will not verify against a real gateway.");
            String::default()
        }));
        let lookup_timeout = std::env::var("ORS_GATEWAY_TIMEOUT_SECS")
            .ok()
            .and_then(|s| {
                s.parse::<u64>()
                    .map_err(|e| warn!("Invalid value for ORS_GATEWAY_TIMEOUT_SECS: {e}. Using the default."))
                    .ok()
            })
            .map(Duration::from_secs)
            .unwrap_or_else(|| Duration::from_secs(DEFAULT_LOOKUP_TIMEOUT_SECS));
        Self { base_url, integrity_secret, lookup_timeout }
    }
}
