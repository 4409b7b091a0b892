use std::sync::Arc;

use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
    StatusCode,
};

use crate::{config::GatewayConfig, data_objects::TransactionResponse, GatewayApiError, GatewayTransaction};

/// HTTP client for the gateway's synchronous lookup API.
///
/// Every request carries the timeout from [`GatewayConfig`]; a gateway stall surfaces as
/// [`GatewayApiError::Timeout`] rather than an open-ended hang.
#[derive(Clone)]
pub struct GatewayApi {
    config: GatewayConfig,
    client: Arc<Client>,
}

impl GatewayApi {
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayApiError> {
        let mut headers = HeaderMap::with_capacity(1);
        headers.insert("Accept", HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.lookup_timeout)
            .build()
            .map_err(|e| GatewayApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    /// Fetches the current state of a transaction from the gateway.
    ///
    /// None of the failure modes here say anything definitive about the payment: network
    /// trouble, timeouts, unknown ids and malformed bodies are all "unknown, retry later" from
    /// the caller's point of view and must never be read as a decline.
    pub async fn fetch_transaction(&self, transaction_id: &str) -> Result<GatewayTransaction, GatewayApiError> {
        let url = format!("{}/transactions/{transaction_id}", self.config.base_url.trim_end_matches('/'));
        trace!("Looking up transaction at {url}");
        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                GatewayApiError::Timeout
            } else {
                GatewayApiError::Network(e.to_string())
            }
        })?;
        match response.status() {
            s if s.is_success() => {
                let body =
                    response.json::<TransactionResponse>().await.map_err(|e| GatewayApiError::JsonError(e.to_string()))?;
                trace!("Transaction {transaction_id} is '{}'", body.transaction.status);
                Ok(body.transaction)
            },
            StatusCode::NOT_FOUND => Err(GatewayApiError::NotFound(transaction_id.to_string())),
            s => {
                let status = s.as_u16();
                let message = response.text().await.map_err(|e| GatewayApiError::Network(e.to_string()))?;
                Err(GatewayApiError::QueryError { status, message })
            },
        }
    }
}
