use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayApiError {
    #[error("Could not initialize client: {0}")]
    Initialization(String),
    #[error("Could not reach the gateway: {0}")]
    Network(String),
    #[error("The gateway did not respond within the configured deadline")]
    Timeout,
    #[error("The gateway does not know transaction {0}")]
    NotFound(String),
    #[error("Could not deserialize the gateway response: {0}")]
    JsonError(String),
    #[error("Lookup failed. Error {status}. {message}")]
    QueryError { status: u16, message: String },
}
