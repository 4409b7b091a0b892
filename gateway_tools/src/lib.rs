//! Client-side plumbing for the payment gateway.
//!
//! This crate knows about the gateway's wire formats and nothing about orders or inventory:
//! * the JSON shapes the gateway sends ([`WebhookEvent`], [`GatewayTransaction`]),
//! * the HMAC scheme that authenticates webhook pushes ([`helpers`]),
//! * an HTTP client for the synchronous transaction-lookup endpoint ([`GatewayApi`]).
//!
//! Interpreting a transaction (mapping its status vocabulary onto order state) is deliberately
//! left to the consumer, so that this crate stays a pure translation layer.
mod api;
pub mod config;
pub mod data_objects;
mod error;
pub mod helpers;

pub use api::GatewayApi;
pub use config::GatewayConfig;
pub use data_objects::{GatewayTransaction, TransactionResponse, WebhookEvent};
pub use error::GatewayApiError;
