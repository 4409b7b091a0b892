use std::env;

use gateway_tools::GatewayConfig;
use log::*;
use ors_common::parse_boolean_flag;

const DEFAULT_ORS_HOST: &str = "127.0.0.1";
const DEFAULT_ORS_PORT: u16 = 8370;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// If false, webhook signatures are not checked and every payload is trusted. **DANGER**
    /// Only ever useful against a local gateway simulator.
    pub signature_checks: bool,
    /// Payment gateway connection settings.
    pub gateway: GatewayConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_ORS_HOST.to_string(),
            port: DEFAULT_ORS_PORT,
            database_url: String::default(),
            signature_checks: true,
            gateway: GatewayConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("ORS_HOST").ok().unwrap_or_else(|| DEFAULT_ORS_HOST.into());
        let port = env::var("ORS_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for ORS_PORT. {e} Using the default, {DEFAULT_ORS_PORT}, instead."
                    );
                    DEFAULT_ORS_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_ORS_PORT);
        let database_url = env::var("ORS_DATABASE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ ORS_DATABASE_URL is not set. Please set it to the URL for the order store.");
            String::default()
        });
        let signature_checks = parse_boolean_flag(env::var("ORS_GATEWAY_SIGNATURE_CHECKS").ok(), true);
        if !signature_checks {
            warn!(
                "🚨️ Webhook signature checks are DISABLED. Anybody who can reach this server can settle orders. Do \
                 not run a production instance like this."
            );
        }
        let gateway = GatewayConfig::new_from_env_or_default();
        Self { host, port, database_url, signature_checks, gateway }
    }
}
