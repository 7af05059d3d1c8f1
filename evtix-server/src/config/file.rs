//! TOML file configuration structures.
//!
//! These structs map one-to-one onto `evtix-config.toml`.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use url::Url;

/// Root configuration structure as read from the TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub server: ServerConfig,
    pub admin: AdminConfig,
    pub service: ServiceConfig,
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub registration: RegistrationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The address and port to listen on (e.g., "0.0.0.0:8080").
    #[serde(default = "default_listen_addr")]
    pub listen: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen_addr(),
        }
    }
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminConfig {
    /// The admin secret. If this is plaintext (doesn't start with `$argon2`),
    /// it will be hashed and the config file will be rewritten.
    pub secret: String,
}

/// Shared secret for the identity backend that calls the service API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub secret: String,
}

/// Hosted checkout provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    pub checkout_url: Url,
    pub webhook_secret: String,
    pub api_key: String,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default = "default_gateway_timeout_secs")]
    pub timeout_secs: u64,
    pub success_url: Url,
    pub fail_url: Url,
    pub cancel_url: Url,
}

fn default_currency() -> String {
    "KRW".to_owned()
}

fn default_gateway_timeout_secs() -> u64 {
    10
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationConfig {
    /// Seconds an unpaid registration may hold a seat.
    #[serde(default = "default_unpaid_ttl_secs")]
    pub unpaid_ttl_secs: u64,
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
    #[serde(default = "default_sweep_batch")]
    pub sweep_batch: i64,
}

impl Default for RegistrationConfig {
    fn default() -> Self {
        Self {
            unpaid_ttl_secs: default_unpaid_ttl_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
            sweep_batch: default_sweep_batch(),
        }
    }
}

fn default_unpaid_ttl_secs() -> u64 {
    30 * 60
}

fn default_sweep_interval_secs() -> u64 {
    60
}

fn default_sweep_batch() -> i64 {
    100
}

impl FileConfig {
    /// Check if the admin secret is already hashed (argon2 format).
    pub fn is_admin_secret_hashed(&self) -> bool {
        self.admin.secret.starts_with("$argon2")
    }
}
