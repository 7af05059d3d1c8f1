//! Hosted checkout provider configuration.

use std::time::Duration;
use url::Url;

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Endpoint that creates a checkout session.
    pub checkout_url: Url,
    /// HMAC key the provider signs payment callbacks with.
    pub webhook_secret: Box<[u8]>,
    /// Bearer token for outbound calls to the provider.
    pub api_key: String,
    /// ISO 4217 code sent with every checkout, e.g. `KRW`.
    pub currency: String,
    pub timeout: Duration,
    pub success_url: Url,
    pub fail_url: Url,
    pub cancel_url: Url,
}

impl GatewayConfig {
    pub fn webhook_secret_bytes(&self) -> &[u8] {
        &self.webhook_secret
    }
}
