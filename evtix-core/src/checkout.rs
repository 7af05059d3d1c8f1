//! Hosted checkout collaborator.
//!
//! The admission coordinator asks a [`CheckoutGateway`] for a redirect handle
//! while its join transaction is still open. Correlation ids travel with the
//! request so the provider can echo them back in the payment callback.

use crate::config::GatewayConfig;
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;
use url::Url;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutRequest {
    pub payment_id: Uuid,
    pub event_id: Uuid,
    pub user_id: Uuid,
    pub amount: Decimal,
    pub event_name: String,
}

/// Where to send the user to pay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutHandle {
    pub redirect_url: Url,
    /// Provider-side session reference, when the provider returns one.
    pub session_id: Option<String>,
}

#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("checkout request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("checkout provider rejected the request with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("checkout provider returned an unusable response: {0}")]
    InvalidResponse(String),

    #[error("checkout provider did not answer in time")]
    Timeout,
}

/// Slack the coordinator allows past the HTTP client's own timeout.
pub const DEADLINE_MARGIN: Duration = Duration::from_secs(2);

#[async_trait]
pub trait CheckoutGateway: Send + Sync {
    async fn create_checkout(&self, request: CheckoutRequest)
    -> Result<CheckoutHandle, CheckoutError>;

    /// Upper bound the coordinator puts around [`create_checkout`](Self::create_checkout).
    /// Asked before every join; `None` leaves the coordinator's default.
    async fn deadline(&self) -> Option<Duration> {
        None
    }
}

#[derive(Debug, Serialize)]
struct CreateSessionBody<'a> {
    amount: Decimal,
    currency: &'a str,
    payment_id: Uuid,
    event_id: Uuid,
    user_id: Uuid,
    order_name: &'a str,
    success_url: &'a Url,
    fail_url: &'a Url,
    cancel_url: &'a Url,
}

#[derive(Debug, Deserialize)]
struct CreateSessionResponse {
    redirect_url: String,
    #[serde(default)]
    session_id: Option<String>,
}

/// [`CheckoutGateway`] over a hosted checkout HTTP API.
///
/// Reads [`GatewayConfig`] on every call, so a config reload takes effect on
/// the next checkout.
#[derive(Debug, Clone)]
pub struct HostedCheckoutClient {
    http_client: reqwest::Client,
    config: Arc<RwLock<GatewayConfig>>,
}

impl HostedCheckoutClient {
    pub fn new(config: Arc<RwLock<GatewayConfig>>) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            config,
        }
    }
}

#[async_trait]
impl CheckoutGateway for HostedCheckoutClient {
    #[tracing::instrument(skip_all, err, fields(payment_id = %request.payment_id))]
    async fn create_checkout(
        &self,
        request: CheckoutRequest,
    ) -> Result<CheckoutHandle, CheckoutError> {
        let config = self.config.read().await.clone();
        let body = CreateSessionBody {
            amount: request.amount,
            currency: &config.currency,
            payment_id: request.payment_id,
            event_id: request.event_id,
            user_id: request.user_id,
            order_name: &request.event_name,
            success_url: &config.success_url,
            fail_url: &config.fail_url,
            cancel_url: &config.cancel_url,
        };

        let response = self
            .http_client
            .post(config.checkout_url.clone())
            .bearer_auth(&config.api_key)
            .timeout(config.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    CheckoutError::Timeout
                } else {
                    CheckoutError::Request(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CheckoutError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let session: CreateSessionResponse = response.json().await?;
        let redirect_url = Url::parse(&session.redirect_url)
            .map_err(|e| CheckoutError::InvalidResponse(format!("redirect_url: {e}")))?;
        Ok(CheckoutHandle {
            redirect_url,
            session_id: session.session_id,
        })
    }

    async fn deadline(&self) -> Option<Duration> {
        Some(self.config.read().await.timeout + DEADLINE_MARGIN)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_body_carries_correlation_ids() {
        let checkout_url = Url::parse("https://pay.example.com/sessions").unwrap();
        let request = CheckoutRequest {
            payment_id: Uuid::now_v7(),
            event_id: Uuid::now_v7(),
            user_id: Uuid::now_v7(),
            amount: Decimal::new(40000, 2),
            event_name: "Rooftop jazz".to_owned(),
        };
        let body = CreateSessionBody {
            amount: request.amount,
            currency: "KRW",
            payment_id: request.payment_id,
            event_id: request.event_id,
            user_id: request.user_id,
            order_name: &request.event_name,
            success_url: &checkout_url,
            fail_url: &checkout_url,
            cancel_url: &checkout_url,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["payment_id"], request.payment_id.to_string());
        assert_eq!(json["event_id"], request.event_id.to_string());
        assert_eq!(json["user_id"], request.user_id.to_string());
        assert_eq!(json["currency"], "KRW");
        assert_eq!(json["amount"], "400.00");
    }

    #[tokio::test]
    async fn deadline_follows_reloaded_timeout() {
        let url = Url::parse("https://pay.example.com/sessions").unwrap();
        let config = Arc::new(RwLock::new(GatewayConfig {
            checkout_url: url.clone(),
            webhook_secret: b"whsec".to_vec().into_boxed_slice(),
            api_key: "sk_test".to_owned(),
            currency: "KRW".to_owned(),
            timeout: Duration::from_secs(10),
            success_url: url.clone(),
            fail_url: url.clone(),
            cancel_url: url,
        }));
        let client = HostedCheckoutClient::new(config.clone());
        assert_eq!(
            client.deadline().await,
            Some(Duration::from_secs(10) + DEADLINE_MARGIN)
        );

        config.write().await.timeout = Duration::from_secs(30);
        assert_eq!(
            client.deadline().await,
            Some(Duration::from_secs(30) + DEADLINE_MARGIN)
        );
    }

    #[test]
    fn session_response_tolerates_missing_session_id() {
        let parsed: CreateSessionResponse =
            serde_json::from_str(r#"{"redirect_url":"https://pay.example.com/c/1"}"#).unwrap();
        assert_eq!(parsed.redirect_url, "https://pay.example.com/c/1");
        assert!(parsed.session_id.is_none());
    }
}
