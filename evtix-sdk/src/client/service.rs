//! Service API client (identity backend → evtix server).

use reqwest::Client;
use url::Url;
use uuid::Uuid;

use super::ClientError;
use crate::objects::{
    ChangeEventStatusRequest, CouponCheckRequest, CouponQuote, ErrorBody, EventResponse,
    EventStatus, GetPaymentRequest, JoinEventRequest, JoinEventResponse, LeaveEventRequest,
    PaymentResponse,
};
use crate::signature::{SIGNATURE_HEADER, Signature, SignedObject};

/// Typed HTTP client for the evtix **Service API**.
///
/// Every request body is signed with
/// `HMAC-SHA256("{timestamp}.{json}", service_secret)`.
#[derive(Debug, Clone)]
pub struct ServiceClient {
    http: Client,
    base_url: Url,
    secret: Vec<u8>,
}

impl ServiceClient {
    pub fn new(base_url: Url, service_secret: impl Into<Vec<u8>>) -> Self {
        Self {
            http: Client::new(),
            base_url,
            secret: service_secret.into(),
        }
    }

    /// Replace the default `reqwest::Client` (timeouts, proxy, …).
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    pub async fn join_event(
        &self,
        request: JoinEventRequest,
    ) -> Result<JoinEventResponse, ClientError> {
        self.post_signed("/api/v1/service/events/join", request)
            .await
    }

    pub async fn check_coupon(
        &self,
        request: CouponCheckRequest,
    ) -> Result<CouponQuote, ClientError> {
        self.post_signed("/api/v1/service/events/coupon", request)
            .await
    }

    pub async fn leave_event(&self, event_id: Uuid, user_id: Uuid) -> Result<(), ClientError> {
        let signed = SignedObject::new(LeaveEventRequest { event_id, user_id }, &self.secret)?;
        let resp = self
            .send(self.endpoint("/api/v1/service/events/leave")?, signed)
            .await?;
        if resp.status().is_success() {
            return Ok(());
        }
        Err(rejection(resp).await)
    }

    pub async fn change_event_status(
        &self,
        event_id: Uuid,
        host_id: Uuid,
        status: EventStatus,
    ) -> Result<EventResponse, ClientError> {
        self.post_signed(
            "/api/v1/service/events/status",
            ChangeEventStatusRequest {
                event_id,
                user_id: host_id,
                status,
            },
        )
        .await
    }

    pub async fn get_payment(&self, payment_id: Uuid) -> Result<PaymentResponse, ClientError> {
        self.post_signed(
            "/api/v1/service/payments/status",
            GetPaymentRequest { payment_id },
        )
        .await
    }

    fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        Ok(self.base_url.join(path)?)
    }

    async fn post_signed<B, R>(&self, path: &str, body: B) -> Result<R, ClientError>
    where
        B: Signature,
        R: serde::de::DeserializeOwned,
    {
        let signed = SignedObject::new(body, &self.secret)?;
        let resp = self.send(self.endpoint(path)?, signed).await?;
        parse_response(resp).await
    }

    async fn send<B: Signature>(
        &self,
        url: Url,
        signed: SignedObject<B>,
    ) -> Result<reqwest::Response, ClientError> {
        let resp = self
            .http
            .post(url)
            .header(SIGNATURE_HEADER, signed.to_header())
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(signed.json)
            .send()
            .await?;
        Ok(resp)
    }
}

async fn parse_response<T: serde::de::DeserializeOwned>(
    resp: reqwest::Response,
) -> Result<T, ClientError> {
    if !resp.status().is_success() {
        return Err(rejection(resp).await);
    }
    let bytes = resp.bytes().await?;
    serde_json::from_slice(&bytes).map_err(ClientError::Json)
}

async fn rejection(resp: reqwest::Response) -> ClientError {
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    match serde_json::from_str::<ErrorBody>(&body) {
        Ok(error) => ClientError::Rejected { status, error },
        Err(_) => ClientError::Api { status, body },
    }
}
