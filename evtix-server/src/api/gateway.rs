//! Payment provider callback.
//!
//! # Endpoints
//!
//! - `POST /payments/callback` – signed payment status notification
//!
//! The body is passed to the reconciler as raw text so the signature is
//! checked over exactly the bytes the provider sent.

use axum::{
    Json, Router,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
};
use evtix_core::reconciler::{ReconcileError, ReconcileOutcome};
use evtix_sdk::objects::{CallbackAck, ErrorKind};
use evtix_sdk::signature::{SIGNATURE_HEADER, SignatureError};

use super::{error_response, status_for};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/payments/callback", post(payment_callback))
}

/// `POST /payments/callback`
///
/// Answers `200` for confirmed, already-paid and ignored (non-PAID) callbacks
/// so the provider stops retrying. Consistency failures answer `500`; they are
/// already journalled for an operator.
///
/// Rejections match the Service API: a missing header, a bad MAC or a stale
/// timestamp is `401`, an unparseable header or body is `400`.
async fn payment_callback(
    state: axum::extract::State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Result<impl IntoResponse, GatewayApiError> {
    let header_value = headers
        .get(SIGNATURE_HEADER)
        .ok_or(GatewayApiError::MissingSignature)?
        .to_str()
        .map_err(|_| GatewayApiError::MalformedSignature)?
        .to_owned();

    let secret = state.config.gateway().await.webhook_secret.clone();
    let outcome = state
        .reconciler
        .reconcile_signed(&header_value, body, &secret)
        .await?;

    match outcome {
        ReconcileOutcome::Confirmed => tracing::info!("Payment callback confirmed"),
        ReconcileOutcome::AlreadyPaid => tracing::debug!("Duplicate payment callback"),
        ReconcileOutcome::Ignored => tracing::debug!("Non-paid payment callback ignored"),
    }

    Ok(Json(CallbackAck { received: true }))
}

#[derive(Debug)]
enum GatewayApiError {
    MissingSignature,
    MalformedSignature,
    Reconcile(ReconcileError),
}

impl From<ReconcileError> for GatewayApiError {
    fn from(value: ReconcileError) -> Self {
        GatewayApiError::Reconcile(value)
    }
}

impl IntoResponse for GatewayApiError {
    fn into_response(self) -> Response {
        match self {
            GatewayApiError::MissingSignature => error_response(
                StatusCode::UNAUTHORIZED,
                ErrorKind::AuthenticationFailure,
                "missing Evtix-Signature header",
            ),
            GatewayApiError::MalformedSignature => error_response(
                StatusCode::BAD_REQUEST,
                ErrorKind::AuthenticationFailure,
                "invalid Evtix-Signature header format",
            ),
            GatewayApiError::Reconcile(e) => {
                let kind = e.kind();
                match &e {
                    ReconcileError::Authentication(_) => {
                        tracing::warn!(error = %e, "Rejected payment callback");
                    }
                    ReconcileError::Consistency(_) => {}
                    ReconcileError::Store(_) => {
                        tracing::error!(error = %e, "Payment callback store error");
                    }
                }
                let message = match kind {
                    ErrorKind::Internal => "internal server error".to_owned(),
                    _ => e.to_string(),
                };
                error_response(status_of(&e), kind, message)
            }
        }
    }
}

fn status_of(error: &ReconcileError) -> StatusCode {
    match error {
        ReconcileError::Authentication(
            SignatureError::InvalidFormat | SignatureError::InvalidBase64 | SignatureError::Json(_),
        ) => StatusCode::BAD_REQUEST,
        other => status_for(other.kind()),
    }
}

#[cfg(test)]
mod tests {
    use crate::api::test_support::{SERVICE_SECRET, WEBHOOK_SECRET, error_body, state};
    use crate::server::build_router;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use evtix_sdk::objects::{ErrorKind, GatewayPaymentStatus, PaymentCallback};
    use evtix_sdk::signature::{SIGNATURE_HEADER, SignedObject};
    use tower::ServiceExt;
    use uuid::Uuid;

    fn callback() -> PaymentCallback {
        PaymentCallback {
            payment_id: Uuid::now_v7(),
            event_id: Uuid::now_v7(),
            user_id: Uuid::now_v7(),
            transaction_id: "tx_123".to_owned(),
            payment_status: GatewayPaymentStatus::Paid,
            amount: None,
        }
    }

    #[tokio::test]
    async fn unsigned_callback_is_rejected() {
        let router = build_router(state().await);
        let body = serde_json::to_string(&callback()).unwrap();
        let response = router
            .oneshot(
                Request::post("/api/v1/gateway/payments/callback")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn callback_signed_with_the_service_key_is_rejected() {
        let router = build_router(state().await);
        let signed = SignedObject::new(callback(), SERVICE_SECRET).unwrap();
        let response = router
            .oneshot(
                Request::post("/api/v1/gateway/payments/callback")
                    .header(SIGNATURE_HEADER, signed.to_header())
                    .body(Body::from(signed.json.clone()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            error_body(response).await.kind,
            ErrorKind::AuthenticationFailure
        );
    }

    #[tokio::test]
    async fn garbled_signature_header_is_bad_request() {
        let router = build_router(state().await);
        let body = serde_json::to_string(&callback()).unwrap();
        let response = router
            .oneshot(
                Request::post("/api/v1/gateway/payments/callback")
                    .header(SIGNATURE_HEADER, "not-a-signature")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            error_body(response).await.kind,
            ErrorKind::AuthenticationFailure
        );
    }

    #[tokio::test]
    async fn malformed_callback_body_is_bad_request() {
        let router = build_router(state().await);
        // Well-formed header; the body fails to parse before the MAC is checked.
        let signed = SignedObject::new(callback(), WEBHOOK_SECRET).unwrap();
        let response = router
            .oneshot(
                Request::post("/api/v1/gateway/payments/callback")
                    .header(SIGNATURE_HEADER, signed.to_header())
                    .body(Body::from("{\"payment_id\":"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
