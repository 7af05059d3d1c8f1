//! Service API handlers.
//!
//! Called by the identity backend on behalf of an authenticated user. Every
//! body is signed and verified through the `Evtix-Signature` header.
//!
//! # Endpoints
//!
//! - `POST /events/join`     – register and open a checkout session
//! - `POST /events/coupon`   – quote a coupon discount
//! - `POST /events/leave`    – release an unpaid registration
//! - `POST /events/status`   – host changes the event status
//! - `POST /payments/status` – look up a payment

use axum::{
    Json, Router,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use evtix_core::admission::AdmissionError;
use evtix_core::entities::payments::GetPaymentById;
use evtix_core::framework::DatabaseProcessor;
use evtix_core::ledger::LedgerError;
use evtix_sdk::objects::{
    ChangeEventStatusRequest, CouponCheckRequest, ErrorKind, GetPaymentRequest, JoinEventRequest,
    JoinEventResponse, LeaveEventRequest,
};
use kanau::processor::Processor;

use super::{error_response, status_for};
use crate::api::extractors::SignedBody;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/events/join", post(join_event))
        .route("/events/coupon", post(check_coupon))
        .route("/events/leave", post(leave_event))
        .route("/events/status", post(change_event_status))
        .route("/payments/status", post(get_payment_status))
}

/// `POST /events/join`
///
/// Returns `201` with the payment to settle and the hosted checkout URL.
async fn join_event(
    state: axum::extract::State<AppState>,
    SignedBody(payload): SignedBody<JoinEventRequest>,
) -> Result<impl IntoResponse, ServiceApiError> {
    let admission = state
        .admission
        .join_event(
            payload.event_id,
            payload.user_id,
            payload.coupon_code.as_deref(),
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(JoinEventResponse {
            participant_id: admission.participant.participant_id,
            payment_id: admission.payment.payment_id,
            amount: admission.payment.amount,
            checkout_url: admission.checkout.redirect_url,
        }),
    ))
}

/// `POST /events/coupon`
///
/// Advisory only; nothing is written.
async fn check_coupon(
    state: axum::extract::State<AppState>,
    SignedBody(payload): SignedBody<CouponCheckRequest>,
) -> Result<impl IntoResponse, ServiceApiError> {
    let quote = state
        .admission
        .check_coupon(payload.event_id, payload.user_id, &payload.coupon_code)
        .await?;
    Ok(Json(quote))
}

/// `POST /events/leave`
async fn leave_event(
    state: axum::extract::State<AppState>,
    SignedBody(payload): SignedBody<LeaveEventRequest>,
) -> Result<impl IntoResponse, ServiceApiError> {
    state
        .admission
        .leave_event(payload.event_id, payload.user_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /events/status`
///
/// `user_id` must be the event's host.
async fn change_event_status(
    state: axum::extract::State<AppState>,
    SignedBody(payload): SignedBody<ChangeEventStatusRequest>,
) -> Result<impl IntoResponse, ServiceApiError> {
    let event = state
        .ledger
        .change_status(payload.event_id, payload.user_id, payload.status.into())
        .await?;
    Ok(Json(event.to_response()))
}

/// `POST /payments/status`
async fn get_payment_status(
    state: axum::extract::State<AppState>,
    SignedBody(payload): SignedBody<GetPaymentRequest>,
) -> Result<impl IntoResponse, ServiceApiError> {
    let processor = DatabaseProcessor {
        pool: state.db.clone(),
    };

    let record = processor
        .process(GetPaymentById {
            payment_id: payload.payment_id,
        })
        .await
        .map_err(ServiceApiError::Database)?
        .ok_or(ServiceApiError::PaymentNotFound)?;

    Ok(Json(record.to_response()))
}

#[derive(Debug)]
enum ServiceApiError {
    Admission(AdmissionError),
    Ledger(LedgerError),
    Database(sqlx::Error),
    PaymentNotFound,
}

impl From<AdmissionError> for ServiceApiError {
    fn from(value: AdmissionError) -> Self {
        ServiceApiError::Admission(value)
    }
}

impl From<LedgerError> for ServiceApiError {
    fn from(value: LedgerError) -> Self {
        ServiceApiError::Ledger(value)
    }
}

impl IntoResponse for ServiceApiError {
    fn into_response(self) -> Response {
        match self {
            ServiceApiError::Admission(e) if e.is_gateway_failure() => {
                tracing::error!(error = %e, "Checkout provider failed during join");
                error_response(
                    StatusCode::BAD_GATEWAY,
                    ErrorKind::Internal,
                    "payment provider unavailable",
                )
            }
            ServiceApiError::Admission(e) => domain_error(e.kind(), &e),
            ServiceApiError::Ledger(e) => domain_error(e.kind(), &e),
            ServiceApiError::Database(e) => {
                tracing::error!(error = %e, "Service API database error");
                error_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorKind::Internal,
                    "internal server error",
                )
            }
            ServiceApiError::PaymentNotFound => {
                error_response(StatusCode::NOT_FOUND, ErrorKind::NotFound, "payment not found")
            }
        }
    }
}

/// Internal faults are logged and masked; everything else is shown as is.
fn domain_error(kind: ErrorKind, error: &dyn std::error::Error) -> Response {
    if kind == ErrorKind::Internal {
        tracing::error!(error = %error, "Service API internal error");
        return error_response(status_for(kind), kind, "internal server error");
    }
    error_response(status_for(kind), kind, error.to_string())
}

#[cfg(test)]
mod tests {
    use crate::api::test_support::{SERVICE_SECRET, error_body, state};
    use crate::server::build_router;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use evtix_sdk::objects::{ErrorKind, JoinEventRequest};
    use evtix_sdk::signature::{SIGNATURE_HEADER, SignedObject};
    use tower::ServiceExt;
    use uuid::Uuid;

    fn join_body() -> JoinEventRequest {
        JoinEventRequest {
            event_id: Uuid::now_v7(),
            user_id: Uuid::now_v7(),
            coupon_code: None,
        }
    }

    #[tokio::test]
    async fn missing_signature_is_unauthorized() {
        let router = build_router(state().await);
        let body = serde_json::to_string(&join_body()).unwrap();
        let response = router
            .oneshot(
                Request::post("/api/v1/service/events/join")
                    .header("content-type", "application/json")
                    .body(Body::from(body))
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
    async fn wrong_key_is_unauthorized() {
        let router = build_router(state().await);
        let signed = SignedObject::new(join_body(), b"someone-else").unwrap();
        let response = router
            .oneshot(
                Request::post("/api/v1/service/events/join")
                    .header(SIGNATURE_HEADER, signed.to_header())
                    .body(Body::from(signed.json.clone()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn tampered_body_is_unauthorized() {
        let router = build_router(state().await);
        let signed = SignedObject::new(join_body(), SERVICE_SECRET).unwrap();
        let tampered = serde_json::to_string(&join_body()).unwrap();
        let response = router
            .oneshot(
                Request::post("/api/v1/service/events/join")
                    .header(SIGNATURE_HEADER, signed.to_header())
                    .body(Body::from(tampered))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn garbled_header_is_bad_request() {
        let router = build_router(state().await);
        let response = router
            .oneshot(
                Request::post("/api/v1/service/events/leave")
                    .header(SIGNATURE_HEADER, "not-a-signature")
                    .body(Body::from("{}"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
