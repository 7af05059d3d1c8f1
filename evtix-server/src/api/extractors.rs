//! Custom Axum extractors for request authentication.
//!
//! - `SignedBody<T>` verifies the `Evtix-Signature` header against the JSON
//!   body with the service secret (Service API).
//! - `AdminAuth` checks the `Evtix-Admin-Authorization` header against the
//!   hashed admin secret (Admin API).
//!
//! Signature checks are delegated to [`evtix_sdk::signature`].

use axum::{
    extract::{FromRequest, FromRequestParts, Request},
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use evtix_sdk::objects::ErrorKind;
use evtix_sdk::signature::{
    ADMIN_AUTH_HEADER, SIGNATURE_HEADER, Signature, SignatureError, SignedObject,
};

use super::error_response;
use crate::state::AppState;

/// Largest request body a signed endpoint will read.
pub(crate) const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Verifies the `Evtix-Signature` header and deserializes the JSON body.
///
/// # Header format
///
/// ```text
/// Evtix-Signature: {unix_timestamp}.{base64_signature}
/// ```
///
/// The signature is `HMAC-SHA256("{timestamp}.{json_body}", service_secret)`.
pub struct SignedBody<T: Signature>(pub T);

#[derive(Debug, thiserror::Error)]
pub enum SignedBodyError {
    #[error("missing Evtix-Signature header")]
    MissingHeader,
    #[error("invalid Evtix-Signature header format")]
    InvalidHeader,
    #[error("invalid signature encoding")]
    InvalidBase64,
    #[error("failed to read request body")]
    BodyReadError,
    #[error("invalid JSON body: {0}")]
    JsonError(serde_json::Error),
    #[error("signature verification failed")]
    VerificationFailed,
    #[error("signature expired")]
    Expired,
}

impl From<SignatureError> for SignedBodyError {
    fn from(err: SignatureError) -> Self {
        match err {
            SignatureError::InvalidFormat => Self::InvalidHeader,
            SignatureError::InvalidBase64 => Self::InvalidBase64,
            SignatureError::Json(e) => Self::JsonError(e),
            SignatureError::SignatureMismatch => Self::VerificationFailed,
            SignatureError::Expired | SignatureError::FromTheFuture => Self::Expired,
        }
    }
}

impl IntoResponse for SignedBodyError {
    fn into_response(self) -> Response {
        let status = match self {
            SignedBodyError::MissingHeader
            | SignedBodyError::VerificationFailed
            | SignedBodyError::Expired => StatusCode::UNAUTHORIZED,
            SignedBodyError::InvalidHeader
            | SignedBodyError::InvalidBase64
            | SignedBodyError::BodyReadError
            | SignedBodyError::JsonError(_) => StatusCode::BAD_REQUEST,
        };
        tracing::debug!(error = %self, "Rejected signed request");
        error_response(status, ErrorKind::AuthenticationFailure, self.to_string())
    }
}

impl<T: Signature + Send> FromRequest<AppState> for SignedBody<T> {
    type Rejection = SignedBodyError;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        let header_value = req
            .headers()
            .get(SIGNATURE_HEADER)
            .ok_or(SignedBodyError::MissingHeader)?
            .to_str()
            .map_err(|_| SignedBodyError::InvalidHeader)?
            .to_owned();

        let body_bytes = axum::body::to_bytes(req.into_body(), MAX_BODY_BYTES)
            .await
            .map_err(|_| SignedBodyError::BodyReadError)?;

        let json =
            String::from_utf8(body_bytes.to_vec()).map_err(|_| SignedBodyError::BodyReadError)?;

        let signed = SignedObject::<T>::from_header_and_body(&header_value, json)?;

        let service = state.config.service.read().await;
        let verified_body = signed.verify(service.secret_bytes())?;
        drop(service);

        Ok(SignedBody(verified_body))
    }
}

/// Proof that the request carried the admin secret.
///
/// ```text
/// Evtix-Admin-Authorization: {plaintext_admin_secret}
/// ```
pub struct AdminAuth;

#[derive(Debug, thiserror::Error)]
pub enum AdminAuthError {
    #[error("missing Evtix-Admin-Authorization header")]
    MissingHeader,
    #[error("invalid admin credentials")]
    InvalidCredentials,
}

impl IntoResponse for AdminAuthError {
    fn into_response(self) -> Response {
        error_response(
            StatusCode::UNAUTHORIZED,
            ErrorKind::AuthenticationFailure,
            self.to_string(),
        )
    }
}

impl FromRequestParts<AppState> for AdminAuth {
    type Rejection = AdminAuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let presented = parts
            .headers
            .get(ADMIN_AUTH_HEADER)
            .ok_or(AdminAuthError::MissingHeader)?
            .to_str()
            .map_err(|_| AdminAuthError::InvalidCredentials)?;

        let admin = state.config.admin.read().await;
        if !admin.verify_secret(presented) {
            drop(admin);
            tracing::warn!("Rejected admin request with invalid credentials");
            return Err(AdminAuthError::InvalidCredentials);
        }
        drop(admin);

        Ok(AdminAuth)
    }
}
