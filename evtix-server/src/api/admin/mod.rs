//! Admin API handlers.
//!
//! These endpoints are called by operators and require the
//! `Evtix-Admin-Authorization` header with the plaintext admin secret.
//!
//! # Endpoints
//!
//! - `GET /events/{event_id}/participants` – registrations of one event
//! - `GET /reconciliation-failures`        – journalled callbacks awaiting an operator

use axum::{
    Router,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use evtix_sdk::objects::ErrorKind;

use super::error_response;
use crate::state::AppState;

mod list_participants;
mod list_reconciliation_failures;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/events/{event_id}/participants",
            get(list_participants::list_participants),
        )
        .route(
            "/reconciliation-failures",
            get(list_reconciliation_failures::list_reconciliation_failures),
        )
}

#[derive(Debug)]
pub(crate) enum AdminApiError {
    Database(sqlx::Error),
    NotFound,
}

impl IntoResponse for AdminApiError {
    fn into_response(self) -> Response {
        match self {
            AdminApiError::Database(e) => {
                tracing::error!(error = %e, "Admin API database error");
                error_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorKind::Internal,
                    "internal server error",
                )
            }
            AdminApiError::NotFound => {
                error_response(StatusCode::NOT_FOUND, ErrorKind::NotFound, "resource not found")
            }
        }
    }
}
