//! HTTP surfaces.
//!
//! - `service` - signed calls from the identity backend
//! - `gateway` - payment callbacks from the hosted checkout provider
//! - `admin`   - operator endpoints behind the admin secret
//!
//! Every non-2xx response carries an [`ErrorBody`] whose `kind` decides the
//! status code through [`status_for`].

pub mod admin;
pub mod extractors;
pub mod gateway;
pub mod service;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use evtix_sdk::objects::{ErrorBody, ErrorKind};

pub(crate) fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Conflict | ErrorKind::CapacityExceeded => StatusCode::CONFLICT,
        ErrorKind::InvalidState => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::AuthenticationFailure => StatusCode::UNAUTHORIZED,
        ErrorKind::ConsistencyFailure | ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub(crate) fn error_response(
    status: StatusCode,
    kind: ErrorKind,
    message: impl Into<String>,
) -> Response {
    (status, Json(ErrorBody::new(kind, message))).into_response()
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_map_to_statuses() {
        assert_eq!(status_for(ErrorKind::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(status_for(ErrorKind::CapacityExceeded), StatusCode::CONFLICT);
        assert_eq!(
            status_for(ErrorKind::InvalidState),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_for(ErrorKind::ConsistencyFailure),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
