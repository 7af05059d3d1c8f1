//! HTTP client for the evtix service API.
//!
//! Gated behind the `client` cargo feature so downstream crates that only
//! need the shared types do not pull in `reqwest`.

mod service;

pub use service::ServiceClient;

use reqwest::StatusCode;

use crate::objects::ErrorBody;
use crate::signature::SignatureError;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Transport-level failure (DNS, TLS, connection reset, …).
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("signature error: {0}")]
    Signature(#[from] SignatureError),

    /// The server refused the request with a typed error body.
    #[error("request rejected ({status}): {} - {}", .error.kind, .error.message)]
    Rejected { status: StatusCode, error: ErrorBody },

    /// Non-2xx response without a recognizable error body.
    #[error("api error: status {status}, body: {body}")]
    Api { status: StatusCode, body: String },

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
}
