//! Error taxonomy shared by every API surface.

use serde::{Deserialize, Serialize};

/// Kind of failure, independent of the component that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// An event, user, participant or payment reference does not resolve.
    NotFound,
    /// Duplicate join, duplicate coupon application, or paying twice.
    Conflict,
    /// The event was full at the moment of commit.
    CapacityExceeded,
    /// The entity is not in a state that allows the operation.
    InvalidState,
    /// A request or callback signature did not verify.
    AuthenticationFailure,
    /// A callback references state that cannot be reconciled. Needs an operator.
    ConsistencyFailure,
    /// Infrastructure fault (database, payment provider transport).
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::CapacityExceeded => "capacity_exceeded",
            ErrorKind::InvalidState => "invalid_state",
            ErrorKind::AuthenticationFailure => "authentication_failure",
            ErrorKind::ConsistencyFailure => "consistency_failure",
            ErrorKind::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// JSON body returned with every non-2xx response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub kind: ErrorKind,
    pub message: String,
}

impl ErrorBody {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}
