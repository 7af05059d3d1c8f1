//! Payment bodies: the provider callback and payment lookups.

use crate::signature::Signature;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Payment status for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Unpaid,
    Paid,
}

/// Status reported by the payment provider. Only `Paid` changes state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GatewayPaymentStatus {
    Paid,
    Unpaid,
    Failed,
    Cancelled,
}

/// Asynchronous notification from the payment provider.
///
/// The correlation ids are the ones evtix attached when the checkout session
/// was created; the provider echoes them back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentCallback {
    pub payment_id: Uuid,
    pub event_id: Uuid,
    pub user_id: Uuid,
    pub transaction_id: String,
    pub payment_status: GatewayPaymentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<Decimal>,
}

impl Signature for PaymentCallback {}

/// Acknowledgement returned to the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackAck {
    pub received: bool,
}

/// `POST /payments/status`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetPaymentRequest {
    pub payment_id: Uuid,
}

impl Signature for GetPaymentRequest {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentResponse {
    pub payment_id: Uuid,
    pub event_id: Uuid,
    pub user_id: Uuid,
    pub amount: Decimal,
    pub status: PaymentStatus,
    pub transaction_id: Option<String>,
    pub created_at: i64,
    pub paid_at: Option<i64>,
}
