//! Admin API request and response types.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::payment::PaymentStatus;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminParticipantResponse {
    pub participant_id: Uuid,
    pub user_id: Uuid,
    pub event_id: Uuid,
    pub payment_status: PaymentStatus,
    pub coupon_applied: bool,
    pub created_at: i64,
}

/// A callback that could not be reconciled and needs operator attention.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconciliationFailureResponse {
    pub id: i64,
    pub payment_id: Uuid,
    pub event_id: Uuid,
    pub user_id: Uuid,
    pub transaction_id: String,
    pub reason: String,
    pub payload: serde_json::Value,
    pub created_at: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaginationQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

pub const DEFAULT_PAGE_SIZE: i64 = 50;
pub const MAX_PAGE_SIZE: i64 = 200;

/// Clamp client-supplied pagination to sane bounds.
pub fn clamp_pagination(limit: Option<i64>, offset: Option<i64>) -> (i64, i64) {
    let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    let offset = offset.unwrap_or(0).max(0);
    (limit, offset)
}
