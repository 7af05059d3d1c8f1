//! Service API bodies for joining, leaving and pricing an event.

use crate::signature::Signature;
use compact_str::CompactString;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Event lifecycle status.
///
/// This is the API/DTO version. For database operations, use the version in
/// `evtix-core::entities`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Open,
    Full,
    Cancelled,
    Completed,
}

impl std::fmt::Display for EventStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventStatus::Open => write!(f, "open"),
            EventStatus::Full => write!(f, "full"),
            EventStatus::Cancelled => write!(f, "cancelled"),
            EventStatus::Completed => write!(f, "completed"),
        }
    }
}

/// `POST /events/join`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinEventRequest {
    pub event_id: Uuid,
    pub user_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coupon_code: Option<CompactString>,
}

impl Signature for JoinEventRequest {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinEventResponse {
    pub participant_id: Uuid,
    pub payment_id: Uuid,
    /// Amount charged after any coupon discount.
    pub amount: Decimal,
    /// Hosted payment page the user is redirected to.
    pub checkout_url: url::Url,
}

/// `POST /events/coupon`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CouponCheckRequest {
    pub event_id: Uuid,
    pub user_id: Uuid,
    pub coupon_code: CompactString,
}

impl Signature for CouponCheckRequest {}

/// Advisory discount quote. Never persisted; joining re-validates the code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CouponQuote {
    pub coupon_code: CompactString,
    pub discount_percent: Decimal,
    pub original_price: Decimal,
    pub discount_amount: Decimal,
    pub final_price: Decimal,
}

/// `POST /events/leave`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaveEventRequest {
    pub event_id: Uuid,
    pub user_id: Uuid,
}

impl Signature for LeaveEventRequest {}

/// `POST /events/status`, issued on behalf of the event host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEventStatusRequest {
    pub event_id: Uuid,
    pub user_id: Uuid,
    pub status: EventStatus,
}

impl Signature for ChangeEventStatusRequest {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventResponse {
    pub event_id: Uuid,
    pub host_id: Uuid,
    pub name: String,
    pub status: EventStatus,
    pub min_participants: Option<i32>,
    pub max_participants: Option<i32>,
    pub ticket_price: Decimal,
    pub starts_at: i64,
    pub ends_at: i64,
}
