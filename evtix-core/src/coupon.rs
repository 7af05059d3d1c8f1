//! Coupon pricing.
//!
//! [`evaluate_coupon`] is a pure check of a coupon code against an event and
//! the caller's current registration. It never writes; the admission
//! coordinator re-runs it inside the join transaction before the quote is
//! snapshotted onto a payment.

use crate::entities::PaymentStatus;
use crate::entities::event_records::{EventRecord, EventStatus};
use crate::entities::participants::ParticipantRecord;
use evtix_sdk::objects::{CouponQuote, ErrorKind};
use rust_decimal::{Decimal, RoundingStrategy};
use thiserror::Error;

/// Why a coupon was refused. Variants are listed in evaluation order.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CouponRejection {
    #[error("Event not found")]
    EventNotFound,
    #[error("Event is not open (status: {0})")]
    EventNotOpen(EventStatus),
    #[error("Event has already ended")]
    EventEnded,
    #[error("Coupon is not active for this event")]
    CouponInactive,
    #[error("Coupon discount is not configured correctly")]
    CouponMisconfigured,
    #[error("Coupon code does not match")]
    CodeMismatch,
    #[error("Registration is already paid")]
    AlreadyPaid,
    #[error("A coupon has already been applied to this registration")]
    AlreadyApplied,
}

impl CouponRejection {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CouponRejection::EventNotFound => ErrorKind::NotFound,
            CouponRejection::EventNotOpen(_)
            | CouponRejection::EventEnded
            | CouponRejection::CouponInactive
            | CouponRejection::CouponMisconfigured
            | CouponRejection::CodeMismatch => ErrorKind::InvalidState,
            CouponRejection::AlreadyPaid | CouponRejection::AlreadyApplied => ErrorKind::Conflict,
        }
    }
}

/// Round half away from zero to two decimal places.
pub fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Validate `code` and price it.
///
/// Checks run in a fixed order and the first failure wins: the event exists,
/// is OPEN and has not ended; its coupon is active and non-empty; the codes
/// match ignoring case and surrounding whitespace; and the caller's existing
/// registration, if any, is neither paid nor already discounted.
pub fn evaluate_coupon(
    event: Option<&EventRecord>,
    participant: Option<&ParticipantRecord>,
    code: &str,
    now: time::OffsetDateTime,
) -> Result<CouponQuote, CouponRejection> {
    let event = event.ok_or(CouponRejection::EventNotFound)?;
    if event.status != EventStatus::Open {
        return Err(CouponRejection::EventNotOpen(event.status));
    }
    if event.ends_at <= now {
        return Err(CouponRejection::EventEnded);
    }

    let configured = event
        .coupon_code
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty());
    let Some(configured) = configured.filter(|_| event.coupon_active) else {
        return Err(CouponRejection::CouponInactive);
    };
    let percent = event
        .coupon_discount
        .filter(|p| *p > Decimal::ZERO && *p <= Decimal::ONE_HUNDRED)
        .ok_or(CouponRejection::CouponMisconfigured)?;

    if !configured.eq_ignore_ascii_case(code.trim()) {
        return Err(CouponRejection::CodeMismatch);
    }

    if let Some(participant) = participant {
        if participant.payment_status == PaymentStatus::Paid {
            return Err(CouponRejection::AlreadyPaid);
        }
        if participant.coupon_applied {
            return Err(CouponRejection::AlreadyApplied);
        }
    }

    let original_price = event.ticket_price;
    let discount_amount = round2(original_price * percent / Decimal::ONE_HUNDRED);
    Ok(CouponQuote {
        coupon_code: configured.into(),
        discount_percent: percent,
        original_price,
        discount_amount,
        final_price: original_price - discount_amount,
    })
}
