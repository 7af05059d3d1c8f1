//! Admission coordinator: joining, leaving and pricing a registration.
//!
//! Every capacity-changing path locks the event row first. Joins for one
//! event are therefore linearized, while joins for different events never
//! contend.

use crate::checkout::{CheckoutError, CheckoutGateway, CheckoutHandle, CheckoutRequest};
use crate::coupon::{CouponRejection, evaluate_coupon};
use crate::entities::PaymentStatus;
use crate::entities::event_records::{EventRecord, EventStatus};
use crate::entities::participants::{ParticipantInsert, ParticipantRecord};
use crate::entities::payments::{PaymentInsert, PaymentRecord};
use crate::store::{StoreError, TicketingStore, TicketingTx};
use evtix_sdk::objects::{CouponQuote, ErrorKind};
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

pub const DEFAULT_CHECKOUT_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Error)]
pub enum AdmissionError {
    #[error("User not found")]
    UserNotFound,
    #[error("User account is not active")]
    UserInactive,
    #[error("Event not found")]
    EventNotFound,
    #[error("Event is not open (status: {0})")]
    EventNotOpen(EventStatus),
    #[error("Event has already ended")]
    EventEnded,
    #[error("Host cannot join own event")]
    HostCannotJoin,
    #[error("You already joined")]
    AlreadyJoined,
    #[error("Event is full")]
    EventFull,
    #[error(transparent)]
    Coupon(#[from] CouponRejection),
    #[error("You are not registered for this event")]
    NotRegistered,
    #[error("Registration is already paid")]
    AlreadyPaid,
    #[error("checkout failed: {0}")]
    Checkout(#[from] CheckoutError),
    #[error("checkout provider did not answer within {0:?}")]
    CheckoutTimeout(Duration),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl AdmissionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AdmissionError::UserNotFound
            | AdmissionError::EventNotFound
            | AdmissionError::NotRegistered => ErrorKind::NotFound,
            AdmissionError::UserInactive
            | AdmissionError::EventNotOpen(_)
            | AdmissionError::EventEnded
            | AdmissionError::HostCannotJoin => ErrorKind::InvalidState,
            AdmissionError::AlreadyJoined | AdmissionError::AlreadyPaid => ErrorKind::Conflict,
            AdmissionError::EventFull => ErrorKind::CapacityExceeded,
            AdmissionError::Coupon(rejection) => rejection.kind(),
            AdmissionError::Store(StoreError::UniqueViolation { .. }) => ErrorKind::Conflict,
            AdmissionError::Checkout(_)
            | AdmissionError::CheckoutTimeout(_)
            | AdmissionError::Store(StoreError::Database(_)) => ErrorKind::Internal,
        }
    }

    /// Whether the checkout provider, rather than this service, failed.
    pub fn is_gateway_failure(&self) -> bool {
        matches!(
            self,
            AdmissionError::Checkout(_) | AdmissionError::CheckoutTimeout(_)
        )
    }
}

/// A committed registration and where to pay for it.
#[derive(Debug, Clone)]
pub struct Admission {
    pub participant: ParticipantRecord,
    pub payment: PaymentRecord,
    pub checkout: CheckoutHandle,
    pub quote: Option<CouponQuote>,
}

pub struct AdmissionCoordinator<S> {
    store: S,
    gateway: Arc<dyn CheckoutGateway>,
    checkout_timeout: Duration,
}

impl<S: TicketingStore> AdmissionCoordinator<S> {
    pub fn new(store: S, gateway: Arc<dyn CheckoutGateway>) -> Self {
        Self {
            store,
            gateway,
            checkout_timeout: DEFAULT_CHECKOUT_TIMEOUT,
        }
    }

    /// Deadline for gateways that report none of their own.
    pub fn with_checkout_timeout(mut self, timeout: Duration) -> Self {
        self.checkout_timeout = timeout;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Register `user_id` for `event_id` and open a checkout session.
    ///
    /// Participant and payment rows, the capacity recount and any FULL flip
    /// are committed together, and only after the provider has returned a
    /// checkout handle. If the provider fails or times out the transaction is
    /// dropped, so no seat is held by a registration that cannot be paid.
    #[tracing::instrument(skip_all, err, fields(%event_id, %user_id))]
    pub async fn join_event(
        &self,
        event_id: Uuid,
        user_id: Uuid,
        coupon_code: Option<&str>,
    ) -> Result<Admission, AdmissionError> {
        let user = self
            .store
            .find_user(user_id)
            .await?
            .ok_or(AdmissionError::UserNotFound)?;
        if !user.is_active {
            return Err(AdmissionError::UserInactive);
        }

        let now = OffsetDateTime::now_utc();
        let mut tx = self.store.begin().await?;

        let event = tx
            .lock_event(event_id)
            .await?
            .ok_or(AdmissionError::EventNotFound)?;
        match event.status {
            EventStatus::Open => {}
            EventStatus::Full => return Err(AdmissionError::EventFull),
            other => return Err(AdmissionError::EventNotOpen(other)),
        }
        if event.ends_at <= now {
            return Err(AdmissionError::EventEnded);
        }
        if event.host_id == user_id {
            return Err(AdmissionError::HostCannotJoin);
        }
        if tx.find_participant(user_id, event_id).await?.is_some() {
            return Err(AdmissionError::AlreadyJoined);
        }
        let count = tx.count_participants(event_id).await?;
        if event.is_filled_by(count) {
            return Err(AdmissionError::EventFull);
        }

        let quote = match coupon_code.map(str::trim).filter(|c| !c.is_empty()) {
            Some(code) => Some(evaluate_coupon(Some(&event), None, code, now)?),
            None => None,
        };

        let participant = tx
            .insert_participant(ParticipantInsert {
                user_id,
                event_id,
                coupon_applied: quote.is_some(),
            })
            .await
            .map_err(duplicate_as_already_joined)?;
        let payment = tx
            .insert_payment(PaymentInsert {
                user_id,
                event_id,
                amount: quote
                    .as_ref()
                    .map_or(event.ticket_price, |q| q.final_price),
                coupon_code: quote.as_ref().map(|q| q.coupon_code.clone()),
                discount_amount: quote
                    .as_ref()
                    .map_or(Decimal::ZERO, |q| q.discount_amount),
            })
            .await?;

        let count = tx.count_participants(event_id).await?;
        if event.max_participants.is_some_and(|max| count > i64::from(max)) {
            return Err(AdmissionError::EventFull);
        }
        if event.is_filled_by(count) {
            tx.set_event_status(event_id, EventStatus::Full).await?;
            info!(%event_id, count, "Event reached capacity");
        }

        let request = CheckoutRequest {
            payment_id: payment.payment_id,
            event_id,
            user_id,
            amount: payment.amount,
            event_name: event.name.clone(),
        };
        let deadline = self
            .gateway
            .deadline()
            .await
            .unwrap_or(self.checkout_timeout);
        let checkout =
            match tokio::time::timeout(deadline, self.gateway.create_checkout(request)).await {
                Ok(Ok(handle)) => handle,
                Ok(Err(e)) => {
                    warn!(%event_id, %user_id, payment_id = %payment.payment_id, error = %e, "Checkout failed, rolling back registration");
                    return Err(e.into());
                }
                Err(_) => {
                    warn!(%event_id, %user_id, payment_id = %payment.payment_id, "Checkout timed out, rolling back registration");
                    return Err(AdmissionError::CheckoutTimeout(deadline));
                }
            };

        tx.commit().await.map_err(duplicate_as_already_joined)?;
        info!(
            %event_id,
            %user_id,
            participant_id = %participant.participant_id,
            payment_id = %payment.payment_id,
            amount = %payment.amount,
            "Participant admitted"
        );

        Ok(Admission {
            participant,
            payment,
            checkout,
            quote,
        })
    }

    /// Price a coupon for the caller without reserving anything.
    pub async fn check_coupon(
        &self,
        event_id: Uuid,
        user_id: Uuid,
        code: &str,
    ) -> Result<CouponQuote, AdmissionError> {
        let event = self.store.find_event(event_id).await?;
        let participant = self.store.find_participant(user_id, event_id).await?;
        Ok(evaluate_coupon(
            event.as_ref(),
            participant.as_ref(),
            code,
            OffsetDateTime::now_utc(),
        )?)
    }

    /// Withdraw an unpaid registration and free its seat.
    #[tracing::instrument(skip_all, err, fields(%event_id, %user_id))]
    pub async fn leave_event(&self, event_id: Uuid, user_id: Uuid) -> Result<(), AdmissionError> {
        let mut tx = self.store.begin().await?;
        let event = tx
            .lock_event(event_id)
            .await?
            .ok_or(AdmissionError::EventNotFound)?;
        let participant = tx
            .find_participant(user_id, event_id)
            .await?
            .ok_or(AdmissionError::NotRegistered)?;
        if participant.payment_status == PaymentStatus::Paid {
            return Err(AdmissionError::AlreadyPaid);
        }
        if !release_tx(&mut tx, &event, &participant).await? {
            return Err(AdmissionError::AlreadyPaid);
        }
        tx.commit().await?;
        info!(%event_id, %user_id, "Participant left event");
        Ok(())
    }

    /// Release a registration that has stayed UNPAID since before
    /// `created_before`.
    ///
    /// Returns `false` when the registration is gone, paid, or newer than the
    /// cutoff by the time the event lock is held.
    pub async fn expire_registration(
        &self,
        stale: &ParticipantRecord,
        created_before: OffsetDateTime,
    ) -> Result<bool, AdmissionError> {
        let mut tx = self.store.begin().await?;
        let Some(event) = tx.lock_event(stale.event_id).await? else {
            return Ok(false);
        };
        let Some(current) = tx.find_participant(stale.user_id, stale.event_id).await? else {
            return Ok(false);
        };
        if current.payment_status == PaymentStatus::Paid || current.created_at >= created_before {
            return Ok(false);
        }
        if !release_tx(&mut tx, &event, &current).await? {
            return Ok(false);
        }
        tx.commit().await?;
        info!(
            event_id = %current.event_id,
            user_id = %current.user_id,
            participant_id = %current.participant_id,
            "Expired unpaid registration"
        );
        Ok(true)
    }
}

fn duplicate_as_already_joined(err: StoreError) -> AdmissionError {
    match err {
        StoreError::UniqueViolation { .. } => AdmissionError::AlreadyJoined,
        other => AdmissionError::Store(other),
    }
}

/// Delete the registration and its unpaid payments, then reopen a FULL
/// event that now has room. Returns `false` if the registration was paid
/// concurrently, in which case the caller must drop the transaction.
async fn release_tx<T: TicketingTx>(
    tx: &mut T,
    event: &EventRecord,
    participant: &ParticipantRecord,
) -> Result<bool, StoreError> {
    tx.delete_unpaid_payments(participant.user_id, participant.event_id)
        .await?;
    if tx.delete_participant(participant.participant_id).await? == 0 {
        return Ok(false);
    }
    if event.status == EventStatus::Full {
        let count = tx.count_participants(event.event_id).await?;
        if !event.is_filled_by(count) {
            tx.set_event_status(event.event_id, EventStatus::Open)
                .await?;
            info!(event_id = %event.event_id, count, "Event reopened after release");
        }
    }
    Ok(true)
}
