//! Host-initiated event status changes.

use crate::entities::event_records::{EventRecord, EventStatus};
use crate::store::{StoreError, TicketingStore, TicketingTx};
use evtix_sdk::objects::ErrorKind;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Event not found")]
    EventNotFound,
    #[error("Only the host can change this event")]
    NotHost,
    #[error("Event cannot move from {from} to {to}")]
    IllegalTransition { from: EventStatus, to: EventStatus },
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::EventNotFound => ErrorKind::NotFound,
            LedgerError::NotHost | LedgerError::IllegalTransition { .. } => ErrorKind::InvalidState,
            LedgerError::Store(_) => ErrorKind::Internal,
        }
    }
}

pub struct EventLedger<S> {
    store: S,
}

impl<S: TicketingStore> EventLedger<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Apply a guarded status change on behalf of `host_id`.
    ///
    /// Hosts may request OPEN, CANCELLED or COMPLETED. FULL is owned by
    /// admission and is never accepted as a requested target. Runs under the
    /// same event lock as admission, so it never interleaves with a join's
    /// capacity check.
    ///
    /// Reopening an event that is already at capacity is validated as
    /// `-> OPEN` and then stored as FULL, the same flip admission applies
    /// when the last seat is taken.
    #[tracing::instrument(skip_all, err, fields(%event_id, %host_id, %next))]
    pub async fn change_status(
        &self,
        event_id: Uuid,
        host_id: Uuid,
        next: EventStatus,
    ) -> Result<EventRecord, LedgerError> {
        let mut tx = self.store.begin().await?;
        let mut event = tx
            .lock_event(event_id)
            .await?
            .ok_or(LedgerError::EventNotFound)?;
        if event.host_id != host_id {
            return Err(LedgerError::NotHost);
        }
        if next == EventStatus::Full || !event.status.can_transition_to(next) {
            return Err(LedgerError::IllegalTransition {
                from: event.status,
                to: next,
            });
        }

        let mut target = next;
        // System-applied: capacity, not the host, decides FULL.
        if target == EventStatus::Open {
            let count = tx.count_participants(event_id).await?;
            if event.is_filled_by(count) {
                target = EventStatus::Full;
            }
        }
        if target != event.status {
            tx.set_event_status(event_id, target).await?;
        }
        tx.commit().await?;

        info!(%event_id, from = %event.status, to = %target, "Event status changed");
        event.status = target;
        Ok(event)
    }
}
