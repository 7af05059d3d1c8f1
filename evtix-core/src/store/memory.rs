//! In-process [`TicketingStore`] for tests.
//!
//! One mutex guards the whole state. A transaction holds the lock from
//! `begin` until it is committed or dropped and works on a staged copy, so a
//! dropped transaction leaves no trace.

use super::{StoreError, TicketingStore, TicketingTx};
use crate::entities::PaymentStatus;
use crate::entities::event_records::{EventRecord, EventStatus};
use crate::entities::participants::{ParticipantInsert, ParticipantRecord};
use crate::entities::payments::{PaymentInsert, PaymentRecord};
use crate::entities::reconciliation_failures::{
    ReconciliationFailureInsert, ReconciliationFailureRecord,
};
use crate::entities::users::UserRecord;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use time::OffsetDateTime;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

#[derive(Debug, Clone, Default)]
struct MemoryState {
    users: HashMap<Uuid, UserRecord>,
    events: HashMap<Uuid, EventRecord>,
    participants: HashMap<Uuid, ParticipantRecord>,
    payments: HashMap<Uuid, PaymentRecord>,
    failures: Vec<ReconciliationFailureRecord>,
}

impl MemoryState {
    fn participant(&self, user_id: Uuid, event_id: Uuid) -> Option<&ParticipantRecord> {
        self.participants
            .values()
            .find(|p| p.user_id == user_id && p.event_id == event_id)
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_user(&self, user: UserRecord) {
        self.state.lock().await.users.insert(user.user_id, user);
    }

    pub async fn insert_event(&self, event: EventRecord) {
        self.state.lock().await.events.insert(event.event_id, event);
    }

    pub async fn event(&self, event_id: Uuid) -> Option<EventRecord> {
        self.state.lock().await.events.get(&event_id).cloned()
    }

    pub async fn participants_of(&self, event_id: Uuid) -> Vec<ParticipantRecord> {
        let mut out: Vec<_> = self
            .state
            .lock()
            .await
            .participants
            .values()
            .filter(|p| p.event_id == event_id)
            .cloned()
            .collect();
        out.sort_by_key(|p| p.created_at);
        out
    }

    pub async fn payments_of(&self, event_id: Uuid) -> Vec<PaymentRecord> {
        let mut out: Vec<_> = self
            .state
            .lock()
            .await
            .payments
            .values()
            .filter(|p| p.event_id == event_id)
            .cloned()
            .collect();
        out.sort_by_key(|p| p.created_at);
        out
    }

    pub async fn payment(&self, payment_id: Uuid) -> Option<PaymentRecord> {
        self.state.lock().await.payments.get(&payment_id).cloned()
    }

    pub async fn reconciliation_failures(&self) -> Vec<ReconciliationFailureRecord> {
        self.state.lock().await.failures.clone()
    }

    /// Move a registration's creation time, for expiry tests.
    pub async fn backdate_participant(&self, participant_id: Uuid, created_at: OffsetDateTime) {
        if let Some(p) = self
            .state
            .lock()
            .await
            .participants
            .get_mut(&participant_id)
        {
            p.created_at = created_at;
        }
    }

    /// Remove a registration without touching its payment, to simulate drift.
    pub async fn remove_participant(&self, participant_id: Uuid) {
        self.state
            .lock()
            .await
            .participants
            .remove(&participant_id);
    }
}

pub struct MemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    staged: MemoryState,
}

#[async_trait]
impl TicketingStore for MemoryStore {
    type Tx = MemoryTx;

    async fn begin(&self) -> Result<MemoryTx, StoreError> {
        let guard = self.state.clone().lock_owned().await;
        let staged = guard.clone();
        Ok(MemoryTx { guard, staged })
    }

    async fn find_user(&self, user_id: Uuid) -> Result<Option<UserRecord>, StoreError> {
        Ok(self.state.lock().await.users.get(&user_id).cloned())
    }

    async fn find_event(&self, event_id: Uuid) -> Result<Option<EventRecord>, StoreError> {
        Ok(self.state.lock().await.events.get(&event_id).cloned())
    }

    async fn find_participant(
        &self,
        user_id: Uuid,
        event_id: Uuid,
    ) -> Result<Option<ParticipantRecord>, StoreError> {
        Ok(self
            .state
            .lock()
            .await
            .participant(user_id, event_id)
            .cloned())
    }

    async fn find_stale_unpaid(
        &self,
        created_before: OffsetDateTime,
        limit: i64,
    ) -> Result<Vec<ParticipantRecord>, StoreError> {
        let mut out: Vec<_> = self
            .state
            .lock()
            .await
            .participants
            .values()
            .filter(|p| p.payment_status == PaymentStatus::Unpaid && p.created_at < created_before)
            .cloned()
            .collect();
        out.sort_by_key(|p| p.created_at);
        out.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(out)
    }

    async fn record_reconciliation_failure(
        &self,
        failure: ReconciliationFailureInsert,
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        let id = state.failures.len() as i64 + 1;
        state.failures.push(ReconciliationFailureRecord {
            id,
            payment_id: failure.payment_id,
            event_id: failure.event_id,
            user_id: failure.user_id,
            transaction_id: failure.transaction_id,
            reason: failure.reason,
            payload: failure.payload,
            created_at: OffsetDateTime::now_utc(),
        });
        Ok(())
    }
}

#[async_trait]
impl TicketingTx for MemoryTx {
    async fn lock_event(&mut self, event_id: Uuid) -> Result<Option<EventRecord>, StoreError> {
        Ok(self.staged.events.get(&event_id).cloned())
    }

    async fn set_event_status(
        &mut self,
        event_id: Uuid,
        status: EventStatus,
    ) -> Result<(), StoreError> {
        if let Some(event) = self.staged.events.get_mut(&event_id) {
            event.status = status;
        }
        Ok(())
    }

    async fn find_participant(
        &mut self,
        user_id: Uuid,
        event_id: Uuid,
    ) -> Result<Option<ParticipantRecord>, StoreError> {
        Ok(self.staged.participant(user_id, event_id).cloned())
    }

    async fn count_participants(&mut self, event_id: Uuid) -> Result<i64, StoreError> {
        Ok(self
            .staged
            .participants
            .values()
            .filter(|p| p.event_id == event_id)
            .count() as i64)
    }

    async fn insert_participant(
        &mut self,
        insert: ParticipantInsert,
    ) -> Result<ParticipantRecord, StoreError> {
        if self
            .staged
            .participant(insert.user_id, insert.event_id)
            .is_some()
        {
            return Err(StoreError::UniqueViolation {
                constraint: "participants_user_id_event_id_key".to_owned(),
            });
        }
        let record = ParticipantRecord {
            participant_id: Uuid::now_v7(),
            user_id: insert.user_id,
            event_id: insert.event_id,
            payment_status: PaymentStatus::Unpaid,
            coupon_applied: insert.coupon_applied,
            created_at: OffsetDateTime::now_utc(),
        };
        self.staged
            .participants
            .insert(record.participant_id, record.clone());
        Ok(record)
    }

    async fn delete_participant(&mut self, participant_id: Uuid) -> Result<u64, StoreError> {
        let unpaid = self
            .staged
            .participants
            .get(&participant_id)
            .is_some_and(|p| p.payment_status == PaymentStatus::Unpaid);
        if unpaid {
            self.staged.participants.remove(&participant_id);
        }
        Ok(u64::from(unpaid))
    }

    async fn mark_participant_paid(
        &mut self,
        user_id: Uuid,
        event_id: Uuid,
    ) -> Result<u64, StoreError> {
        let mut updated = 0;
        for p in self.staged.participants.values_mut() {
            if p.user_id == user_id && p.event_id == event_id {
                p.payment_status = PaymentStatus::Paid;
                updated += 1;
            }
        }
        Ok(updated)
    }

    async fn insert_payment(&mut self, insert: PaymentInsert) -> Result<PaymentRecord, StoreError> {
        let record = PaymentRecord {
            payment_id: Uuid::now_v7(),
            user_id: insert.user_id,
            event_id: insert.event_id,
            amount: insert.amount,
            coupon_code: insert.coupon_code,
            discount_amount: insert.discount_amount,
            status: PaymentStatus::Unpaid,
            transaction_id: None,
            gateway_payload: None,
            created_at: OffsetDateTime::now_utc(),
            paid_at: None,
        };
        self.staged
            .payments
            .insert(record.payment_id, record.clone());
        Ok(record)
    }

    async fn lock_payment(
        &mut self,
        payment_id: Uuid,
    ) -> Result<Option<PaymentRecord>, StoreError> {
        Ok(self.staged.payments.get(&payment_id).cloned())
    }

    async fn find_payment_by_transaction(
        &mut self,
        transaction_id: &str,
    ) -> Result<Option<PaymentRecord>, StoreError> {
        Ok(self
            .staged
            .payments
            .values()
            .find(|p| p.transaction_id.as_deref() == Some(transaction_id))
            .cloned())
    }

    async fn mark_payment_paid(
        &mut self,
        payment_id: Uuid,
        transaction_id: &str,
        gateway_payload: &serde_json::Value,
    ) -> Result<u64, StoreError> {
        let taken = self
            .staged
            .payments
            .values()
            .any(|p| p.payment_id != payment_id && p.transaction_id.as_deref() == Some(transaction_id));
        if taken {
            return Err(StoreError::UniqueViolation {
                constraint: "payments_transaction_id_key".to_owned(),
            });
        }
        match self.staged.payments.get_mut(&payment_id) {
            Some(payment) if payment.status == PaymentStatus::Unpaid => {
                payment.status = PaymentStatus::Paid;
                payment.transaction_id = Some(transaction_id.to_owned());
                payment.gateway_payload = Some(gateway_payload.clone());
                payment.paid_at = Some(OffsetDateTime::now_utc());
                Ok(1)
            }
            _ => Ok(0),
        }
    }

    async fn delete_unpaid_payments(
        &mut self,
        user_id: Uuid,
        event_id: Uuid,
    ) -> Result<u64, StoreError> {
        let before = self.staged.payments.len();
        self.staged.payments.retain(|_, p| {
            !(p.user_id == user_id && p.event_id == event_id && p.status == PaymentStatus::Unpaid)
        });
        Ok((before - self.staged.payments.len()) as u64)
    }

    async fn commit(self) -> Result<(), StoreError> {
        let MemoryTx { mut guard, staged } = self;
        *guard = staged;
        Ok(())
    }
}
