//! Storage seam used by the admission coordinator, the event ledger and the
//! payment reconciler.
//!
//! [`TicketingStore`] serves plain reads and opens transactions;
//! [`TicketingTx`] holds the locked read-modify-write primitives. A
//! transaction that is dropped without [`commit`](TicketingTx::commit) rolls
//! back.
//!
//! Implementations:
//! - [`PgStore`] – PostgreSQL, row locks via `SELECT … FOR UPDATE`.
//! - `MemoryStore` – in-process, compiled for unit tests only.

#[cfg(test)]
pub mod memory;
pub mod postgres;

pub use postgres::{PgStore, PgTx};

#[cfg(test)]
pub use memory::MemoryStore;

use crate::entities::event_records::{EventRecord, EventStatus};
use crate::entities::participants::{ParticipantInsert, ParticipantRecord};
use crate::entities::payments::{PaymentInsert, PaymentRecord};
use crate::entities::reconciliation_failures::ReconciliationFailureInsert;
use crate::entities::users::UserRecord;
use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(sqlx::Error),

    /// A unique constraint rejected the write (e.g. a concurrent duplicate join).
    #[error("unique constraint violated: {constraint}")]
    UniqueViolation { constraint: String },
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                return StoreError::UniqueViolation {
                    constraint: db_err.constraint().unwrap_or_default().to_owned(),
                };
            }
        }
        StoreError::Database(err)
    }
}

#[async_trait]
pub trait TicketingStore: Send + Sync + 'static {
    type Tx: TicketingTx;

    async fn begin(&self) -> Result<Self::Tx, StoreError>;

    async fn find_user(&self, user_id: Uuid) -> Result<Option<UserRecord>, StoreError>;

    async fn find_event(&self, event_id: Uuid) -> Result<Option<EventRecord>, StoreError>;

    async fn find_participant(
        &self,
        user_id: Uuid,
        event_id: Uuid,
    ) -> Result<Option<ParticipantRecord>, StoreError>;

    /// Unpaid registrations created before `created_before`, oldest first.
    async fn find_stale_unpaid(
        &self,
        created_before: time::OffsetDateTime,
        limit: i64,
    ) -> Result<Vec<ParticipantRecord>, StoreError>;

    async fn record_reconciliation_failure(
        &self,
        failure: ReconciliationFailureInsert,
    ) -> Result<(), StoreError>;
}

#[async_trait]
pub trait TicketingTx: Send {
    /// Read the event and lock it until commit or rollback.
    async fn lock_event(&mut self, event_id: Uuid) -> Result<Option<EventRecord>, StoreError>;

    async fn set_event_status(
        &mut self,
        event_id: Uuid,
        status: EventStatus,
    ) -> Result<(), StoreError>;

    async fn find_participant(
        &mut self,
        user_id: Uuid,
        event_id: Uuid,
    ) -> Result<Option<ParticipantRecord>, StoreError>;

    async fn count_participants(&mut self, event_id: Uuid) -> Result<i64, StoreError>;

    async fn insert_participant(
        &mut self,
        insert: ParticipantInsert,
    ) -> Result<ParticipantRecord, StoreError>;

    /// Delete an UNPAID registration. Returns zero when it is missing or paid.
    async fn delete_participant(&mut self, participant_id: Uuid) -> Result<u64, StoreError>;

    /// Rows updated; zero when no registration exists for the pair.
    async fn mark_participant_paid(
        &mut self,
        user_id: Uuid,
        event_id: Uuid,
    ) -> Result<u64, StoreError>;

    async fn insert_payment(&mut self, insert: PaymentInsert) -> Result<PaymentRecord, StoreError>;

    /// Read the payment and lock it until commit or rollback.
    async fn lock_payment(&mut self, payment_id: Uuid)
    -> Result<Option<PaymentRecord>, StoreError>;

    async fn find_payment_by_transaction(
        &mut self,
        transaction_id: &str,
    ) -> Result<Option<PaymentRecord>, StoreError>;

    /// Rows updated; zero when the payment is missing or already paid.
    async fn mark_payment_paid(
        &mut self,
        payment_id: Uuid,
        transaction_id: &str,
        gateway_payload: &serde_json::Value,
    ) -> Result<u64, StoreError>;

    async fn delete_unpaid_payments(
        &mut self,
        user_id: Uuid,
        event_id: Uuid,
    ) -> Result<u64, StoreError>;

    async fn commit(self) -> Result<(), StoreError>;
}
