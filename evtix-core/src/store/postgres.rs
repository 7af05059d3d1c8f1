use super::{StoreError, TicketingStore, TicketingTx};
use crate::entities::event_records::{EventRecord, EventStatus, GetEventById};
use crate::entities::participants::{
    GetParticipant, ListStaleUnpaidParticipants, ParticipantInsert, ParticipantRecord,
};
use crate::entities::payments::{PaymentInsert, PaymentRecord};
use crate::entities::reconciliation_failures::ReconciliationFailureInsert;
use crate::entities::users::{GetUserById, UserRecord};
use crate::framework::DatabaseProcessor;
use async_trait::async_trait;
use kanau::processor::Processor;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct PgStore {
    processor: DatabaseProcessor,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            processor: DatabaseProcessor { pool },
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.processor.pool
    }
}

/// A PostgreSQL transaction (READ COMMITTED plus explicit row locks).
pub struct PgTx {
    tx: sqlx::Transaction<'static, sqlx::Postgres>,
}

#[async_trait]
impl TicketingStore for PgStore {
    type Tx = PgTx;

    async fn begin(&self) -> Result<PgTx, StoreError> {
        let tx = self.processor.pool.begin().await?;
        Ok(PgTx { tx })
    }

    async fn find_user(&self, user_id: Uuid) -> Result<Option<UserRecord>, StoreError> {
        Ok(self.processor.process(GetUserById { user_id }).await?)
    }

    async fn find_event(&self, event_id: Uuid) -> Result<Option<EventRecord>, StoreError> {
        Ok(self.processor.process(GetEventById { event_id }).await?)
    }

    async fn find_participant(
        &self,
        user_id: Uuid,
        event_id: Uuid,
    ) -> Result<Option<ParticipantRecord>, StoreError> {
        Ok(self
            .processor
            .process(GetParticipant { user_id, event_id })
            .await?)
    }

    async fn find_stale_unpaid(
        &self,
        created_before: time::OffsetDateTime,
        limit: i64,
    ) -> Result<Vec<ParticipantRecord>, StoreError> {
        Ok(self
            .processor
            .process(ListStaleUnpaidParticipants {
                created_before,
                limit,
            })
            .await?)
    }

    async fn record_reconciliation_failure(
        &self,
        failure: ReconciliationFailureInsert,
    ) -> Result<(), StoreError> {
        Ok(self.processor.process(failure).await?)
    }
}

#[async_trait]
impl TicketingTx for PgTx {
    async fn lock_event(&mut self, event_id: Uuid) -> Result<Option<EventRecord>, StoreError> {
        Ok(EventRecord::lock_for_update_tx(&mut self.tx, event_id).await?)
    }

    async fn set_event_status(
        &mut self,
        event_id: Uuid,
        status: EventStatus,
    ) -> Result<(), StoreError> {
        Ok(EventRecord::update_status_tx(&mut self.tx, event_id, status).await?)
    }

    async fn find_participant(
        &mut self,
        user_id: Uuid,
        event_id: Uuid,
    ) -> Result<Option<ParticipantRecord>, StoreError> {
        Ok(ParticipantRecord::find_tx(&mut self.tx, user_id, event_id).await?)
    }

    async fn count_participants(&mut self, event_id: Uuid) -> Result<i64, StoreError> {
        Ok(ParticipantRecord::count_for_event_tx(&mut self.tx, event_id).await?)
    }

    async fn insert_participant(
        &mut self,
        insert: ParticipantInsert,
    ) -> Result<ParticipantRecord, StoreError> {
        Ok(ParticipantRecord::insert_tx(&mut self.tx, insert).await?)
    }

    async fn delete_participant(&mut self, participant_id: Uuid) -> Result<u64, StoreError> {
        Ok(ParticipantRecord::delete_unpaid_tx(&mut self.tx, participant_id).await?)
    }

    async fn mark_participant_paid(
        &mut self,
        user_id: Uuid,
        event_id: Uuid,
    ) -> Result<u64, StoreError> {
        Ok(ParticipantRecord::mark_paid_tx(&mut self.tx, user_id, event_id).await?)
    }

    async fn insert_payment(&mut self, insert: PaymentInsert) -> Result<PaymentRecord, StoreError> {
        Ok(PaymentRecord::insert_tx(&mut self.tx, insert).await?)
    }

    async fn lock_payment(
        &mut self,
        payment_id: Uuid,
    ) -> Result<Option<PaymentRecord>, StoreError> {
        Ok(PaymentRecord::lock_for_update_tx(&mut self.tx, payment_id).await?)
    }

    async fn find_payment_by_transaction(
        &mut self,
        transaction_id: &str,
    ) -> Result<Option<PaymentRecord>, StoreError> {
        Ok(PaymentRecord::find_by_transaction_tx(&mut self.tx, transaction_id).await?)
    }

    async fn mark_payment_paid(
        &mut self,
        payment_id: Uuid,
        transaction_id: &str,
        gateway_payload: &serde_json::Value,
    ) -> Result<u64, StoreError> {
        Ok(
            PaymentRecord::mark_paid_tx(&mut self.tx, payment_id, transaction_id, gateway_payload)
                .await?,
        )
    }

    async fn delete_unpaid_payments(
        &mut self,
        user_id: Uuid,
        event_id: Uuid,
    ) -> Result<u64, StoreError> {
        Ok(PaymentRecord::delete_unpaid_for_registration_tx(&mut self.tx, user_id, event_id).await?)
    }

    async fn commit(self) -> Result<(), StoreError> {
        Ok(self.tx.commit().await?)
    }
}
