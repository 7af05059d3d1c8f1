use crate::entities::PaymentStatus;
use crate::framework::DatabaseProcessor;
use evtix_sdk::objects::admin::AdminParticipantResponse;
use kanau::processor::Processor;
use uuid::Uuid;

/// One registration of a user for an event. Unique per (user, event).
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct ParticipantRecord {
    pub participant_id: Uuid,
    pub user_id: Uuid,
    pub event_id: Uuid,
    pub payment_status: PaymentStatus,
    pub coupon_applied: bool,
    pub created_at: time::OffsetDateTime,
}

impl ParticipantRecord {
    pub fn to_admin_response(&self) -> AdminParticipantResponse {
        AdminParticipantResponse {
            participant_id: self.participant_id,
            user_id: self.user_id,
            event_id: self.event_id,
            payment_status: self.payment_status.into(),
            coupon_applied: self.coupon_applied,
            created_at: self.created_at.unix_timestamp(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantInsert {
    pub user_id: Uuid,
    pub event_id: Uuid,
    pub coupon_applied: bool,
}

const PARTICIPANT_COLUMNS: &str =
    "participant_id, user_id, event_id, payment_status, coupon_applied, created_at";

#[derive(Debug, Clone)]
pub struct GetParticipant {
    pub user_id: Uuid,
    pub event_id: Uuid,
}

impl Processor<GetParticipant> for DatabaseProcessor {
    type Output = Option<ParticipantRecord>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetParticipant")]
    async fn process(&self, query: GetParticipant) -> Result<Option<ParticipantRecord>, sqlx::Error> {
        sqlx::query_as::<_, ParticipantRecord>(&format!(
            "SELECT {PARTICIPANT_COLUMNS} FROM participants WHERE user_id = $1 AND event_id = $2"
        ))
        .bind(query.user_id)
        .bind(query.event_id)
        .fetch_optional(&self.pool)
        .await
    }
}

#[derive(Debug, Clone)]
pub struct ListEventParticipants {
    pub event_id: Uuid,
    pub limit: i64,
    pub offset: i64,
}

impl Processor<ListEventParticipants> for DatabaseProcessor {
    type Output = Vec<ParticipantRecord>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:ListEventParticipants")]
    async fn process(
        &self,
        query: ListEventParticipants,
    ) -> Result<Vec<ParticipantRecord>, sqlx::Error> {
        sqlx::query_as::<_, ParticipantRecord>(&format!(
            "SELECT {PARTICIPANT_COLUMNS} FROM participants \
             WHERE event_id = $1 \
             ORDER BY created_at ASC \
             LIMIT $2 OFFSET $3"
        ))
        .bind(query.event_id)
        .bind(query.limit)
        .bind(query.offset)
        .fetch_all(&self.pool)
        .await
    }
}

#[derive(Debug, Clone)]
/// Unpaid registrations created before `created_before`, oldest first.
pub struct ListStaleUnpaidParticipants {
    pub created_before: time::OffsetDateTime,
    pub limit: i64,
}

impl Processor<ListStaleUnpaidParticipants> for DatabaseProcessor {
    type Output = Vec<ParticipantRecord>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:ListStaleUnpaidParticipants")]
    async fn process(
        &self,
        query: ListStaleUnpaidParticipants,
    ) -> Result<Vec<ParticipantRecord>, sqlx::Error> {
        sqlx::query_as::<_, ParticipantRecord>(&format!(
            "SELECT {PARTICIPANT_COLUMNS} FROM participants \
             WHERE payment_status = 'unpaid' AND created_at < $1 \
             ORDER BY created_at ASC \
             LIMIT $2"
        ))
        .bind(query.created_before)
        .bind(query.limit)
        .fetch_all(&self.pool)
        .await
    }
}

impl ParticipantRecord {
    #[tracing::instrument(skip_all, err, name = "SQL:FindParticipantTx")]
    pub async fn find_tx(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        user_id: Uuid,
        event_id: Uuid,
    ) -> Result<Option<ParticipantRecord>, sqlx::Error> {
        sqlx::query_as::<_, ParticipantRecord>(&format!(
            "SELECT {PARTICIPANT_COLUMNS} FROM participants WHERE user_id = $1 AND event_id = $2"
        ))
        .bind(user_id)
        .bind(event_id)
        .fetch_optional(&mut **tx)
        .await
    }

    #[tracing::instrument(skip_all, err, name = "SQL:CountEventParticipants")]
    pub async fn count_for_event_tx(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        event_id: Uuid,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM participants WHERE event_id = $1")
            .bind(event_id)
            .fetch_one(&mut **tx)
            .await
    }

    #[tracing::instrument(skip_all, err, name = "SQL:InsertParticipant")]
    pub async fn insert_tx(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        insert: ParticipantInsert,
    ) -> Result<ParticipantRecord, sqlx::Error> {
        sqlx::query_as::<_, ParticipantRecord>(&format!(
            "INSERT INTO participants (participant_id, user_id, event_id, coupon_applied) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {PARTICIPANT_COLUMNS}"
        ))
        .bind(Uuid::now_v7())
        .bind(insert.user_id)
        .bind(insert.event_id)
        .bind(insert.coupon_applied)
        .fetch_one(&mut **tx)
        .await
    }

    /// Paid registrations are never deleted. A concurrent reconciliation that
    /// commits first makes this delete match nothing.
    #[tracing::instrument(skip_all, err, name = "SQL:DeleteUnpaidParticipant")]
    pub async fn delete_unpaid_tx(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        participant_id: Uuid,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM participants WHERE participant_id = $1 AND payment_status = 'unpaid'",
        )
        .bind(participant_id)
        .execute(&mut **tx)
        .await?;
        Ok(result.rows_affected())
    }

    /// Returns the number of rows updated; zero means no such registration.
    #[tracing::instrument(skip_all, err, name = "SQL:MarkParticipantPaid")]
    pub async fn mark_paid_tx(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        user_id: Uuid,
        event_id: Uuid,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE participants
            SET payment_status = 'paid'
            WHERE user_id = $1 AND event_id = $2
            "#,
        )
        .bind(user_id)
        .bind(event_id)
        .execute(&mut **tx)
        .await?;
        Ok(result.rows_affected())
    }
}
