use crate::framework::DatabaseProcessor;
use evtix_sdk::objects::admin::ReconciliationFailureResponse;
use kanau::processor::Processor;
use uuid::Uuid;

/// Journal of payment callbacks that could not be applied.
///
/// Rows are written after the reconciliation transaction has rolled back and
/// are only read by operators.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct ReconciliationFailureRecord {
    pub id: i64,
    pub payment_id: Uuid,
    pub event_id: Uuid,
    pub user_id: Uuid,
    pub transaction_id: String,
    pub reason: String,
    pub payload: serde_json::Value,
    pub created_at: time::OffsetDateTime,
}

impl ReconciliationFailureRecord {
    pub fn to_response(&self) -> ReconciliationFailureResponse {
        ReconciliationFailureResponse {
            id: self.id,
            payment_id: self.payment_id,
            event_id: self.event_id,
            user_id: self.user_id,
            transaction_id: self.transaction_id.clone(),
            reason: self.reason.clone(),
            payload: self.payload.clone(),
            created_at: self.created_at.unix_timestamp(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciliationFailureInsert {
    pub payment_id: Uuid,
    pub event_id: Uuid,
    pub user_id: Uuid,
    pub transaction_id: String,
    pub reason: String,
    pub payload: serde_json::Value,
}

impl Processor<ReconciliationFailureInsert> for DatabaseProcessor {
    type Output = ();
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:InsertReconciliationFailure")]
    async fn process(&self, insert: ReconciliationFailureInsert) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO reconciliation_failures
                (payment_id, event_id, user_id, transaction_id, reason, payload)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(insert.payment_id)
        .bind(insert.event_id)
        .bind(insert.user_id)
        .bind(insert.transaction_id)
        .bind(insert.reason)
        .bind(insert.payload)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ListReconciliationFailures {
    pub limit: i64,
    pub offset: i64,
}

impl Processor<ListReconciliationFailures> for DatabaseProcessor {
    type Output = Vec<ReconciliationFailureRecord>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:ListReconciliationFailures")]
    async fn process(
        &self,
        query: ListReconciliationFailures,
    ) -> Result<Vec<ReconciliationFailureRecord>, sqlx::Error> {
        sqlx::query_as::<_, ReconciliationFailureRecord>(
            r#"
            SELECT id, payment_id, event_id, user_id, transaction_id, reason, payload, created_at
            FROM reconciliation_failures
            ORDER BY created_at DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(query.limit)
        .bind(query.offset)
        .fetch_all(&self.pool)
        .await
    }
}
