use crate::entities::PaymentStatus;
use crate::framework::DatabaseProcessor;
use compact_str::CompactString;
use evtix_sdk::objects::PaymentResponse;
use kanau::processor::Processor;
use rust_decimal::Decimal;
use uuid::Uuid;

/// A payment attempt for one registration.
///
/// The coupon code and discount are a snapshot taken when the payment was
/// created; they are never recomputed.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct PaymentRecord {
    pub payment_id: Uuid,
    pub user_id: Uuid,
    pub event_id: Uuid,
    pub amount: Decimal,
    pub coupon_code: Option<CompactString>,
    pub discount_amount: Decimal,
    pub status: PaymentStatus,
    pub transaction_id: Option<String>,
    pub gateway_payload: Option<serde_json::Value>,
    pub created_at: time::OffsetDateTime,
    pub paid_at: Option<time::OffsetDateTime>,
}

impl PaymentRecord {
    pub fn to_response(&self) -> PaymentResponse {
        PaymentResponse {
            payment_id: self.payment_id,
            event_id: self.event_id,
            user_id: self.user_id,
            amount: self.amount,
            status: self.status.into(),
            transaction_id: self.transaction_id.clone(),
            created_at: self.created_at.unix_timestamp(),
            paid_at: self.paid_at.map(|t| t.unix_timestamp()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentInsert {
    pub user_id: Uuid,
    pub event_id: Uuid,
    pub amount: Decimal,
    pub coupon_code: Option<CompactString>,
    pub discount_amount: Decimal,
}

const PAYMENT_COLUMNS: &str = r#"
    payment_id,
    user_id,
    event_id,
    amount,
    coupon_code,
    discount_amount,
    status,
    transaction_id,
    gateway_payload,
    created_at,
    paid_at
"#;

#[derive(Debug, Clone)]
pub struct GetPaymentById {
    pub payment_id: Uuid,
}

impl Processor<GetPaymentById> for DatabaseProcessor {
    type Output = Option<PaymentRecord>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetPaymentById")]
    async fn process(&self, query: GetPaymentById) -> Result<Option<PaymentRecord>, sqlx::Error> {
        sqlx::query_as::<_, PaymentRecord>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE payment_id = $1"
        ))
        .bind(query.payment_id)
        .fetch_optional(&self.pool)
        .await
    }
}

impl PaymentRecord {
    #[tracing::instrument(skip_all, err, name = "SQL:InsertPayment")]
    pub async fn insert_tx(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        insert: PaymentInsert,
    ) -> Result<PaymentRecord, sqlx::Error> {
        sqlx::query_as::<_, PaymentRecord>(&format!(
            "INSERT INTO payments (payment_id, user_id, event_id, amount, coupon_code, discount_amount) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {PAYMENT_COLUMNS}"
        ))
        .bind(Uuid::now_v7())
        .bind(insert.user_id)
        .bind(insert.event_id)
        .bind(insert.amount)
        .bind(insert.coupon_code)
        .bind(insert.discount_amount)
        .fetch_one(&mut **tx)
        .await
    }

    /// Read the payment and hold its row lock until the transaction ends, so
    /// concurrent deliveries of the same callback are applied one at a time.
    #[tracing::instrument(skip_all, err, name = "SQL:LockPaymentForUpdate")]
    pub async fn lock_for_update_tx(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        payment_id: Uuid,
    ) -> Result<Option<PaymentRecord>, sqlx::Error> {
        sqlx::query_as::<_, PaymentRecord>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE payment_id = $1 FOR UPDATE"
        ))
        .bind(payment_id)
        .fetch_optional(&mut **tx)
        .await
    }

    #[tracing::instrument(skip_all, err, name = "SQL:FindPaymentByTransaction")]
    pub async fn find_by_transaction_tx(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        transaction_id: &str,
    ) -> Result<Option<PaymentRecord>, sqlx::Error> {
        sqlx::query_as::<_, PaymentRecord>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE transaction_id = $1"
        ))
        .bind(transaction_id)
        .fetch_optional(&mut **tx)
        .await
    }

    /// Only an unpaid payment moves; returns the number of rows updated.
    #[tracing::instrument(skip_all, err, name = "SQL:MarkPaymentPaid")]
    pub async fn mark_paid_tx(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        payment_id: Uuid,
        transaction_id: &str,
        gateway_payload: &serde_json::Value,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE payments
            SET status = 'paid',
                transaction_id = $2,
                gateway_payload = $3,
                paid_at = NOW()
            WHERE payment_id = $1 AND status = 'unpaid'
            "#,
        )
        .bind(payment_id)
        .bind(transaction_id)
        .bind(gateway_payload)
        .execute(&mut **tx)
        .await?;
        Ok(result.rows_affected())
    }

    /// Remove the unpaid payment rows of a registration that is being released.
    #[tracing::instrument(skip_all, err, name = "SQL:DeleteUnpaidPayments")]
    pub async fn delete_unpaid_for_registration_tx(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        user_id: Uuid,
        event_id: Uuid,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            DELETE FROM payments
            WHERE user_id = $1 AND event_id = $2 AND status = 'unpaid'
            "#,
        )
        .bind(user_id)
        .bind(event_id)
        .execute(&mut **tx)
        .await?;
        Ok(result.rows_affected())
    }
}
