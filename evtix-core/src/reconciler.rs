//! Payment reconciler.
//!
//! Applies the provider's asynchronous payment callbacks. A callback either
//! moves both the payment and its registration to PAID in one transaction or
//! changes nothing. Redelivery of an applied callback is a successful no-op.

use crate::entities::PaymentStatus;
use crate::entities::reconciliation_failures::ReconciliationFailureInsert;
use crate::store::{StoreError, TicketingStore, TicketingTx};
use evtix_sdk::objects::{ErrorKind, GatewayPaymentStatus, PaymentCallback};
use evtix_sdk::signature::{SignatureError, SignedObject};
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Payment and registration moved to PAID.
    Confirmed,
    /// The payment was already PAID; nothing changed.
    AlreadyPaid,
    /// The callback reported a non-paid status; nothing changed.
    Ignored,
}

/// A callback that cannot be reconciled with stored state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Inconsistency {
    #[error("payment does not exist")]
    PaymentMissing,
    #[error("callback correlation (event {event_id}, user {user_id}) does not match the payment")]
    CorrelationMismatch { event_id: Uuid, user_id: Uuid },
    #[error("callback amount {received} does not match payment amount {expected}")]
    AmountMismatch { expected: Decimal, received: Decimal },
    #[error("transaction id is already bound to payment {other_payment_id}")]
    TransactionReused { other_payment_id: Uuid },
    #[error("no registration exists for the payment")]
    ParticipantMissing,
}

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("callback authentication failed: {0}")]
    Authentication(#[from] SignatureError),
    #[error("reconciliation inconsistency: {0}")]
    Consistency(Inconsistency),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl ReconcileError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ReconcileError::Authentication(_) => ErrorKind::AuthenticationFailure,
            ReconcileError::Consistency(_) => ErrorKind::ConsistencyFailure,
            ReconcileError::Store(_) => ErrorKind::Internal,
        }
    }
}

impl From<Inconsistency> for ReconcileError {
    fn from(value: Inconsistency) -> Self {
        ReconcileError::Consistency(value)
    }
}

pub struct PaymentReconciler<S> {
    store: S,
}

impl<S: TicketingStore> PaymentReconciler<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Authenticate a raw callback, then reconcile it.
    ///
    /// Nothing is read or written before the signature checks out.
    pub async fn reconcile_signed(
        &self,
        signature_header: &str,
        body: String,
        secret: &[u8],
    ) -> Result<ReconcileOutcome, ReconcileError> {
        let payload: serde_json::Value =
            serde_json::from_str(&body).map_err(SignatureError::from)?;
        let callback =
            SignedObject::<PaymentCallback>::from_header_and_body(signature_header, body)?
                .verify(secret)?;
        self.reconcile(callback, payload).await
    }

    /// Apply an authenticated callback. `payload` is the raw body, stored on
    /// the payment when it is confirmed.
    ///
    /// Inconsistencies roll the transaction back, are logged at `error` and
    /// journalled for operators, and are then returned to the caller.
    #[tracing::instrument(
        skip_all,
        err,
        fields(
            payment_id = %callback.payment_id,
            transaction_id = %callback.transaction_id,
        )
    )]
    pub async fn reconcile(
        &self,
        callback: PaymentCallback,
        payload: serde_json::Value,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        if callback.payment_status != GatewayPaymentStatus::Paid {
            info!(
                payment_id = %callback.payment_id,
                status = ?callback.payment_status,
                "Ignoring non-paid payment callback"
            );
            return Ok(ReconcileOutcome::Ignored);
        }

        match self.apply(&callback, &payload).await {
            Err(ReconcileError::Consistency(reason)) => {
                error!(
                    payment_id = %callback.payment_id,
                    event_id = %callback.event_id,
                    user_id = %callback.user_id,
                    transaction_id = %callback.transaction_id,
                    %reason,
                    "Payment callback could not be reconciled"
                );
                let journal = ReconciliationFailureInsert {
                    payment_id: callback.payment_id,
                    event_id: callback.event_id,
                    user_id: callback.user_id,
                    transaction_id: callback.transaction_id.clone(),
                    reason: reason.to_string(),
                    payload,
                };
                if let Err(e) = self.store.record_reconciliation_failure(journal).await {
                    error!(payment_id = %callback.payment_id, error = %e, "Failed to journal reconciliation failure");
                }
                Err(ReconcileError::Consistency(reason))
            }
            other => other,
        }
    }

    /// The transactional part. Returning early drops the transaction, which
    /// rolls back anything already written.
    async fn apply(
        &self,
        callback: &PaymentCallback,
        payload: &serde_json::Value,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        let mut tx = self.store.begin().await?;

        let payment = tx
            .lock_payment(callback.payment_id)
            .await?
            .ok_or(Inconsistency::PaymentMissing)?;
        if payment.event_id != callback.event_id || payment.user_id != callback.user_id {
            return Err(Inconsistency::CorrelationMismatch {
                event_id: callback.event_id,
                user_id: callback.user_id,
            }
            .into());
        }

        if payment.status == PaymentStatus::Paid {
            if payment.transaction_id.as_deref() != Some(callback.transaction_id.as_str()) {
                warn!(
                    payment_id = %payment.payment_id,
                    stored_transaction_id = ?payment.transaction_id,
                    transaction_id = %callback.transaction_id,
                    "Paid callback with a different transaction for an already paid payment, possible double charge"
                );
            }
            return Ok(ReconcileOutcome::AlreadyPaid);
        }

        if let Some(received) = callback.amount {
            if received != payment.amount {
                return Err(Inconsistency::AmountMismatch {
                    expected: payment.amount,
                    received,
                }
                .into());
            }
        }
        if let Some(other) = tx
            .find_payment_by_transaction(&callback.transaction_id)
            .await?
        {
            if other.payment_id != payment.payment_id {
                return Err(Inconsistency::TransactionReused {
                    other_payment_id: other.payment_id,
                }
                .into());
            }
        }

        let updated = tx
            .mark_payment_paid(payment.payment_id, &callback.transaction_id, payload)
            .await
            .map_err(|e| match e {
                StoreError::UniqueViolation { .. } => {
                    ReconcileError::Consistency(Inconsistency::TransactionReused {
                        other_payment_id: Uuid::nil(),
                    })
                }
                other => ReconcileError::Store(other),
            })?;
        if updated == 0 {
            return Err(Inconsistency::PaymentMissing.into());
        }
        if tx
            .mark_participant_paid(payment.user_id, payment.event_id)
            .await?
            == 0
        {
            return Err(Inconsistency::ParticipantMissing.into());
        }
        tx.commit().await?;

        info!(
            payment_id = %payment.payment_id,
            event_id = %payment.event_id,
            user_id = %payment.user_id,
            transaction_id = %callback.transaction_id,
            amount = %payment.amount,
            "Payment confirmed"
        );
        Ok(ReconcileOutcome::Confirmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admission::AdmissionCoordinator;
    use crate::admission::tests::{event, user};
    use crate::checkout::testing::{Behavior, FakeGateway};
    use crate::entities::payments::PaymentRecord;
    use crate::entities::users::UserRole;
    use crate::store::MemoryStore;
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    const SECRET: &[u8] = b"gateway-webhook-secret";

    struct Fixture {
        store: MemoryStore,
        reconciler: PaymentReconciler<MemoryStore>,
        coordinator: AdmissionCoordinator<MemoryStore>,
        event_id: Uuid,
    }

    async fn fixture() -> Fixture {
        let store = MemoryStore::new();
        let host = user(UserRole::Host);
        let event = event(host.user_id, Some(10));
        store.insert_user(host).await;
        store.insert_event(event.clone()).await;
        Fixture {
            reconciler: PaymentReconciler::new(store.clone()),
            coordinator: AdmissionCoordinator::new(
                store.clone(),
                Arc::new(FakeGateway::new(Behavior::Succeed)),
            ),
            store,
            event_id: event.event_id,
        }
    }

    impl Fixture {
        async fn registration(&self) -> PaymentRecord {
            let u = user(UserRole::User);
            self.store.insert_user(u.clone()).await;
            self.coordinator
                .join_event(self.event_id, u.user_id, None)
                .await
                .unwrap()
                .payment
        }
    }

    fn paid(payment: &PaymentRecord, transaction_id: &str) -> PaymentCallback {
        PaymentCallback {
            payment_id: payment.payment_id,
            event_id: payment.event_id,
            user_id: payment.user_id,
            transaction_id: transaction_id.to_owned(),
            payment_status: GatewayPaymentStatus::Paid,
            amount: Some(payment.amount),
        }
    }

    fn raw(callback: &PaymentCallback) -> serde_json::Value {
        serde_json::to_value(callback).unwrap()
    }

    #[tokio::test]
    async fn paid_callback_confirms_payment_and_registration() {
        let f = fixture().await;
        let payment = f.registration().await;
        let cb = paid(&payment, "T1");

        let outcome = f.reconciler.reconcile(cb.clone(), raw(&cb)).await.unwrap();
        assert_eq!(outcome, ReconcileOutcome::Confirmed);

        let stored = f.store.payment(payment.payment_id).await.unwrap();
        assert_eq!(stored.status, PaymentStatus::Paid);
        assert_eq!(stored.transaction_id.as_deref(), Some("T1"));
        assert_eq!(stored.gateway_payload, Some(raw(&cb)));
        assert!(stored.paid_at.is_some());
        let participant = &f.store.participants_of(f.event_id).await[0];
        assert_eq!(participant.payment_status, PaymentStatus::Paid);
    }

    #[tokio::test]
    async fn redelivery_is_a_no_op() {
        let f = fixture().await;
        let payment = f.registration().await;
        let cb = paid(&payment, "T1");

        f.reconciler.reconcile(cb.clone(), raw(&cb)).await.unwrap();
        let first = f.store.payment(payment.payment_id).await.unwrap();
        let outcome = f.reconciler.reconcile(cb.clone(), raw(&cb)).await.unwrap();
        assert_eq!(outcome, ReconcileOutcome::AlreadyPaid);
        assert_eq!(f.store.payment(payment.payment_id).await.unwrap(), first);
    }

    #[tokio::test]
    async fn concurrent_redelivery_confirms_once() {
        let f = fixture().await;
        let payment = f.registration().await;
        let cb = paid(&payment, "T1");
        let reconciler = Arc::new(f.reconciler);

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let r = reconciler.clone();
                let cb = cb.clone();
                tokio::spawn(async move {
                    let payload = raw(&cb);
                    r.reconcile(cb, payload).await
                })
            })
            .collect();
        let mut confirmed = 0;
        for h in handles {
            match h.await.unwrap().unwrap() {
                ReconcileOutcome::Confirmed => confirmed += 1,
                ReconcileOutcome::AlreadyPaid => {}
                ReconcileOutcome::Ignored => panic!("paid callback ignored"),
            }
        }
        assert_eq!(confirmed, 1);
    }

    #[tokio::test]
    async fn unknown_payment_is_a_consistency_failure() {
        let f = fixture().await;
        let payment = f.registration().await;
        let mut cb = paid(&payment, "T1");
        cb.payment_id = Uuid::now_v7();

        let err = f.reconciler.reconcile(cb.clone(), raw(&cb)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConsistencyFailure);
        assert!(matches!(
            err,
            ReconcileError::Consistency(Inconsistency::PaymentMissing)
        ));
        assert_eq!(
            f.store.payment(payment.payment_id).await.unwrap().status,
            PaymentStatus::Unpaid
        );

        let journal = f.store.reconciliation_failures().await;
        assert_eq!(journal.len(), 1);
        assert_eq!(journal[0].payment_id, cb.payment_id);
        assert_eq!(journal[0].transaction_id, "T1");
        assert_eq!(journal[0].payload, raw(&cb));
    }

    #[tokio::test]
    async fn missing_registration_rolls_back_the_payment() {
        let f = fixture().await;
        let payment = f.registration().await;
        let participant = f.store.participants_of(f.event_id).await[0].clone();
        f.store.remove_participant(participant.participant_id).await;

        let cb = paid(&payment, "T1");
        let err = f.reconciler.reconcile(cb.clone(), raw(&cb)).await.unwrap_err();
        assert!(matches!(
            err,
            ReconcileError::Consistency(Inconsistency::ParticipantMissing)
        ));
        let stored = f.store.payment(payment.payment_id).await.unwrap();
        assert_eq!(stored.status, PaymentStatus::Unpaid);
        assert!(stored.transaction_id.is_none());
        assert_eq!(f.store.reconciliation_failures().await.len(), 1);
    }

    #[tokio::test]
    async fn mismatched_correlation_or_amount_is_rejected() {
        let f = fixture().await;
        let payment = f.registration().await;

        let mut cb = paid(&payment, "T1");
        cb.user_id = Uuid::now_v7();
        let err = f.reconciler.reconcile(cb.clone(), raw(&cb)).await.unwrap_err();
        assert!(matches!(
            err,
            ReconcileError::Consistency(Inconsistency::CorrelationMismatch { .. })
        ));

        let mut cb = paid(&payment, "T1");
        cb.amount = Some(dec!(1));
        let err = f.reconciler.reconcile(cb.clone(), raw(&cb)).await.unwrap_err();
        assert!(matches!(
            err,
            ReconcileError::Consistency(Inconsistency::AmountMismatch { .. })
        ));

        assert_eq!(
            f.store.payment(payment.payment_id).await.unwrap().status,
            PaymentStatus::Unpaid
        );
        assert_eq!(f.store.reconciliation_failures().await.len(), 2);
    }

    #[tokio::test]
    async fn transaction_id_cannot_pay_twice() {
        let f = fixture().await;
        let first = f.registration().await;
        let second = f.registration().await;

        let cb = paid(&first, "T1");
        f.reconciler.reconcile(cb.clone(), raw(&cb)).await.unwrap();

        let cb = paid(&second, "T1");
        let err = f.reconciler.reconcile(cb.clone(), raw(&cb)).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            format!(
                "reconciliation inconsistency: transaction id is already bound to payment {}",
                first.payment_id
            )
        );
        assert_eq!(
            f.store.payment(second.payment_id).await.unwrap().status,
            PaymentStatus::Unpaid
        );
    }

    #[tokio::test]
    async fn non_paid_status_changes_nothing() {
        let f = fixture().await;
        let payment = f.registration().await;
        for status in [
            GatewayPaymentStatus::Unpaid,
            GatewayPaymentStatus::Failed,
            GatewayPaymentStatus::Cancelled,
        ] {
            let mut cb = paid(&payment, "T1");
            cb.payment_status = status;
            let outcome = f.reconciler.reconcile(cb.clone(), raw(&cb)).await.unwrap();
            assert_eq!(outcome, ReconcileOutcome::Ignored);
        }
        assert_eq!(
            f.store.payment(payment.payment_id).await.unwrap().status,
            PaymentStatus::Unpaid
        );
        assert!(f.store.reconciliation_failures().await.is_empty());
    }

    #[tokio::test]
    async fn signed_callback_is_verified_before_use() {
        let f = fixture().await;
        let payment = f.registration().await;
        let signed = SignedObject::new(paid(&payment, "T1"), SECRET).unwrap();

        let err = f
            .reconciler
            .reconcile_signed(&signed.to_header(), signed.json.clone(), b"wrong-secret")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AuthenticationFailure);
        assert_eq!(
            f.store.payment(payment.payment_id).await.unwrap().status,
            PaymentStatus::Unpaid
        );

        let outcome = f
            .reconciler
            .reconcile_signed(&signed.to_header(), signed.json.clone(), SECRET)
            .await
            .unwrap();
        assert_eq!(outcome, ReconcileOutcome::Confirmed);
    }

    #[tokio::test]
    async fn malformed_body_is_an_authentication_failure() {
        let f = fixture().await;
        let err = f
            .reconciler
            .reconcile_signed("1700000000.AAAA", "{not json".to_owned(), SECRET)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AuthenticationFailure);
    }
}
