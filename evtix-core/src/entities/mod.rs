pub mod event_records;
pub mod participants;
pub mod payments;
pub mod reconciliation_failures;
pub mod users;

use evtix_sdk::objects::PaymentStatus as SdkPaymentStatus;

/// Payment status shared by participants and payments.
///
/// This is the sqlx::Type version. For API/DTO use, see
/// `evtix_sdk::objects::PaymentStatus`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(rename_all = "lowercase", type_name = "payment_status")]
pub enum PaymentStatus {
    Unpaid,
    Paid,
}

impl From<PaymentStatus> for SdkPaymentStatus {
    fn from(value: PaymentStatus) -> Self {
        match value {
            PaymentStatus::Unpaid => SdkPaymentStatus::Unpaid,
            PaymentStatus::Paid => SdkPaymentStatus::Paid,
        }
    }
}

impl From<SdkPaymentStatus> for PaymentStatus {
    fn from(value: SdkPaymentStatus) -> Self {
        match value {
            SdkPaymentStatus::Unpaid => PaymentStatus::Unpaid,
            SdkPaymentStatus::Paid => PaymentStatus::Paid,
        }
    }
}
