use crate::framework::DatabaseProcessor;
use compact_str::CompactString;
use evtix_sdk::objects::{EventResponse, EventStatus as SdkEventStatus};
use kanau::processor::Processor;
use rust_decimal::Decimal;
use uuid::Uuid;

/// Event lifecycle status.
///
/// This is the sqlx::Type version. For API/DTO use, see
/// `evtix_sdk::objects::EventStatus`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(rename_all = "lowercase", type_name = "event_status")]
pub enum EventStatus {
    Open,
    Full,
    Cancelled,
    Completed,
}

impl EventStatus {
    /// Transition table for event status.
    ///
    /// `Completed` is terminal. `Open -> Full` and `Full -> Open` are applied
    /// by admission as seats fill and free up; hosts never request FULL.
    /// `Cancelled -> Open` is the host reopening the event.
    pub fn can_transition_to(self, next: EventStatus) -> bool {
        use EventStatus::*;
        matches!(
            (self, next),
            (Open, Full)
                | (Open, Cancelled)
                | (Open, Completed)
                | (Full, Open)
                | (Full, Cancelled)
                | (Full, Completed)
                | (Cancelled, Open)
        )
    }

    pub fn is_terminal(self) -> bool {
        self == EventStatus::Completed
    }
}

impl std::fmt::Display for EventStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        SdkEventStatus::from(*self).fmt(f)
    }
}

impl From<EventStatus> for SdkEventStatus {
    fn from(value: EventStatus) -> Self {
        match value {
            EventStatus::Open => SdkEventStatus::Open,
            EventStatus::Full => SdkEventStatus::Full,
            EventStatus::Cancelled => SdkEventStatus::Cancelled,
            EventStatus::Completed => SdkEventStatus::Completed,
        }
    }
}

impl From<SdkEventStatus> for EventStatus {
    fn from(value: SdkEventStatus) -> Self {
        match value {
            SdkEventStatus::Open => EventStatus::Open,
            SdkEventStatus::Full => EventStatus::Full,
            SdkEventStatus::Cancelled => EventStatus::Cancelled,
            SdkEventStatus::Completed => EventStatus::Completed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct EventRecord {
    pub event_id: Uuid,
    pub host_id: Uuid,
    pub name: String,
    pub min_participants: Option<i32>,
    /// `None` means the event is uncapped.
    pub max_participants: Option<i32>,
    pub ticket_price: Decimal,
    pub status: EventStatus,
    pub coupon_code: Option<CompactString>,
    /// Percentage, e.g. `20` for 20% off.
    pub coupon_discount: Option<Decimal>,
    pub coupon_active: bool,
    pub starts_at: time::OffsetDateTime,
    pub ends_at: time::OffsetDateTime,
    pub created_at: time::OffsetDateTime,
}

impl EventRecord {
    /// Whether `participant_count` registrations fill the event.
    pub fn is_filled_by(&self, participant_count: i64) -> bool {
        self.max_participants
            .is_some_and(|max| participant_count >= i64::from(max))
    }

    pub fn to_response(&self) -> EventResponse {
        EventResponse {
            event_id: self.event_id,
            host_id: self.host_id,
            name: self.name.clone(),
            status: self.status.into(),
            min_participants: self.min_participants,
            max_participants: self.max_participants,
            ticket_price: self.ticket_price,
            starts_at: self.starts_at.unix_timestamp(),
            ends_at: self.ends_at.unix_timestamp(),
        }
    }
}

const EVENT_COLUMNS: &str = r#"
    event_id,
    host_id,
    name,
    min_participants,
    max_participants,
    ticket_price,
    status,
    coupon_code,
    coupon_discount,
    coupon_active,
    starts_at,
    ends_at,
    created_at
"#;

#[derive(Debug, Clone)]
pub struct GetEventById {
    pub event_id: Uuid,
}

impl Processor<GetEventById> for DatabaseProcessor {
    type Output = Option<EventRecord>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetEventById")]
    async fn process(&self, query: GetEventById) -> Result<Option<EventRecord>, sqlx::Error> {
        sqlx::query_as::<_, EventRecord>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE event_id = $1"
        ))
        .bind(query.event_id)
        .fetch_optional(&self.pool)
        .await
    }
}

impl EventRecord {
    /// Read the event and take a row lock on it for the rest of the transaction.
    ///
    /// Every capacity check-then-insert for an event goes through this lock,
    /// which serializes joins per event while leaving other events untouched.
    #[tracing::instrument(skip_all, err, name = "SQL:LockEventForUpdate")]
    pub async fn lock_for_update_tx(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        event_id: Uuid,
    ) -> Result<Option<EventRecord>, sqlx::Error> {
        sqlx::query_as::<_, EventRecord>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE event_id = $1 FOR UPDATE"
        ))
        .bind(event_id)
        .fetch_optional(&mut **tx)
        .await
    }

    #[tracing::instrument(skip_all, err, name = "SQL:UpdateEventStatus")]
    pub async fn update_status_tx(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        event_id: Uuid,
        status: EventStatus,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE events
            SET status = $2
            WHERE event_id = $1
            "#,
        )
        .bind(event_id)
        .bind(status)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use EventStatus::*;

    #[test]
    fn completed_is_terminal() {
        for next in [Open, Full, Cancelled, Completed] {
            assert!(!Completed.can_transition_to(next));
        }
        assert!(Completed.is_terminal());
    }

    #[test]
    fn cancelled_only_reopens() {
        assert!(Cancelled.can_transition_to(Open));
        assert!(!Cancelled.can_transition_to(Full));
        assert!(!Cancelled.can_transition_to(Completed));
    }

    #[test]
    fn self_transitions_are_rejected() {
        for status in [Open, Full, Cancelled, Completed] {
            assert!(!status.can_transition_to(status));
        }
    }

    #[test]
    fn capacity_fill_and_release() {
        assert!(Open.can_transition_to(Full));
        assert!(Full.can_transition_to(Open));
    }
}
