mod inmemory;
mod postgres;

use chrono::{DateTime, Utc};
pub use inmemory::InMemoryBookingRepo;
pub use postgres::PostgresBookingRepo;
use slotbook_domain::{Booking, ID};
use thiserror::Error;

/// Writes to the booking ledger can be rejected by its uniqueness gates.
///
/// `SlotTaken` maps the partial unique index over `(host, start, end)` for
/// non-cancelled rows; `DuplicateIdempotencyKey` maps the unique index over
/// idempotency keys and means the caller lost a race against an identical
/// request, whose row should be returned instead.
#[derive(Debug, Error)]
pub enum BookingWriteError {
    #[error("Another non-cancelled booking already occupies this slot")]
    SlotTaken,
    #[error("A booking with this idempotency key already exists")]
    DuplicateIdempotencyKey,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[async_trait::async_trait]
pub trait IBookingRepo: Send + Sync {
    /// Insert a new booking. The uniqueness gate over `(host, start, end)`
    /// restricted to non-cancelled rows is enforced here and is the source
    /// of truth for at-most-one concurrent booking per slot.
    async fn insert(&self, booking: &Booking) -> Result<(), BookingWriteError>;

    /// Persist changes to an existing booking. Start/end mutations pass the
    /// same uniqueness gate as inserts.
    async fn save(&self, booking: &Booking) -> Result<(), BookingWriteError>;

    async fn find(&self, booking_id: &ID) -> anyhow::Result<Option<Booking>>;
    async fn find_by_uid(&self, uid: &str) -> anyhow::Result<Option<Booking>>;
    async fn find_by_idempotency_key(&self, key: &str) -> anyhow::Result<Option<Booking>>;

    /// PENDING or CONFIRMED bookings of the host overlapping `[start, end)`
    async fn find_blocking_in_timespan(
        &self,
        host_id: &ID,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> anyhow::Result<Vec<Booking>>;
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use slotbook_domain::{BookingStatus, Guest};

    use super::*;

    fn ts(minutes: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(minutes * 60 * 1000).unwrap()
    }

    fn booking(host_id: &ID, start_min: i64, end_min: i64) -> Booking {
        Booking {
            id: Default::default(),
            uid: slotbook_utils::create_booking_uid(),
            host_id: host_id.clone(),
            event_type_id: Default::default(),
            start_time: ts(start_min),
            end_time: ts(end_min),
            guest: Guest {
                name: "Ada".into(),
                email: "ada@example.com".into(),
                phone: None,
                company: None,
                notes: None,
            },
            guest_timezone: chrono_tz::UTC,
            status: BookingStatus::Confirmed,
            idempotency_key: None,
            custom_responses: serde_json::Value::Null,
            external_event_ref: None,
            external_event_created: false,
            meeting_url: None,
            rescheduled_from_uid: None,
            cancelled_at: None,
            created: ts(0),
            updated: ts(0),
        }
    }

    #[tokio::test]
    async fn rejects_a_second_booking_for_the_same_slot() {
        let repo = InMemoryBookingRepo::new();
        let host_id = ID::default();

        repo.insert(&booking(&host_id, 0, 30)).await.unwrap();
        let res = repo.insert(&booking(&host_id, 0, 30)).await;
        assert!(matches!(res, Err(BookingWriteError::SlotTaken)));

        // other host, same slot, is fine
        repo.insert(&booking(&ID::default(), 0, 30)).await.unwrap();
    }

    #[tokio::test]
    async fn cancelled_rows_free_the_slot() {
        let repo = InMemoryBookingRepo::new();
        let host_id = ID::default();

        let mut first = booking(&host_id, 0, 30);
        repo.insert(&first).await.unwrap();

        first.status = BookingStatus::Cancelled;
        first.cancelled_at = Some(ts(1));
        repo.save(&first).await.unwrap();

        repo.insert(&booking(&host_id, 0, 30)).await.unwrap();
    }

    #[tokio::test]
    async fn duplicate_idempotency_keys_are_rejected() {
        let repo = InMemoryBookingRepo::new();
        let host_id = ID::default();

        let mut first = booking(&host_id, 0, 30);
        first.idempotency_key = Some("key-1".into());
        repo.insert(&first).await.unwrap();

        let mut second = booking(&host_id, 60, 90);
        second.idempotency_key = Some("key-1".into());
        let res = repo.insert(&second).await;
        assert!(matches!(res, Err(BookingWriteError::DuplicateIdempotencyKey)));

        let found = repo.find_by_idempotency_key("key-1").await.unwrap().unwrap();
        assert_eq!(found.id, first.id);
    }

    #[tokio::test]
    async fn finds_blocking_bookings_with_half_open_overlap() {
        let repo = InMemoryBookingRepo::new();
        let host_id = ID::default();

        repo.insert(&booking(&host_id, 0, 30)).await.unwrap();
        let mut cancelled = booking(&host_id, 60, 90);
        cancelled.status = BookingStatus::Cancelled;
        repo.insert(&cancelled).await.unwrap();

        // [30, 60) does not overlap [0, 30)
        let blocking = repo
            .find_blocking_in_timespan(&host_id, ts(30), ts(60))
            .await
            .unwrap();
        assert!(blocking.is_empty());

        // [29, 60) does
        let blocking = repo
            .find_blocking_in_timespan(&host_id, ts(29), ts(60))
            .await
            .unwrap();
        assert_eq!(blocking.len(), 1);

        // the cancelled row at [60, 90) never blocks
        let blocking = repo
            .find_blocking_in_timespan(&host_id, ts(60), ts(90))
            .await
            .unwrap();
        assert!(blocking.is_empty());
    }

    #[tokio::test]
    async fn save_guards_reschedules_against_taken_slots() {
        let repo = InMemoryBookingRepo::new();
        let host_id = ID::default();

        repo.insert(&booking(&host_id, 0, 30)).await.unwrap();
        let mut second = booking(&host_id, 60, 90);
        repo.insert(&second).await.unwrap();

        second.start_time = ts(0);
        second.end_time = ts(30);
        let res = repo.save(&second).await;
        assert!(matches!(res, Err(BookingWriteError::SlotTaken)));

        // saving a booking onto its own slot is not a conflict
        let unchanged = repo.find(&second.id).await.unwrap().unwrap();
        assert!(repo.save(&unchanged).await.is_ok());
    }

    #[tokio::test]
    async fn concurrent_inserts_for_the_same_slot_admit_exactly_one() {
        let repo = Arc::new(InMemoryBookingRepo::new());
        let host_id = ID::default();

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let repo = repo.clone();
            let b = booking(&host_id, 0, 30);
            tasks.push(tokio::spawn(async move { repo.insert(&b).await }));
        }

        let mut admitted = 0;
        let mut rejected = 0;
        for task in tasks {
            match task.await.unwrap() {
                Ok(()) => admitted += 1,
                Err(BookingWriteError::SlotTaken) => rejected += 1,
                Err(e) => panic!("unexpected error: {:?}", e),
            }
        }
        assert_eq!(admitted, 1);
        assert_eq!(rejected, 7);

        let blocking = repo
            .find_blocking_in_timespan(&host_id, ts(0), ts(30))
            .await
            .unwrap();
        assert_eq!(blocking.len(), 1);
    }

    #[tokio::test]
    async fn finds_by_uid() {
        let repo = InMemoryBookingRepo::new();
        let b = booking(&ID::default(), 0, 30);
        repo.insert(&b).await.unwrap();

        assert!(repo.find_by_uid(&b.uid).await.unwrap().is_some());
        assert!(repo.find_by_uid("missing").await.unwrap().is_none());
    }
}
