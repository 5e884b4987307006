use std::{collections::HashMap, sync::Mutex};

use chrono::{DateTime, Utc};
use slotbook_domain::{Booking, ID};

use super::{BookingWriteError, IBookingRepo};

/// Booking ledger in process memory.
///
/// One mutex over the whole map plays the role of the database transaction:
/// the check of the uniqueness gates and the write happen atomically.
#[derive(Default)]
pub struct InMemoryBookingRepo {
    bookings: Mutex<HashMap<ID, Booking>>,
}

impl InMemoryBookingRepo {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_lock<T>(&self, f: impl FnOnce(&mut HashMap<ID, Booking>) -> T) -> T {
        let mut guard = match self.bookings.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut guard)
    }

    /// Same invariants as the partial unique indexes in the Postgres schema
    fn check_gates(
        bookings: &HashMap<ID, Booking>,
        candidate: &Booking,
    ) -> Result<(), BookingWriteError> {
        let slot_taken = bookings.values().any(|b| {
            b.id != candidate.id
                && b.host_id == candidate.host_id
                && b.start_time == candidate.start_time
                && b.end_time == candidate.end_time
                && !matches!(b.status, slotbook_domain::BookingStatus::Cancelled)
        });
        if slot_taken && !matches!(candidate.status, slotbook_domain::BookingStatus::Cancelled) {
            return Err(BookingWriteError::SlotTaken);
        }

        if let Some(key) = &candidate.idempotency_key {
            let duplicate = bookings
                .values()
                .any(|b| b.id != candidate.id && b.idempotency_key.as_ref() == Some(key));
            if duplicate {
                return Err(BookingWriteError::DuplicateIdempotencyKey);
            }
        }

        Ok(())
    }
}

#[async_trait::async_trait]
impl IBookingRepo for InMemoryBookingRepo {
    async fn insert(&self, booking: &Booking) -> Result<(), BookingWriteError> {
        self.with_lock(|bookings| {
            Self::check_gates(bookings, booking)?;
            bookings.insert(booking.id.clone(), booking.clone());
            Ok(())
        })
    }

    async fn save(&self, booking: &Booking) -> Result<(), BookingWriteError> {
        self.with_lock(|bookings| {
            Self::check_gates(bookings, booking)?;
            bookings.insert(booking.id.clone(), booking.clone());
            Ok(())
        })
    }

    async fn find(&self, booking_id: &ID) -> anyhow::Result<Option<Booking>> {
        Ok(self.with_lock(|bookings| bookings.get(booking_id).cloned()))
    }

    async fn find_by_uid(&self, uid: &str) -> anyhow::Result<Option<Booking>> {
        Ok(self.with_lock(|bookings| bookings.values().find(|b| b.uid == uid).cloned()))
    }

    async fn find_by_idempotency_key(&self, key: &str) -> anyhow::Result<Option<Booking>> {
        Ok(self.with_lock(|bookings| {
            bookings
                .values()
                .find(|b| b.idempotency_key.as_deref() == Some(key))
                .cloned()
        }))
    }

    async fn find_blocking_in_timespan(
        &self,
        host_id: &ID,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> anyhow::Result<Vec<Booking>> {
        Ok(self.with_lock(|bookings| {
            let mut blocking: Vec<Booking> = bookings
                .values()
                .filter(|b| {
                    &b.host_id == host_id
                        && b.is_blocking()
                        && b.start_time < end
                        && b.end_time > start
                })
                .cloned()
                .collect();
            blocking.sort_by_key(|b| b.start_time);
            blocking
        }))
    }
}
