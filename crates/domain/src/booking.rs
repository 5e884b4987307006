use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::shared::entity::{Entity, ID};

#[derive(Debug, Default, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum BookingStatus {
    Pending,
    #[default]
    Confirmed,
    Cancelled,
    Completed,
}

impl From<BookingStatus> for String {
    fn from(s: BookingStatus) -> Self {
        match s {
            BookingStatus::Pending => "pending".into(),
            BookingStatus::Confirmed => "confirmed".into(),
            BookingStatus::Cancelled => "cancelled".into(),
            BookingStatus::Completed => "completed".into(),
        }
    }
}

impl TryFrom<String> for BookingStatus {
    type Error = anyhow::Error;
    fn try_from(s: String) -> anyhow::Result<BookingStatus> {
        Ok(match &s[..] {
            "pending" => BookingStatus::Pending,
            "confirmed" => BookingStatus::Confirmed,
            "cancelled" => BookingStatus::Cancelled,
            "completed" => BookingStatus::Completed,
            _ => Err(anyhow::anyhow!("Invalid booking status"))?,
        })
    }
}

/// The guest side of a booking
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Guest {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub notes: Option<String>,
}

/// A durable reservation of one slot
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: ID,
    /// Short public identifier, also the iCalendar UID
    pub uid: String,
    pub host_id: ID,
    pub event_type_id: ID,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub guest: Guest,
    pub guest_timezone: Tz,
    pub status: BookingStatus,
    pub idempotency_key: Option<String>,
    /// Answers to the event type's custom questions, keyed by label
    pub custom_responses: serde_json::Value,
    /// Identifier of the event written to the destination calendar
    pub external_event_ref: Option<String>,
    /// Whether the post-commit external calendar write succeeded
    pub external_event_created: bool,
    pub meeting_url: Option<String>,
    /// Uid this booking had before its last reschedule
    pub rescheduled_from_uid: Option<String>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

impl Entity<ID> for Booking {
    fn id(&self) -> ID {
        self.id.clone()
    }
}

impl Booking {
    /// PENDING and CONFIRMED bookings occupy their slot
    pub fn is_blocking(&self) -> bool {
        matches!(self.status, BookingStatus::Pending | BookingStatus::Confirmed)
    }

    /// Whether `email` identifies the guest of this booking
    pub fn guest_matches(&self, email: &str) -> bool {
        self.guest.email.eq_ignore_ascii_case(email.trim())
    }
}

/// Deterministic idempotency key for a request that did not bring one.
///
/// Includes the wall-clock millisecond so a naive client retry within the
/// same millisecond is deduplicated while an ordinary retry is not.
pub fn derive_idempotency_key(
    event_type_id: &ID,
    start_time: DateTime<Utc>,
    guest_email: &str,
    now: DateTime<Utc>,
) -> String {
    format!(
        "{}:{}:{}:{}",
        event_type_id,
        start_time.timestamp_millis(),
        guest_email.to_lowercase(),
        now.timestamp_millis()
    )
}
