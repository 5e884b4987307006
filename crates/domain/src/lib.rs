mod account;
pub mod booking_slots;
mod booking;
mod busy;
mod event_type;
mod host;
pub mod ical;
mod shared;
pub mod timezone;
mod timespan;

pub use account::{Calendar, ConnectedAccount, REQUIRED_OAUTH_SCOPES, TOKEN_EXPIRY_SKEW_SECONDS};
pub use booking::{Booking, BookingStatus, Guest, derive_idempotency_key};
pub use booking_slots::{Slot, SlotsDate, enumerate_day, group_slots_by_date};
pub use busy::{BusyBlock, BusySource, MergedBusy};
pub use chrono::Weekday;
pub use chrono_tz::Tz;
pub use event_type::{
    CustomQuestion,
    EventType,
    InvalidEventType,
    LocationKind,
    QuestionKind,
    WorkingHours,
};
pub use host::Host;
pub use ical::generate_ical_content_for_booking;
pub use shared::entity::{Entity, ID};
pub use timespan::TimeSpan;
