use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use slotbook_domain::{
    Booking,
    BookingStatus,
    Calendar,
    ConnectedAccount,
    CustomQuestion,
    EventType,
    ID,
    LocationKind,
    Slot,
    Tz,
};

/// One bookable slot
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SlotDTO {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl SlotDTO {
    pub fn new(slot: Slot) -> Self {
        Self {
            start: slot.start,
            end: slot.end,
        }
    }
}

/// Public view of a booking, stripped of host-private fields
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingDTO {
    pub uid: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: BookingStatus,
    pub guest_name: String,
    pub guest_timezone: Tz,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meeting_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rescheduled_from_uid: Option<String>,
}

impl BookingDTO {
    pub fn new(booking: Booking) -> Self {
        Self {
            uid: booking.uid,
            start_time: booking.start_time,
            end_time: booking.end_time,
            status: booking.status,
            guest_name: booking.guest.name,
            guest_timezone: booking.guest_timezone,
            meeting_url: booking.meeting_url,
            rescheduled_from_uid: booking.rescheduled_from_uid,
        }
    }
}

/// Host-facing view of an event type
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventTypeDTO {
    pub id: ID,
    pub host_id: ID,
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
    pub duration_minutes: i64,
    pub buffer_before_minutes: i64,
    pub buffer_after_minutes: i64,
    pub minimum_notice_minutes: i64,
    pub scheduling_window_days: i64,
    pub slot_interval_minutes: i64,
    pub working_hours: Vec<WorkingHoursDTO>,
    pub participating_calendars: Vec<ID>,
    pub destination_calendar: Option<ID>,
    pub location_kind: LocationKind,
    pub requires_confirmation: bool,
    pub custom_questions: Vec<CustomQuestion>,
    pub active: bool,
}

impl EventTypeDTO {
    pub fn new(event_type: EventType) -> Self {
        Self {
            id: event_type.id,
            host_id: event_type.host_id,
            slug: event_type.slug,
            name: event_type.name,
            description: event_type.description,
            duration_minutes: event_type.duration_minutes,
            buffer_before_minutes: event_type.buffer_before_minutes,
            buffer_after_minutes: event_type.buffer_after_minutes,
            minimum_notice_minutes: event_type.minimum_notice_minutes,
            scheduling_window_days: event_type.scheduling_window_days,
            slot_interval_minutes: event_type.slot_interval_minutes,
            working_hours: event_type
                .working_hours
                .into_iter()
                .map(WorkingHoursDTO::from_domain)
                .collect(),
            participating_calendars: event_type.participating_calendars,
            destination_calendar: event_type.destination_calendar,
            location_kind: event_type.location_kind,
            requires_confirmation: event_type.requires_confirmation,
            custom_questions: event_type.custom_questions,
            active: event_type.active,
        }
    }
}

/// Working hours on the wire: day 0-6 with 0 = Sunday, times as "HH:MM"
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkingHoursDTO {
    pub day: u8,
    pub start: String,
    pub end: String,
}

impl WorkingHoursDTO {
    pub fn from_domain(wh: slotbook_domain::WorkingHours) -> Self {
        Self {
            day: wh.day.num_days_from_sunday() as u8,
            start: wh.start.format("%H:%M").to_string(),
            end: wh.end.format("%H:%M").to_string(),
        }
    }

    pub fn to_domain(&self) -> Result<slotbook_domain::WorkingHours, String> {
        let day = match self.day {
            0 => slotbook_domain::Weekday::Sun,
            1 => slotbook_domain::Weekday::Mon,
            2 => slotbook_domain::Weekday::Tue,
            3 => slotbook_domain::Weekday::Wed,
            4 => slotbook_domain::Weekday::Thu,
            5 => slotbook_domain::Weekday::Fri,
            6 => slotbook_domain::Weekday::Sat,
            other => return Err(format!("day must be 0-6, got {}", other)),
        };
        let start = parse_wall_time(&self.start)?;
        let end = parse_wall_time(&self.end)?;
        Ok(slotbook_domain::WorkingHours { day, start, end })
    }
}

fn parse_wall_time(value: &str) -> Result<chrono::NaiveTime, String> {
    chrono::NaiveTime::parse_from_str(value, "%H:%M")
        .map_err(|_| format!("'{}' is not a valid HH:MM time", value))
}

/// A calendar as the host sees it
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarDTO {
    pub id: ID,
    pub account_id: ID,
    pub external_id: String,
    pub name: String,
    pub writable: bool,
    pub selected_for_busy: bool,
}

impl CalendarDTO {
    pub fn new(calendar: Calendar) -> Self {
        Self {
            id: calendar.id,
            account_id: calendar.account_id,
            external_id: calendar.external_id,
            name: calendar.name,
            writable: calendar.writable,
            selected_for_busy: calendar.selected_for_busy,
        }
    }
}

/// A connected account without its sealed tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectedAccountDTO {
    pub id: ID,
    pub host_id: ID,
    pub external_identity: String,
    pub valid: bool,
    pub last_synced_at: Option<DateTime<Utc>>,
}

impl ConnectedAccountDTO {
    pub fn new(account: ConnectedAccount) -> Self {
        Self {
            id: account.id,
            host_id: account.host_id,
            external_identity: account.external_identity,
            valid: account.valid,
            last_synced_at: account.last_synced_at,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn working_hours_round_trip() {
        let dto = WorkingHoursDTO {
            day: 1,
            start: "09:00".into(),
            end: "17:30".into(),
        };
        let domain = dto.to_domain().unwrap();
        assert_eq!(domain.day, slotbook_domain::Weekday::Mon);
        let back = WorkingHoursDTO::from_domain(domain);
        assert_eq!(back.day, 1);
        assert_eq!(back.start, "09:00");
        assert_eq!(back.end, "17:30");
    }

    #[test]
    fn working_hours_rejects_bad_input() {
        assert!(
            WorkingHoursDTO {
                day: 7,
                start: "09:00".into(),
                end: "17:00".into(),
            }
            .to_domain()
            .is_err()
        );
        assert!(
            WorkingHoursDTO {
                day: 1,
                start: "9am".into(),
                end: "17:00".into(),
            }
            .to_domain()
            .is_err()
        );
    }
}
