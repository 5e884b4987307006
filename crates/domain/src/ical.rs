use crate::{Booking, BookingStatus, EventType, Host};

/// Generates the iCalendar attachment for a booking notification email.
///
/// The `UID` equals the booking uid and the organizer/attendee lines reflect
/// host and guest, so mail clients thread confirmations, reschedules and
/// cancellations of the same booking together.
pub fn generate_ical_content_for_booking(
    booking: &Booking,
    event_type: &EventType,
    host: &Host,
) -> String {
    let mut ical = String::new();

    // iCalendar header
    ical.push_str("BEGIN:VCALENDAR\r\n");
    ical.push_str("VERSION:2.0\r\n");
    ical.push_str("PRODID:-//Slotbook//Scheduling API//EN\r\n");
    ical.push_str("CALSCALE:GREGORIAN\r\n");
    if booking.status == BookingStatus::Cancelled {
        ical.push_str("METHOD:CANCEL\r\n");
    } else {
        ical.push_str("METHOD:REQUEST\r\n");
    }

    ical.push_str("BEGIN:VEVENT\r\n");

    ical.push_str(&format!("UID:{}\r\n", booking.uid));
    ical.push_str(&format!(
        "SUMMARY:{}\r\n",
        escape_text(&format!("{} with {}", event_type.name, booking.guest.name))
    ));
    if let Some(description) = &event_type.description {
        ical.push_str(&format!("DESCRIPTION:{}\r\n", escape_text(description)));
    }
    if let Some(url) = &booking.meeting_url {
        ical.push_str(&format!("LOCATION:{}\r\n", escape_text(url)));
    }

    ical.push_str(&format!(
        "DTSTART:{}\r\n",
        booking.start_time.format("%Y%m%dT%H%M%SZ")
    ));
    ical.push_str(&format!(
        "DTEND:{}\r\n",
        booking.end_time.format("%Y%m%dT%H%M%SZ")
    ));

    ical.push_str(&format!(
        "STATUS:{}\r\n",
        match booking.status {
            BookingStatus::Pending => "TENTATIVE",
            BookingStatus::Confirmed | BookingStatus::Completed => "CONFIRMED",
            BookingStatus::Cancelled => "CANCELLED",
        }
    ));

    ical.push_str(&format!(
        "ORGANIZER;CN={}:mailto:{}\r\n",
        escape_text(&host.name),
        host.email
    ));
    ical.push_str(&format!(
        "ATTENDEE;CN={};ROLE=REQ-PARTICIPANT:mailto:{}\r\n",
        escape_text(&booking.guest.name),
        booking.guest.email
    ));

    ical.push_str(&format!(
        "CREATED:{}\r\n",
        booking.created.format("%Y%m%dT%H%M%SZ")
    ));
    ical.push_str(&format!(
        "LAST-MODIFIED:{}\r\n",
        booking.updated.format("%Y%m%dT%H%M%SZ")
    ));

    ical.push_str("END:VEVENT\r\n");
    ical.push_str("END:VCALENDAR\r\n");

    ical
}

/// Escapes special characters in text fields according to RFC 5545
fn escape_text(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace(';', "\\;")
        .replace(',', "\\,")
        .replace('\n', "\\n")
}

#[cfg(test)]
mod test {
    use chrono::DateTime;

    use super::*;
    use crate::{BookingStatus, Guest};

    fn booking() -> Booking {
        Booking {
            id: Default::default(),
            uid: "q7wq2pdd0bk3xz1m9a4e5rn2".into(),
            host_id: Default::default(),
            event_type_id: Default::default(),
            start_time: DateTime::parse_from_rfc3339("2024-01-15T16:00:00Z")
                .unwrap()
                .to_utc(),
            end_time: DateTime::parse_from_rfc3339("2024-01-15T16:30:00Z")
                .unwrap()
                .to_utc(),
            guest: Guest {
                name: "Ada Lovelace".into(),
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
            meeting_url: Some("https://meet.example.com/abc".into()),
            rescheduled_from_uid: None,
            cancelled_at: None,
            created: DateTime::parse_from_rfc3339("2024-01-10T10:00:00Z")
                .unwrap()
                .to_utc(),
            updated: DateTime::parse_from_rfc3339("2024-01-10T10:00:00Z")
                .unwrap()
                .to_utc(),
        }
    }

    fn host() -> Host {
        Host::new(
            "Grace Hopper".into(),
            "grace@example.com".into(),
            chrono_tz::America::New_York,
        )
    }

    fn event_type() -> EventType {
        EventType {
            id: Default::default(),
            host_id: Default::default(),
            slug: "intro-call".into(),
            name: "Intro call".into(),
            description: None,
            duration_minutes: 30,
            buffer_before_minutes: 0,
            buffer_after_minutes: 0,
            minimum_notice_minutes: 0,
            scheduling_window_days: 14,
            slot_interval_minutes: 15,
            working_hours: Vec::new(),
            participating_calendars: Vec::new(),
            destination_calendar: None,
            location_kind: Default::default(),
            include_tentative_busy: false,
            requires_confirmation: false,
            custom_questions: Vec::new(),
            active: true,
        }
    }

    #[test]
    fn uid_matches_the_booking_uid() {
        let ics = generate_ical_content_for_booking(&booking(), &event_type(), &host());
        assert!(ics.contains("UID:q7wq2pdd0bk3xz1m9a4e5rn2\r\n"));
        assert!(ics.contains("METHOD:REQUEST\r\n"));
        assert!(ics.contains("DTSTART:20240115T160000Z\r\n"));
        assert!(ics.contains("DTEND:20240115T163000Z\r\n"));
        assert!(ics.contains("ORGANIZER;CN=Grace Hopper:mailto:grace@example.com\r\n"));
        assert!(ics.contains("ATTENDEE;CN=Ada Lovelace;ROLE=REQ-PARTICIPANT:mailto:ada@example.com\r\n"));
    }

    #[test]
    fn cancelled_bookings_use_the_cancel_method() {
        let mut cancelled = booking();
        cancelled.status = BookingStatus::Cancelled;
        let ics = generate_ical_content_for_booking(&cancelled, &event_type(), &host());
        assert!(ics.contains("METHOD:CANCEL\r\n"));
        assert!(ics.contains("STATUS:CANCELLED\r\n"));
    }

    #[test]
    fn escapes_rfc5545_specials() {
        let mut b = booking();
        b.guest.name = "Ada; Lovelace, PhD".into();
        let ics = generate_ical_content_for_booking(&b, &event_type(), &host());
        assert!(ics.contains("Ada\\; Lovelace\\, PhD"));
    }
}
