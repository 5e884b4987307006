use chrono::{DateTime, Datelike, Utc};
use slotbook_domain::{EventType, Host, TimeSpan, timezone};
use slotbook_infra::SlotbookContext;

use super::fetch_busy_snapshot;

/// The pre-commit check: whether a single slot can be booked right now.
///
/// Recomputes only what one instant needs: working-hours containment and
/// grid alignment, minimum notice, scheduling window, a fresh busy fetch
/// covering the buffer-padded slot, and the absence of a blocking ledger row
/// overlapping `[start, end)`.
pub(crate) async fn is_slot_bookable(
    event_type: &EventType,
    host: &Host,
    start: DateTime<Utc>,
    ctx: &SlotbookContext,
) -> anyhow::Result<bool> {
    let now = ctx.sys.get_timestamp();
    let end = start + event_type.duration();

    if start < now + event_type.minimum_notice() {
        return Ok(false);
    }
    if start > now + event_type.scheduling_window() {
        return Ok(false);
    }
    if !within_working_hours(event_type, host, start) {
        return Ok(false);
    }

    let padded = TimeSpan::new(
        start - event_type.buffer_before(),
        end + event_type.buffer_after(),
    );
    let snapshot = fetch_busy_snapshot(event_type, host, &padded, ctx).await?;
    if snapshot.busy.conflicts(
        start,
        end,
        event_type.buffer_before(),
        event_type.buffer_after(),
    ) {
        return Ok(false);
    }

    // The snapshot already contains ledger rows, but the ledger condition is
    // checked on the unpadded slot as well so a blocking row always rejects
    let blocking = ctx
        .repos
        .bookings
        .find_blocking_in_timespan(&host.id, start, end)
        .await?;
    Ok(blocking.is_empty())
}

/// The slot lies on the working-hours grid of its local day: inside one
/// rule's interval and aligned to a multiple of the slot interval from the
/// rule's start.
fn within_working_hours(event_type: &EventType, host: &Host, start: DateTime<Utc>) -> bool {
    let local = timezone::to_local_wall(start, &host.timezone);
    let duration = event_type.duration();
    let interval = event_type.slot_interval();
    if interval <= chrono::TimeDelta::zero() {
        return false;
    }

    event_type
        .working_hours_on(local.weekday())
        .into_iter()
        .any(|rule| {
            let rule_start = local.date().and_time(rule.start);
            let rule_end = local.date().and_time(rule.end);
            if local < rule_start || local + duration > rule_end {
                return false;
            }
            let offset = local - rule_start;
            offset.num_milliseconds() % interval.num_milliseconds() == 0
        })
}

#[cfg(test)]
mod test {
    use chrono::Weekday;
    use slotbook_domain::{LocationKind, WorkingHours};

    use super::*;

    fn host() -> Host {
        Host::new(
            "Grace".into(),
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
            working_hours: vec![WorkingHours {
                day: Weekday::Mon,
                start: chrono::NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                end: chrono::NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
            }],
            participating_calendars: Vec::new(),
            destination_calendar: None,
            location_kind: LocationKind::Video,
            include_tentative_busy: false,
            requires_confirmation: false,
            custom_questions: Vec::new(),
            active: true,
        }
    }

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().to_utc()
    }

    #[test]
    fn accepts_slots_on_the_grid() {
        // Monday 2024-01-15, 09:00 EST == 14:00Z
        assert!(within_working_hours(
            &event_type(),
            &host(),
            utc("2024-01-15T14:00:00Z")
        ));
        assert!(within_working_hours(
            &event_type(),
            &host(),
            utc("2024-01-15T14:45:00Z")
        ));
        // last slot that still ends by 17:00 local
        assert!(within_working_hours(
            &event_type(),
            &host(),
            utc("2024-01-15T21:30:00Z")
        ));
    }

    #[test]
    fn rejects_slots_off_the_grid_or_outside_hours() {
        // before working hours
        assert!(!within_working_hours(
            &event_type(),
            &host(),
            utc("2024-01-15T13:45:00Z")
        ));
        // not aligned to a 15 minute multiple from 09:00
        assert!(!within_working_hours(
            &event_type(),
            &host(),
            utc("2024-01-15T14:10:00Z")
        ));
        // would end after 17:00 local
        assert!(!within_working_hours(
            &event_type(),
            &host(),
            utc("2024-01-15T21:45:00Z")
        ));
        // Tuesday has no working hours
        assert!(!within_working_hours(
            &event_type(),
            &host(),
            utc("2024-01-16T14:00:00Z")
        ));
    }
}
