use std::collections::VecDeque;

use chrono::{DateTime, NaiveDate, TimeDelta, Utc, prelude::*};
use chrono_tz::Tz;
use serde::Serialize;

use crate::{event_type::WorkingHours, timezone};

/// A bookable half-open interval `[start, start + duration)`
#[derive(Serialize, Clone, Copy, PartialEq, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Slot {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Candidate slots for one local calendar day in the host timezone.
///
/// Starts are placed at multiples of `interval` from the working-hours start
/// and a slot must end at or before the working-hours end. Local times that
/// do not exist on this day (spring forward) are skipped; ambiguous local
/// times resolve to the earlier instant.
pub fn enumerate_day(
    date: NaiveDate,
    working_hours: &[&WorkingHours],
    duration: TimeDelta,
    interval: TimeDelta,
    tz: &Tz,
) -> Vec<Slot> {
    let mut slots = Vec::new();
    if duration <= TimeDelta::zero() || interval <= TimeDelta::zero() {
        return slots;
    }

    for rule in working_hours {
        if rule.day != date.weekday() {
            continue;
        }

        let mut cursor = date.and_time(rule.start);
        let day_end = date.and_time(rule.end);
        while cursor + duration <= day_end {
            if let Some(start) = timezone::to_instant(cursor, tz) {
                slots.push(Slot {
                    start,
                    end: start + duration,
                });
            }
            cursor += interval;
        }
    }

    slots.sort_by_key(|s| s.start);
    slots.dedup();
    slots
}

/// Slots of one local calendar date, for display grouping
#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SlotsDate {
    pub date: String,
    pub slots: Vec<Slot>,
}

impl SlotsDate {
    fn new(slots: &mut VecDeque<Slot>, tz: &Tz) -> Option<Self> {
        let date = format_local_date(&slots.front()?.start, tz);
        let mut date_slots = Vec::new();

        while let Some(slot) = slots.front() {
            if format_local_date(&slot.start, tz) != date {
                break;
            }
            // Unwrap is fine, front() was Some
            #[allow(clippy::unwrap_used)]
            date_slots.push(slots.pop_front().unwrap());
        }

        Some(Self {
            date,
            slots: date_slots,
        })
    }
}

/// Group slots by their local calendar date in the given (guest) timezone.
///
/// Input order is preserved inside each group; groups come out in ascending
/// date order when the input is sorted by start.
pub fn group_slots_by_date(slots: Vec<Slot>, tz: &Tz) -> Vec<SlotsDate> {
    let mut slots = slots.into_iter().collect::<VecDeque<_>>();
    let mut dates = Vec::new();

    while let Some(date) = SlotsDate::new(&mut slots, tz) {
        dates.push(date);
    }

    dates
}

fn format_local_date(instant: &DateTime<Utc>, tz: &Tz) -> String {
    instant.with_timezone(tz).format("%Y-%m-%d").to_string()
}

#[cfg(test)]
mod test {
    use chrono::NaiveTime;

    use super::*;

    fn hours(day: Weekday, start: (u32, u32), end: (u32, u32)) -> WorkingHours {
        WorkingHours {
            day,
            start: NaiveTime::from_hms_opt(start.0, start.1, 0).unwrap(),
            end: NaiveTime::from_hms_opt(end.0, end.1, 0).unwrap(),
        }
    }

    #[test]
    fn enumerates_aligned_slots_within_working_hours() {
        let tz = chrono_tz::UTC;
        let rules = [hours(Weekday::Mon, (9, 0), (10, 0))];
        let refs: Vec<&WorkingHours> = rules.iter().collect();

        let slots = enumerate_day(
            NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            &refs,
            TimeDelta::minutes(30),
            TimeDelta::minutes(15),
            &tz,
        );

        let starts: Vec<String> = slots
            .iter()
            .map(|s| s.start.format("%H:%M").to_string())
            .collect();
        // last slot must end by 10:00
        assert_eq!(starts, vec!["09:00", "09:15", "09:30"]);
        assert_eq!(slots[0].end - slots[0].start, TimeDelta::minutes(30));
    }

    #[test]
    fn other_weekdays_produce_nothing() {
        let tz = chrono_tz::UTC;
        let rules = [hours(Weekday::Tue, (9, 0), (17, 0))];
        let refs: Vec<&WorkingHours> = rules.iter().collect();

        // 2024-01-15 is a Monday
        let slots = enumerate_day(
            NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            &refs,
            TimeDelta::minutes(30),
            TimeDelta::minutes(30),
            &tz,
        );
        assert!(slots.is_empty());
    }

    #[test]
    fn split_shifts_enumerate_both_intervals() {
        let tz = chrono_tz::UTC;
        let rules = [
            hours(Weekday::Mon, (13, 0), (14, 0)),
            hours(Weekday::Mon, (9, 0), (10, 0)),
        ];
        let refs: Vec<&WorkingHours> = rules.iter().collect();

        let slots = enumerate_day(
            NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            &refs,
            TimeDelta::minutes(60),
            TimeDelta::minutes(60),
            &tz,
        );
        let starts: Vec<String> = slots
            .iter()
            .map(|s| s.start.format("%H:%M").to_string())
            .collect();
        assert_eq!(starts, vec!["09:00", "13:00"]);
    }

    #[test]
    fn spring_forward_skips_nonexistent_starts() {
        // New York, 2024-03-10: 02:00-03:00 local does not exist
        let tz = chrono_tz::America::New_York;
        let rules = [hours(Weekday::Sun, (1, 0), (4, 0))];
        let refs: Vec<&WorkingHours> = rules.iter().collect();

        let slots = enumerate_day(
            NaiveDate::from_ymd_opt(2024, 3, 10).unwrap(),
            &refs,
            TimeDelta::minutes(30),
            TimeDelta::minutes(30),
            &tz,
        );

        let local_starts: Vec<String> = slots
            .iter()
            .map(|s| {
                s.start
                    .with_timezone(&tz)
                    .format("%H:%M")
                    .to_string()
            })
            .collect();
        // 02:00 and 02:30 never happened on this day
        assert_eq!(local_starts, vec!["01:00", "01:30", "03:00", "03:30"]);
    }

    #[test]
    fn spring_forward_working_day_starts_at_first_existing_instant() {
        let tz = chrono_tz::America::New_York;
        let rules = [hours(Weekday::Sun, (9, 0), (17, 0))];
        let refs: Vec<&WorkingHours> = rules.iter().collect();

        let slots = enumerate_day(
            NaiveDate::from_ymd_opt(2024, 3, 10).unwrap(),
            &refs,
            TimeDelta::minutes(30),
            TimeDelta::minutes(15),
            &tz,
        );

        // 09:00 EDT == 13:00 UTC on the spring-forward day
        assert_eq!(slots[0].start.to_rfc3339(), "2024-03-10T13:00:00+00:00");
        assert!(slots.iter().all(|s| {
            let local = s.start.with_timezone(&tz).time();
            local >= NaiveTime::from_hms_opt(9, 0, 0).unwrap()
        }));
    }

    #[test]
    fn fall_back_duplicated_hour_dedupes_to_earlier_instant() {
        // New York, 2024-11-03: 01:00-02:00 local happens twice
        let tz = chrono_tz::America::New_York;
        let rules = [hours(Weekday::Sun, (1, 0), (2, 0))];
        let refs: Vec<&WorkingHours> = rules.iter().collect();

        let slots = enumerate_day(
            NaiveDate::from_ymd_opt(2024, 11, 3).unwrap(),
            &refs,
            TimeDelta::minutes(30),
            TimeDelta::minutes(30),
            &tz,
        );

        // first occurrences of 01:00 and 01:30 local are EDT instants
        assert_eq!(slots.len(), 2);
        assert_eq!(slots[0].start.to_rfc3339(), "2024-11-03T05:00:00+00:00");
        assert_eq!(slots[1].start.to_rfc3339(), "2024-11-03T05:30:00+00:00");
    }

    #[test]
    fn groups_slots_by_guest_local_date() {
        let tz = chrono_tz::America::New_York;
        let base = DateTime::parse_from_rfc3339("2024-01-15T23:00:00Z")
            .unwrap()
            .to_utc();

        // 23:00Z is 18:00 local, 05:00Z next day is 00:00 local on the 16th
        let slots: Vec<Slot> = (0..4)
            .map(|i| {
                let start = base + TimeDelta::hours(2 * i);
                Slot {
                    start,
                    end: start + TimeDelta::minutes(30),
                }
            })
            .collect();

        let dates = group_slots_by_date(slots, &tz);
        assert_eq!(dates.len(), 2);
        assert_eq!(dates[0].date, "2024-01-15");
        assert_eq!(dates[0].slots.len(), 3);
        assert_eq!(dates[1].date, "2024-01-16");
        assert_eq!(dates[1].slots.len(), 1);
    }

    #[test]
    fn grouping_empty_slots_is_empty() {
        assert!(group_slots_by_date(Vec::new(), &chrono_tz::UTC).is_empty());
    }
}
