use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeDelta, TimeZone, Utc, offset::LocalResult};
use chrono_tz::Tz;

/// All conversions between wall-clock time in a named zone and instants go
/// through this module so that DST semantics live in exactly one place.
///
/// Policy:
/// - a local time that does not exist (spring-forward gap) maps to `None`
/// - an ambiguous local time (fall-back overlap) resolves to the earlier instant

/// Convert a wall-clock time in the given zone to an instant.
pub fn to_instant(local: NaiveDateTime, tz: &Tz) -> Option<DateTime<Utc>> {
    match tz.from_local_datetime(&local) {
        LocalResult::Single(dt) => Some(dt.with_timezone(&Utc)),
        LocalResult::Ambiguous(earlier, _later) => Some(earlier.with_timezone(&Utc)),
        LocalResult::None => None,
    }
}

/// Convert an instant to the wall-clock time in the given zone.
pub fn to_local_wall(instant: DateTime<Utc>, tz: &Tz) -> NaiveDateTime {
    instant.with_timezone(tz).naive_local()
}

/// Whether the wall-clock time exists in the given zone.
pub fn is_valid_local(local: NaiveDateTime, tz: &Tz) -> bool {
    !matches!(tz.from_local_datetime(&local), LocalResult::None)
}

/// The instants covered by a local calendar day, `[midnight, next midnight)`.
///
/// Some zones skip midnight on a DST transition day, in which case the bound
/// moves forward to the first wall-clock minute that exists.
pub fn local_day_bounds(date: NaiveDate, tz: &Tz) -> (DateTime<Utc>, DateTime<Utc>) {
    (day_start(date, tz), day_start(date + TimeDelta::days(1), tz))
}

fn day_start(date: NaiveDate, tz: &Tz) -> DateTime<Utc> {
    let mut local = date.and_hms_opt(0, 0, 0);
    loop {
        match local {
            Some(wall) => match to_instant(wall, tz) {
                Some(instant) => return instant,
                None => local = Some(wall + TimeDelta::minutes(1)),
            },
            // Unreachable for any NaiveDate, but the type demands an answer
            None => return Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0).unwrap_or_default()),
        }
    }
}
