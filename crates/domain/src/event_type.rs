use chrono::{NaiveTime, TimeDelta, Weekday};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::shared::entity::{Entity, ID};

pub const MIN_DURATION_MINUTES: i64 = 5;
pub const MAX_DURATION_MINUTES: i64 = 480;
pub const MIN_SLOT_INTERVAL_MINUTES: i64 = 5;
pub const MAX_SLOT_INTERVAL_MINUTES: i64 = 60;

/// How the meeting takes place
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LocationKind {
    #[default]
    Video,
    Phone,
    InPerson,
}

impl From<LocationKind> for String {
    fn from(l: LocationKind) -> Self {
        match l {
            LocationKind::Video => "video".into(),
            LocationKind::Phone => "phone".into(),
            LocationKind::InPerson => "in_person".into(),
        }
    }
}

impl TryFrom<String> for LocationKind {
    type Error = anyhow::Error;
    fn try_from(l: String) -> anyhow::Result<LocationKind> {
        Ok(match &l[..] {
            "video" => LocationKind::Video,
            "phone" => LocationKind::Phone,
            "in_person" => LocationKind::InPerson,
            _ => Err(anyhow::anyhow!("Invalid location kind"))?,
        })
    }
}

/// The shape of an extra question the host asks the guest at booking time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum QuestionKind {
    Text,
    Textarea,
    Select { options: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomQuestion {
    pub label: String,
    #[serde(flatten)]
    pub kind: QuestionKind,
    pub required: bool,
}

impl CustomQuestion {
    /// Whether `answer` is an acceptable response to this question.
    pub fn accepts(&self, answer: Option<&str>) -> bool {
        match answer {
            None | Some("") => !self.required,
            Some(value) => match &self.kind {
                QuestionKind::Text | QuestionKind::Textarea => true,
                QuestionKind::Select { options } => options.iter().any(|o| o == value),
            },
        }
    }
}

/// One wall-clock interval on one weekday, interpreted in the host timezone
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkingHours {
    pub day: Weekday,
    pub start: NaiveTime,
    pub end: NaiveTime,
}

/// A bookable meeting definition owned by a host
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventType {
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
    pub working_hours: Vec<WorkingHours>,
    /// Calendars whose busy blocks gate availability
    pub participating_calendars: Vec<ID>,
    /// Calendar the confirmed booking is written to, must participate
    pub destination_calendar: Option<ID>,
    pub location_kind: LocationKind,
    /// Whether tentative external events count as busy
    pub include_tentative_busy: bool,
    /// New bookings start out PENDING instead of CONFIRMED
    pub requires_confirmation: bool,
    pub custom_questions: Vec<CustomQuestion>,
    pub active: bool,
}

impl Entity<ID> for EventType {
    fn id(&self) -> ID {
        self.id.clone()
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum InvalidEventType {
    #[error("Slug '{0}' is not a valid slug (lowercase letters, digits and dashes)")]
    Slug(String),
    #[error("Duration of {0} minutes is outside of [{MIN_DURATION_MINUTES}, {MAX_DURATION_MINUTES}]")]
    Duration(i64),
    #[error(
        "Slot interval of {0} minutes is outside of [{MIN_SLOT_INTERVAL_MINUTES}, {MAX_SLOT_INTERVAL_MINUTES}]"
    )]
    SlotInterval(i64),
    #[error("Working hours must have start before end")]
    WorkingHoursOrder,
    #[error("Minimum notice and scheduling window cannot be negative")]
    NegativeWindow,
    #[error("Buffers cannot be negative")]
    NegativeBuffer,
    #[error("Destination calendar must be one of the participating calendars")]
    DestinationNotParticipating,
}

impl EventType {
    pub fn validate(&self) -> Result<(), InvalidEventType> {
        if self.slug.is_empty()
            || !self
                .slug
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        {
            return Err(InvalidEventType::Slug(self.slug.clone()));
        }
        if !(MIN_DURATION_MINUTES..=MAX_DURATION_MINUTES).contains(&self.duration_minutes) {
            return Err(InvalidEventType::Duration(self.duration_minutes));
        }
        if !(MIN_SLOT_INTERVAL_MINUTES..=MAX_SLOT_INTERVAL_MINUTES)
            .contains(&self.slot_interval_minutes)
        {
            return Err(InvalidEventType::SlotInterval(self.slot_interval_minutes));
        }
        if self.working_hours.iter().any(|wh| wh.start >= wh.end) {
            return Err(InvalidEventType::WorkingHoursOrder);
        }
        if self.minimum_notice_minutes < 0 || self.scheduling_window_days < 0 {
            return Err(InvalidEventType::NegativeWindow);
        }
        if self.buffer_before_minutes < 0 || self.buffer_after_minutes < 0 {
            return Err(InvalidEventType::NegativeBuffer);
        }
        if let Some(destination) = &self.destination_calendar {
            if !self.participating_calendars.contains(destination) {
                return Err(InvalidEventType::DestinationNotParticipating);
            }
        }
        Ok(())
    }

    pub fn duration(&self) -> TimeDelta {
        TimeDelta::minutes(self.duration_minutes)
    }

    pub fn slot_interval(&self) -> TimeDelta {
        TimeDelta::minutes(self.slot_interval_minutes)
    }

    pub fn buffer_before(&self) -> TimeDelta {
        TimeDelta::minutes(self.buffer_before_minutes)
    }

    pub fn buffer_after(&self) -> TimeDelta {
        TimeDelta::minutes(self.buffer_after_minutes)
    }

    pub fn minimum_notice(&self) -> TimeDelta {
        TimeDelta::minutes(self.minimum_notice_minutes)
    }

    pub fn scheduling_window(&self) -> TimeDelta {
        TimeDelta::days(self.scheduling_window_days)
    }

    /// Working hours rules that apply on the given weekday
    pub fn working_hours_on(&self, day: Weekday) -> Vec<&WorkingHours> {
        self.working_hours.iter().filter(|wh| wh.day == day).collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;

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
            minimum_notice_minutes: 60,
            scheduling_window_days: 14,
            slot_interval_minutes: 15,
            working_hours: vec![WorkingHours {
                day: Weekday::Mon,
                start: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                end: NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
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

    #[test]
    fn accepts_a_well_formed_event_type() {
        assert!(event_type().validate().is_ok());
    }

    #[test]
    fn rejects_out_of_range_duration_and_interval() {
        let mut et = event_type();
        et.duration_minutes = 481;
        assert_eq!(et.validate(), Err(InvalidEventType::Duration(481)));

        let mut et = event_type();
        et.slot_interval_minutes = 2;
        assert_eq!(et.validate(), Err(InvalidEventType::SlotInterval(2)));
    }

    #[test]
    fn rejects_inverted_working_hours() {
        let mut et = event_type();
        et.working_hours[0].end = NaiveTime::from_hms_opt(8, 0, 0).unwrap();
        assert_eq!(et.validate(), Err(InvalidEventType::WorkingHoursOrder));
    }

    #[test]
    fn rejects_bad_slugs() {
        for slug in ["", "Intro Call", "intro_call", "intro/call"] {
            let mut et = event_type();
            et.slug = slug.into();
            assert!(matches!(et.validate(), Err(InvalidEventType::Slug(_))));
        }
    }

    #[test]
    fn destination_must_participate() {
        let calendar_id = ID::default();
        let mut et = event_type();
        et.destination_calendar = Some(calendar_id.clone());
        assert_eq!(
            et.validate(),
            Err(InvalidEventType::DestinationNotParticipating)
        );

        et.participating_calendars = vec![calendar_id];
        assert!(et.validate().is_ok());
    }

    #[test]
    fn select_question_only_accepts_listed_options() {
        let question = CustomQuestion {
            label: "Team size".into(),
            kind: QuestionKind::Select {
                options: vec!["1-10".into(), "11-50".into()],
            },
            required: true,
        };
        assert!(question.accepts(Some("1-10")));
        assert!(!question.accepts(Some("51+")));
        assert!(!question.accepts(None));

        let optional = CustomQuestion {
            required: false,
            ..question
        };
        assert!(optional.accepts(None));
    }
}
