use serde::{Deserialize, Serialize};
use slotbook_domain::{CustomQuestion, EventType, ID, LocationKind};
use validator::Validate;

use crate::dtos::{EventTypeDTO, WorkingHoursDTO};

/// Event type object
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventTypeResponse {
    /// Event type retrieved
    pub event_type: EventTypeDTO,
}

impl EventTypeResponse {
    pub fn new(event_type: EventType) -> Self {
        Self {
            event_type: EventTypeDTO::new(event_type),
        }
    }
}

pub mod create_event_type {
    use super::*;

    /// Request body for creating an event type
    #[derive(Debug, Serialize, Deserialize, Validate)]
    #[serde(rename_all = "camelCase")]
    pub struct RequestBody {
        #[validate(length(min = 1, max = 100))]
        pub slug: String,
        #[validate(length(min = 1, max = 200))]
        pub name: String,
        #[validate(length(max = 2000))]
        pub description: Option<String>,
        pub duration_minutes: i64,
        #[serde(default)]
        pub buffer_before_minutes: i64,
        #[serde(default)]
        pub buffer_after_minutes: i64,
        #[serde(default)]
        pub minimum_notice_minutes: i64,
        #[serde(default = "default_scheduling_window_days")]
        pub scheduling_window_days: i64,
        pub slot_interval_minutes: i64,
        pub working_hours: Vec<WorkingHoursDTO>,
        #[serde(default)]
        pub participating_calendars: Vec<ID>,
        pub destination_calendar: Option<ID>,
        #[serde(default)]
        pub location_kind: LocationKind,
        #[serde(default)]
        pub include_tentative_busy: bool,
        #[serde(default)]
        pub requires_confirmation: bool,
        #[serde(default)]
        pub custom_questions: Vec<CustomQuestion>,
    }

    pub type APIResponse = EventTypeResponse;
}

fn default_scheduling_window_days() -> i64 {
    14
}

pub mod get_event_type {
    use super::*;

    #[derive(Debug, Deserialize)]
    pub struct PathParams {
        pub event_type_id: ID,
    }

    pub type APIResponse = EventTypeResponse;
}

pub mod get_event_types {
    use super::*;

    /// API response for listing a host's event types
    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct APIResponse {
        pub event_types: Vec<EventTypeDTO>,
    }

    impl APIResponse {
        pub fn new(event_types: Vec<EventType>) -> Self {
            Self {
                event_types: event_types.into_iter().map(EventTypeDTO::new).collect(),
            }
        }
    }
}

pub mod update_event_type {
    use super::*;

    #[derive(Debug, Deserialize)]
    pub struct PathParams {
        pub event_type_id: ID,
    }

    /// Request body for updating an event type; absent fields keep their value
    #[derive(Debug, Serialize, Deserialize, Validate)]
    #[serde(rename_all = "camelCase")]
    pub struct RequestBody {
        #[validate(length(min = 1, max = 200))]
        pub name: Option<String>,
        #[validate(length(max = 2000))]
        pub description: Option<String>,
        pub duration_minutes: Option<i64>,
        pub buffer_before_minutes: Option<i64>,
        pub buffer_after_minutes: Option<i64>,
        pub minimum_notice_minutes: Option<i64>,
        pub scheduling_window_days: Option<i64>,
        pub slot_interval_minutes: Option<i64>,
        pub working_hours: Option<Vec<WorkingHoursDTO>>,
        pub participating_calendars: Option<Vec<ID>>,
        pub destination_calendar: Option<ID>,
        pub location_kind: Option<LocationKind>,
        pub include_tentative_busy: Option<bool>,
        pub requires_confirmation: Option<bool>,
        pub custom_questions: Option<Vec<CustomQuestion>>,
        pub active: Option<bool>,
    }

    pub type APIResponse = EventTypeResponse;
}

pub mod delete_event_type {
    use super::*;

    #[derive(Debug, Deserialize)]
    pub struct PathParams {
        pub event_type_id: ID,
    }

    pub type APIResponse = EventTypeResponse;
}
