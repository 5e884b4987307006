use std::collections::HashMap;

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::error;

// https://developers.google.com/calendar/api/v3/reference
const API_BASE_URL: &str = "https://www.googleapis.com/calendar/v3";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FreeBusyCalendar {
    pub id: String,
}

impl FreeBusyCalendar {
    pub fn new(id: String) -> Self {
        Self { id }
    }
}

// https://developers.google.com/calendar/api/v3/reference/freebusy/query
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FreeBusyRequest {
    pub time_min: DateTime<Utc>,
    pub time_max: DateTime<Utc>,
    pub time_zone: String,
    pub items: Vec<FreeBusyCalendar>,
}

#[derive(Debug, Deserialize)]
pub struct FreeBusyPeriod {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct FreeBusyCalendarResponse {
    #[serde(default)]
    pub busy: Vec<FreeBusyPeriod>,
}

#[derive(Debug, Deserialize)]
pub struct FreeBusyResponse {
    pub calendars: HashMap<String, FreeBusyCalendarResponse>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDateTime {
    pub date_time: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct EventAttendee {
    pub email: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConferenceCreateRequest {
    pub request_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConferenceData {
    pub create_request: ConferenceCreateRequest,
}

// https://developers.google.com/calendar/api/v3/reference/events/insert
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleCalendarEventAttributes {
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub start: EventDateTime,
    pub end: EventDateTime,
    pub attendees: Vec<EventAttendee>,
    #[serde(rename = "iCalUID")]
    pub ical_uid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conference_data: Option<ConferenceData>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleCalendarEventPatch {
    pub start: EventDateTime,
    pub end: EventDateTime,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleCalendarEvent {
    pub id: String,
    #[serde(default)]
    pub hangout_link: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListCalendarsEntry {
    pub id: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub access_role: String,
}

#[derive(Debug, Deserialize)]
pub struct ListCalendarsResponse {
    #[serde(default)]
    pub items: Vec<ListCalendarsEntry>,
}

/// Thin typed wrapper around the Google calendar REST API.
///
/// Access tokens are passed per call because the gateway refreshes them
/// between calls.
pub struct GoogleCalendarRestApi {
    client: reqwest::Client,
}

impl GoogleCalendarRestApi {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    pub async fn freebusy(
        &self,
        access_token: &str,
        body: &FreeBusyRequest,
    ) -> anyhow::Result<FreeBusyResponse> {
        let res = self
            .client
            .post(format!("{}/freeBusy", API_BASE_URL))
            .bearer_auth(access_token)
            .json(body)
            .send()
            .await
            .inspect_err(|e| error!("Google freebusy query failed with network error: {:?}", e))?;

        res.error_for_status()?
            .json::<FreeBusyResponse>()
            .await
            .context("Unexpected freebusy response from google calendar")
    }

    pub async fn insert(
        &self,
        access_token: &str,
        calendar_id: &str,
        body: &GoogleCalendarEventAttributes,
    ) -> anyhow::Result<GoogleCalendarEvent> {
        let res = self
            .client
            .post(format!(
                "{}/calendars/{}/events?conferenceDataVersion=1",
                API_BASE_URL, calendar_id
            ))
            .bearer_auth(access_token)
            .json(body)
            .send()
            .await
            .inspect_err(|e| error!("Google event insert failed with network error: {:?}", e))?;

        res.error_for_status()?
            .json::<GoogleCalendarEvent>()
            .await
            .context("Unexpected event insert response from google calendar")
    }

    pub async fn patch(
        &self,
        access_token: &str,
        calendar_id: &str,
        event_id: &str,
        body: &GoogleCalendarEventPatch,
    ) -> anyhow::Result<()> {
        let res = self
            .client
            .patch(format!(
                "{}/calendars/{}/events/{}",
                API_BASE_URL, calendar_id, event_id
            ))
            .bearer_auth(access_token)
            .json(body)
            .send()
            .await
            .inspect_err(|e| error!("Google event patch failed with network error: {:?}", e))?;

        res.error_for_status()?;
        Ok(())
    }

    pub async fn remove(
        &self,
        access_token: &str,
        calendar_id: &str,
        event_id: &str,
    ) -> anyhow::Result<()> {
        let res = self
            .client
            .delete(format!(
                "{}/calendars/{}/events/{}",
                API_BASE_URL, calendar_id, event_id
            ))
            .bearer_auth(access_token)
            .send()
            .await
            .inspect_err(|e| error!("Google event delete failed with network error: {:?}", e))?;

        res.error_for_status()?;
        Ok(())
    }

    pub async fn list(&self, access_token: &str) -> anyhow::Result<ListCalendarsResponse> {
        let res = self
            .client
            .get(format!("{}/users/me/calendarList", API_BASE_URL))
            .bearer_auth(access_token)
            .send()
            .await
            .inspect_err(|e| error!("Google calendar list failed with network error: {:?}", e))?;

        res.error_for_status()?
            .json::<ListCalendarsResponse>()
            .await
            .context("Unexpected calendar list response from google calendar")
    }
}
