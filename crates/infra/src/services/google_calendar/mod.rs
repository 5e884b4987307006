mod calendar_api;

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use anyhow::{Context, anyhow};
use calendar_api::{
    ConferenceCreateRequest,
    ConferenceData,
    EventAttendee,
    EventDateTime,
    FreeBusyCalendar,
    FreeBusyRequest,
    GoogleCalendarEventAttributes,
    GoogleCalendarEventPatch,
    GoogleCalendarRestApi,
};
use chrono::{DateTime, TimeDelta, Utc};
use serde::Deserialize;
use slotbook_domain::{BusyBlock, BusySource, ConnectedAccount, ID};
use tracing::error;

use super::{
    CalendarEventInput,
    CreatedCalendarEvent,
    FreeBusyProviderQuery,
    ICalendarGateway,
    ProviderCalendar,
    TokenVault,
};
use crate::{metrics, repos::IAccountRepo, system::ISys};

// https://developers.google.com/identity/protocols/oauth2/web-server#offline
const TOKEN_REFRESH_ENDPOINT: &str = "https://oauth2.googleapis.com/token";

#[derive(Debug, Clone)]
pub struct GoogleClientCredentials {
    pub client_id: String,
    pub client_secret: String,
}

// https://developers.google.com/identity/protocols/oauth2/web-server#httprest_3
#[derive(Debug, Deserialize)]
struct RefreshTokenResponse {
    access_token: String,
    // Access token expiry specified in seconds
    expires_in: i64,
}

/// External calendar service backed by the Google calendar REST API.
///
/// Token refresh is a critical section per account: one refresh attempt at a
/// time, re-reading the stored account after taking the lock so a refresh
/// finished by a concurrent request is reused instead of repeated.
pub struct GoogleCalendarGateway {
    api: GoogleCalendarRestApi,
    http: reqwest::Client,
    credentials: GoogleClientCredentials,
    accounts: Arc<dyn IAccountRepo>,
    vault: TokenVault,
    sys: Arc<dyn ISys>,
    refresh_locks: Mutex<HashMap<ID, Arc<tokio::sync::Mutex<()>>>>,
}

impl GoogleCalendarGateway {
    pub fn new(
        credentials: GoogleClientCredentials,
        accounts: Arc<dyn IAccountRepo>,
        vault: TokenVault,
        sys: Arc<dyn ISys>,
    ) -> Self {
        let http = reqwest::Client::new();
        Self {
            api: GoogleCalendarRestApi::new(http.clone()),
            http,
            credentials,
            accounts,
            vault,
            sys,
            refresh_locks: Mutex::new(HashMap::new()),
        }
    }

    fn refresh_lock(&self, account_id: &ID) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = match self.refresh_locks.lock() {
            Ok(locks) => locks,
            Err(poisoned) => poisoned.into_inner(),
        };
        locks.entry(account_id.clone()).or_default().clone()
    }

    /// A usable access token for the account, refreshing it when it is
    /// within the expiry skew.
    async fn access_token(&self, account: &ConnectedAccount) -> anyhow::Result<String> {
        if !account.token_expiring(self.sys.get_timestamp()) {
            return self.vault.open(&account.sealed_access_token);
        }

        let lock = self.refresh_lock(&account.id);
        let _guard = lock.lock().await;

        // Re-read after taking the lock: a concurrent request may already
        // have refreshed and persisted a new token
        let mut account = self
            .accounts
            .find(&account.id)
            .await?
            .ok_or_else(|| anyhow!("Connected account {} is gone", account.id))?;
        if !account.token_expiring(self.sys.get_timestamp()) {
            return self.vault.open(&account.sealed_access_token);
        }

        let refresh_token = self.vault.open(&account.sealed_refresh_token)?;
        match self.refresh_access_token(&refresh_token).await {
            Ok(tokens) => {
                account.sealed_access_token = self.vault.seal(&tokens.access_token)?;
                account.access_token_expires_at =
                    self.sys.get_timestamp() + TimeDelta::seconds(tokens.expires_in);
                self.accounts.save(&account).await?;
                Ok(tokens.access_token)
            }
            Err(e) => {
                error!(
                    "Token refresh failed for account {}, marking it invalid: {:?}",
                    account.id, e
                );
                metrics::TOKEN_REFRESH_FAILURES.inc();
                account.valid = false;
                if let Err(save_err) = self.accounts.save(&account).await {
                    error!(
                        "Unable to persist invalidation of account {}: {:?}",
                        account.id, save_err
                    );
                }
                Err(e)
            }
        }
    }

    async fn refresh_access_token(
        &self,
        refresh_token: &str,
    ) -> anyhow::Result<RefreshTokenResponse> {
        let params = [
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];

        let res = self
            .http
            .post(TOKEN_REFRESH_ENDPOINT)
            .form(&params)
            .send()
            .await
            .inspect_err(|e| {
                error!("Google OAuth refresh token failed with network error: {:?}", e);
            })?;

        res.error_for_status()?
            .json::<RefreshTokenResponse>()
            .await
            .context("Unexpected refresh token response from google")
    }
}

#[async_trait::async_trait]
impl ICalendarGateway for GoogleCalendarGateway {
    async fn freebusy(
        &self,
        account: &ConnectedAccount,
        query: FreeBusyProviderQuery,
    ) -> anyhow::Result<Vec<BusyBlock>> {
        let access_token = self.access_token(account).await?;

        // One request per account, covering all of its calendars
        let body = FreeBusyRequest {
            time_min: query.time_min,
            time_max: query.time_max,
            time_zone: "UTC".to_string(),
            items: query
                .calendar_ids
                .into_iter()
                .map(FreeBusyCalendar::new)
                .collect(),
        };

        let res = self.api.freebusy(&access_token, &body).await?;

        let mut blocks = Vec::new();
        for (calendar_id, calendar_busy) in res.calendars {
            for period in calendar_busy.busy {
                // Clip to the window; the provider may answer slightly wider
                let start_time = period.start.max(query.time_min);
                let end_time = period.end.min(query.time_max);
                if start_time < end_time {
                    blocks.push(BusyBlock::new(
                        start_time,
                        end_time,
                        BusySource::Calendar(calendar_id.clone()),
                    ));
                }
            }
        }
        Ok(blocks)
    }

    async fn create_event(
        &self,
        account: &ConnectedAccount,
        input: CalendarEventInput,
    ) -> anyhow::Result<CreatedCalendarEvent> {
        let access_token = self.access_token(account).await?;

        let body = GoogleCalendarEventAttributes {
            summary: input.summary,
            description: input.description,
            start: EventDateTime {
                date_time: input.start_time,
            },
            end: EventDateTime {
                date_time: input.end_time,
            },
            attendees: vec![
                EventAttendee {
                    email: input.host_email,
                },
                EventAttendee {
                    email: input.guest_email,
                },
            ],
            ical_uid: input.uid.clone(),
            conference_data: input.with_meeting_link.then(|| ConferenceData {
                create_request: ConferenceCreateRequest {
                    request_id: input.uid,
                },
            }),
        };

        let event = self
            .api
            .insert(&access_token, &input.calendar_external_id, &body)
            .await?;

        Ok(CreatedCalendarEvent {
            event_ref: event.id,
            meeting_url: event.hangout_link,
        })
    }

    async fn move_event(
        &self,
        account: &ConnectedAccount,
        calendar_external_id: &str,
        event_ref: &str,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        let access_token = self.access_token(account).await?;
        let body = GoogleCalendarEventPatch {
            start: EventDateTime {
                date_time: start_time,
            },
            end: EventDateTime {
                date_time: end_time,
            },
        };
        self.api
            .patch(&access_token, calendar_external_id, event_ref, &body)
            .await
    }

    async fn delete_event(
        &self,
        account: &ConnectedAccount,
        calendar_external_id: &str,
        event_ref: &str,
    ) -> anyhow::Result<()> {
        let access_token = self.access_token(account).await?;
        self.api
            .remove(&access_token, calendar_external_id, event_ref)
            .await
    }

    async fn list_calendars(
        &self,
        account: &ConnectedAccount,
    ) -> anyhow::Result<Vec<ProviderCalendar>> {
        let access_token = self.access_token(account).await?;
        let res = self.api.list(&access_token).await?;

        Ok(res
            .items
            .into_iter()
            .map(|entry| ProviderCalendar {
                writable: matches!(entry.access_role.as_str(), "owner" | "writer"),
                external_id: entry.id,
                name: entry.summary,
            })
            .collect())
    }
}

