pub mod google_calendar;
mod mailer;
mod stub_calendar;
mod token_vault;

use chrono::{DateTime, Utc};
pub use google_calendar::{GoogleCalendarGateway, GoogleClientCredentials};
pub use mailer::{BookingEmail, EmailTemplate, HttpMailer, IMailer, LoggingMailer};
use slotbook_domain::{BusyBlock, ConnectedAccount};
pub use stub_calendar::StubCalendarGateway;
pub use token_vault::TokenVault;

/// One free/busy question for one account; the gateway answers it with a
/// single external request covering all listed calendars.
#[derive(Debug, Clone)]
pub struct FreeBusyProviderQuery {
    /// External (provider-side) calendar identifiers
    pub calendar_ids: Vec<String>,
    pub time_min: DateTime<Utc>,
    pub time_max: DateTime<Utc>,
    /// Whether tentative events count as busy, when the provider tells them apart
    pub include_tentative: bool,
}

/// The event written to the destination calendar after a commit
#[derive(Debug, Clone)]
pub struct CalendarEventInput {
    /// External identifier of the destination calendar
    pub calendar_external_id: String,
    pub summary: String,
    pub description: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub host_email: String,
    pub guest_email: String,
    /// Booking uid, reused as the provider-side iCalUID
    pub uid: String,
    /// Ask the provider to attach a video meeting link
    pub with_meeting_link: bool,
}

#[derive(Debug, Clone)]
pub struct CreatedCalendarEvent {
    pub event_ref: String,
    pub meeting_url: Option<String>,
}

/// The narrow contract the core has with an external calendar service.
///
/// All methods take the connected account so implementations can refresh
/// tokens; failures never carry provider-specific types past this seam.
#[async_trait::async_trait]
pub trait ICalendarGateway: Send + Sync {
    /// Busy blocks over `[time_min, time_max)`, clipped to the window
    async fn freebusy(
        &self,
        account: &ConnectedAccount,
        query: FreeBusyProviderQuery,
    ) -> anyhow::Result<Vec<BusyBlock>>;

    async fn create_event(
        &self,
        account: &ConnectedAccount,
        input: CalendarEventInput,
    ) -> anyhow::Result<CreatedCalendarEvent>;

    async fn move_event(
        &self,
        account: &ConnectedAccount,
        calendar_external_id: &str,
        event_ref: &str,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> anyhow::Result<()>;

    async fn delete_event(
        &self,
        account: &ConnectedAccount,
        calendar_external_id: &str,
        event_ref: &str,
    ) -> anyhow::Result<()>;

    /// The provider's current calendar list, for reconciliation
    async fn list_calendars(
        &self,
        account: &ConnectedAccount,
    ) -> anyhow::Result<Vec<ProviderCalendar>>;
}

/// A calendar as the provider reports it
#[derive(Debug, Clone)]
pub struct ProviderCalendar {
    pub external_id: String,
    pub name: String,
    pub writable: bool,
}
