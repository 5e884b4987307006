//! Shared state builders for usecase tests: an in-memory context with a
//! pinned clock, a seeded stub gateway, one host with one connected account
//! and a selected calendar, and a weekday event type.

use std::sync::Arc;

use chrono::{DateTime, NaiveTime, Utc, Weekday};
use slotbook_domain::{
    Calendar,
    ConnectedAccount,
    EventType,
    Host,
    LocationKind,
    REQUIRED_OAUTH_SCOPES,
    Tz,
    WorkingHours,
};
use slotbook_infra::{FakeSys, SlotbookContext, StubCalendarGateway, setup_inmemory_context};

pub(crate) struct TestSetup {
    pub ctx: SlotbookContext,
    pub sys: Arc<FakeSys>,
    pub gateway: Arc<StubCalendarGateway>,
    pub host: Host,
    pub event_type: EventType,
    pub account: ConnectedAccount,
    pub calendar: Calendar,
}

pub(crate) fn utc(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).unwrap().to_utc()
}

/// Monday 2024-01-08, noon UTC: one week before the test dates most tests use
pub(crate) fn default_now() -> DateTime<Utc> {
    utc("2024-01-08T12:00:00Z")
}

pub(crate) fn weekday_hours(start: (u32, u32), end: (u32, u32)) -> Vec<WorkingHours> {
    [
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
    ]
    .into_iter()
    .map(|day| WorkingHours {
        day,
        start: NaiveTime::from_hms_opt(start.0, start.1, 0).unwrap(),
        end: NaiveTime::from_hms_opt(end.0, end.1, 0).unwrap(),
    })
    .collect()
}

pub(crate) async fn setup(host_tz: Tz) -> TestSetup {
    let mut ctx = setup_inmemory_context().unwrap();

    let sys = Arc::new(FakeSys::new(default_now()));
    ctx.sys = sys.clone();

    let gateway = Arc::new(StubCalendarGateway::new());
    ctx.calendar_gateway = gateway.clone();

    let host = Host::new("Grace Hopper".into(), "grace@example.com".into(), host_tz);
    ctx.repos.hosts.insert(&host).await.unwrap();

    let account = ConnectedAccount {
        id: Default::default(),
        host_id: host.id.clone(),
        external_identity: "grace@example.com".into(),
        sealed_access_token: "sealed".into(),
        sealed_refresh_token: "sealed".into(),
        access_token_expires_at: utc("2030-01-01T00:00:00Z"),
        scopes: REQUIRED_OAUTH_SCOPES.iter().map(|s| s.to_string()).collect(),
        valid: true,
        failed_busy_fetches: 0,
        last_synced_at: None,
    };
    ctx.repos.accounts.insert(&account).await.unwrap();

    let calendar = Calendar {
        id: Default::default(),
        account_id: account.id.clone(),
        external_id: "primary".into(),
        name: "Primary".into(),
        writable: true,
        selected_for_busy: true,
    };
    ctx.repos.calendars.insert(&calendar).await.unwrap();

    let event_type = EventType {
        id: Default::default(),
        host_id: host.id.clone(),
        slug: "intro-call".into(),
        name: "Intro call".into(),
        description: None,
        duration_minutes: 30,
        buffer_before_minutes: 0,
        buffer_after_minutes: 0,
        minimum_notice_minutes: 0,
        scheduling_window_days: 14,
        slot_interval_minutes: 15,
        working_hours: weekday_hours((9, 0), (17, 0)),
        participating_calendars: vec![calendar.id.clone()],
        destination_calendar: Some(calendar.id.clone()),
        location_kind: LocationKind::Video,
        include_tentative_busy: false,
        requires_confirmation: false,
        custom_questions: Vec::new(),
        active: true,
    };
    ctx.repos.event_types.insert(&event_type).await.unwrap();

    TestSetup {
        ctx,
        sys,
        gateway,
        host,
        event_type,
        account,
        calendar,
    }
}

/// A second connected account with one selected calendar, wired into the
/// event type's participating set.
pub(crate) async fn add_second_account(setup: &mut TestSetup) -> (ConnectedAccount, Calendar) {
    let account = ConnectedAccount {
        id: Default::default(),
        host_id: setup.host.id.clone(),
        external_identity: "grace.work@example.com".into(),
        sealed_access_token: "sealed".into(),
        sealed_refresh_token: "sealed".into(),
        access_token_expires_at: utc("2030-01-01T00:00:00Z"),
        scopes: REQUIRED_OAUTH_SCOPES.iter().map(|s| s.to_string()).collect(),
        valid: true,
        failed_busy_fetches: 0,
        last_synced_at: None,
    };
    setup.ctx.repos.accounts.insert(&account).await.unwrap();

    let calendar = Calendar {
        id: Default::default(),
        account_id: account.id.clone(),
        external_id: "work".into(),
        name: "Work".into(),
        writable: false,
        selected_for_busy: true,
    };
    setup.ctx.repos.calendars.insert(&calendar).await.unwrap();

    setup
        .event_type
        .participating_calendars
        .push(calendar.id.clone());
    setup
        .ctx
        .repos
        .event_types
        .save(&setup.event_type)
        .await
        .unwrap();

    (account, calendar)
}
