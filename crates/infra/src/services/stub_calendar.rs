use std::{
    collections::HashMap,
    sync::Mutex,
};

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use slotbook_domain::{BusyBlock, ConnectedAccount, ID};

use super::{
    CalendarEventInput,
    CreatedCalendarEvent,
    FreeBusyProviderQuery,
    ICalendarGateway,
    ProviderCalendar,
};

/// In-process gateway used by tests and local development.
///
/// Busy blocks are seeded per account; accounts can be made to fail so
/// per-account failure isolation is exercisable without a network.
#[derive(Default)]
pub struct StubCalendarGateway {
    busy: Mutex<HashMap<ID, Vec<BusyBlock>>>,
    tentative: Mutex<HashMap<ID, Vec<BusyBlock>>>,
    failing: Mutex<HashMap<ID, bool>>,
    created_events: Mutex<Vec<CalendarEventInput>>,
    deleted_events: Mutex<Vec<String>>,
    fail_event_writes: Mutex<bool>,
    calendars: Mutex<Vec<ProviderCalendar>>,
}

impl StubCalendarGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_busy(&self, account_id: &ID, blocks: Vec<BusyBlock>) {
        if let Ok(mut busy) = self.busy.lock() {
            busy.insert(account_id.clone(), blocks);
        }
    }

    pub fn seed_tentative(&self, account_id: &ID, blocks: Vec<BusyBlock>) {
        if let Ok(mut tentative) = self.tentative.lock() {
            tentative.insert(account_id.clone(), blocks);
        }
    }

    pub fn set_failing(&self, account_id: &ID, failing: bool) {
        if let Ok(mut map) = self.failing.lock() {
            map.insert(account_id.clone(), failing);
        }
    }

    pub fn set_fail_event_writes(&self, fail: bool) {
        if let Ok(mut flag) = self.fail_event_writes.lock() {
            *flag = fail;
        }
    }

    pub fn seed_calendars(&self, calendars: Vec<ProviderCalendar>) {
        if let Ok(mut list) = self.calendars.lock() {
            *list = calendars;
        }
    }

    pub fn created_events(&self) -> Vec<CalendarEventInput> {
        self.created_events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    pub fn deleted_events(&self) -> Vec<String> {
        self.deleted_events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    fn check_account(&self, account: &ConnectedAccount) -> anyhow::Result<()> {
        let failing = self
            .failing
            .lock()
            .ok()
            .and_then(|map| map.get(&account.id).copied())
            .unwrap_or(false);
        if failing {
            Err(anyhow!("account {} is unreachable", account.id))
        } else {
            Ok(())
        }
    }
}

#[async_trait::async_trait]
impl ICalendarGateway for StubCalendarGateway {
    async fn freebusy(
        &self,
        account: &ConnectedAccount,
        query: FreeBusyProviderQuery,
    ) -> anyhow::Result<Vec<BusyBlock>> {
        self.check_account(account)?;

        let mut blocks = self
            .busy
            .lock()
            .ok()
            .and_then(|busy| busy.get(&account.id).cloned())
            .unwrap_or_default();
        if query.include_tentative {
            blocks.extend(
                self.tentative
                    .lock()
                    .ok()
                    .and_then(|tentative| tentative.get(&account.id).cloned())
                    .unwrap_or_default(),
            );
        }

        // Clip to the requested window, as the real provider does
        blocks.retain(|b| b.start_time < query.time_max && b.end_time > query.time_min);
        for block in &mut blocks {
            block.start_time = block.start_time.max(query.time_min);
            block.end_time = block.end_time.min(query.time_max);
        }
        Ok(blocks)
    }

    async fn create_event(
        &self,
        account: &ConnectedAccount,
        input: CalendarEventInput,
    ) -> anyhow::Result<CreatedCalendarEvent> {
        self.check_account(account)?;
        if self.fail_event_writes.lock().map(|f| *f).unwrap_or(false) {
            return Err(anyhow!("event write rejected"));
        }

        let meeting_url = input
            .with_meeting_link
            .then(|| format!("https://meet.example.com/{}", input.uid));
        let event_ref = format!("evt-{}", input.uid);
        if let Ok(mut events) = self.created_events.lock() {
            events.push(input);
        }
        Ok(CreatedCalendarEvent {
            event_ref,
            meeting_url,
        })
    }

    async fn move_event(
        &self,
        account: &ConnectedAccount,
        _calendar_external_id: &str,
        _event_ref: &str,
        _start_time: DateTime<Utc>,
        _end_time: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        self.check_account(account)?;
        if self.fail_event_writes.lock().map(|f| *f).unwrap_or(false) {
            return Err(anyhow!("event write rejected"));
        }
        Ok(())
    }

    async fn delete_event(
        &self,
        account: &ConnectedAccount,
        _calendar_external_id: &str,
        event_ref: &str,
    ) -> anyhow::Result<()> {
        self.check_account(account)?;
        if let Ok(mut deleted) = self.deleted_events.lock() {
            deleted.push(event_ref.to_string());
        }
        Ok(())
    }

    async fn list_calendars(
        &self,
        account: &ConnectedAccount,
    ) -> anyhow::Result<Vec<ProviderCalendar>> {
        self.check_account(account)?;
        Ok(self
            .calendars
            .lock()
            .map(|list| list.clone())
            .unwrap_or_default())
    }
}
