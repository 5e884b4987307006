use std::{collections::HashMap, sync::Mutex};

use slotbook_domain::{Calendar, ID};

use super::ICalendarRepo;

#[derive(Default)]
pub struct InMemoryCalendarRepo {
    calendars: Mutex<HashMap<ID, Calendar>>,
}

impl InMemoryCalendarRepo {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_lock<T>(&self, f: impl FnOnce(&mut HashMap<ID, Calendar>) -> T) -> T {
        let mut guard = match self.calendars.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut guard)
    }
}

#[async_trait::async_trait]
impl ICalendarRepo for InMemoryCalendarRepo {
    async fn insert(&self, calendar: &Calendar) -> anyhow::Result<()> {
        self.with_lock(|calendars| calendars.insert(calendar.id.clone(), calendar.clone()));
        Ok(())
    }

    async fn save(&self, calendar: &Calendar) -> anyhow::Result<()> {
        self.insert(calendar).await
    }

    async fn find(&self, calendar_id: &ID) -> anyhow::Result<Option<Calendar>> {
        Ok(self.with_lock(|calendars| calendars.get(calendar_id).cloned()))
    }

    async fn find_multiple(&self, calendar_ids: Vec<&ID>) -> anyhow::Result<Vec<Calendar>> {
        Ok(self.with_lock(|calendars| {
            calendar_ids
                .into_iter()
                .filter_map(|id| calendars.get(id).cloned())
                .collect()
        }))
    }

    async fn find_by_account(&self, account_id: &ID) -> anyhow::Result<Vec<Calendar>> {
        Ok(self.with_lock(|calendars| {
            calendars
                .values()
                .filter(|c| &c.account_id == account_id)
                .cloned()
                .collect()
        }))
    }

    async fn delete(&self, calendar_id: &ID) -> anyhow::Result<()> {
        self.with_lock(|calendars| calendars.remove(calendar_id));
        Ok(())
    }
}
