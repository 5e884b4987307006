use std::{collections::HashMap, sync::Mutex};

use slotbook_domain::{EventType, ID};

use super::IEventTypeRepo;

#[derive(Default)]
pub struct InMemoryEventTypeRepo {
    event_types: Mutex<HashMap<ID, EventType>>,
}

impl InMemoryEventTypeRepo {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_lock<T>(&self, f: impl FnOnce(&mut HashMap<ID, EventType>) -> T) -> T {
        let mut guard = match self.event_types.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut guard)
    }
}

#[async_trait::async_trait]
impl IEventTypeRepo for InMemoryEventTypeRepo {
    async fn insert(&self, event_type: &EventType) -> anyhow::Result<()> {
        self.with_lock(|event_types| {
            event_types.insert(event_type.id.clone(), event_type.clone())
        });
        Ok(())
    }

    async fn save(&self, event_type: &EventType) -> anyhow::Result<()> {
        self.insert(event_type).await
    }

    async fn find(&self, event_type_id: &ID) -> anyhow::Result<Option<EventType>> {
        Ok(self.with_lock(|event_types| event_types.get(event_type_id).cloned()))
    }

    async fn find_by_host(&self, host_id: &ID) -> anyhow::Result<Vec<EventType>> {
        Ok(self.with_lock(|event_types| {
            event_types
                .values()
                .filter(|et| &et.host_id == host_id)
                .cloned()
                .collect()
        }))
    }

    async fn find_by_host_and_slug(
        &self,
        host_id: &ID,
        slug: &str,
    ) -> anyhow::Result<Option<EventType>> {
        Ok(self.with_lock(|event_types| {
            event_types
                .values()
                .find(|et| &et.host_id == host_id && et.slug == slug)
                .cloned()
        }))
    }
}
