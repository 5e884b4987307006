use std::{collections::HashMap, sync::Mutex};

use slotbook_domain::{Host, ID};

use super::IHostRepo;

#[derive(Default)]
pub struct InMemoryHostRepo {
    hosts: Mutex<HashMap<ID, Host>>,
}

impl InMemoryHostRepo {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_lock<T>(&self, f: impl FnOnce(&mut HashMap<ID, Host>) -> T) -> T {
        let mut guard = match self.hosts.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut guard)
    }
}

#[async_trait::async_trait]
impl IHostRepo for InMemoryHostRepo {
    async fn insert(&self, host: &Host) -> anyhow::Result<()> {
        self.with_lock(|hosts| hosts.insert(host.id.clone(), host.clone()));
        Ok(())
    }

    async fn save(&self, host: &Host) -> anyhow::Result<()> {
        self.insert(host).await
    }

    async fn find(&self, host_id: &ID) -> anyhow::Result<Option<Host>> {
        Ok(self.with_lock(|hosts| hosts.get(host_id).cloned()))
    }
}
