use std::{collections::HashMap, sync::Mutex};

use slotbook_domain::{ConnectedAccount, ID};

use super::IAccountRepo;

#[derive(Default)]
pub struct InMemoryAccountRepo {
    accounts: Mutex<HashMap<ID, ConnectedAccount>>,
}

impl InMemoryAccountRepo {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_lock<T>(&self, f: impl FnOnce(&mut HashMap<ID, ConnectedAccount>) -> T) -> T {
        let mut guard = match self.accounts.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut guard)
    }
}

#[async_trait::async_trait]
impl IAccountRepo for InMemoryAccountRepo {
    async fn insert(&self, account: &ConnectedAccount) -> anyhow::Result<()> {
        self.with_lock(|accounts| accounts.insert(account.id.clone(), account.clone()));
        Ok(())
    }

    async fn save(&self, account: &ConnectedAccount) -> anyhow::Result<()> {
        self.insert(account).await
    }

    async fn find(&self, account_id: &ID) -> anyhow::Result<Option<ConnectedAccount>> {
        Ok(self.with_lock(|accounts| accounts.get(account_id).cloned()))
    }

    async fn find_by_host(&self, host_id: &ID) -> anyhow::Result<Vec<ConnectedAccount>> {
        Ok(self.with_lock(|accounts| {
            accounts
                .values()
                .filter(|a| &a.host_id == host_id)
                .cloned()
                .collect()
        }))
    }

    async fn find_by_host_and_identity(
        &self,
        host_id: &ID,
        external_identity: &str,
    ) -> anyhow::Result<Option<ConnectedAccount>> {
        Ok(self.with_lock(|accounts| {
            accounts
                .values()
                .find(|a| &a.host_id == host_id && a.external_identity == external_identity)
                .cloned()
        }))
    }
}
