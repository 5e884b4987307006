mod inmemory;
mod postgres;

pub use inmemory::InMemoryAccountRepo;
pub use postgres::PostgresAccountRepo;
use slotbook_domain::{ConnectedAccount, ID};

#[async_trait::async_trait]
pub trait IAccountRepo: Send + Sync {
    async fn insert(&self, account: &ConnectedAccount) -> anyhow::Result<()>;
    async fn save(&self, account: &ConnectedAccount) -> anyhow::Result<()>;
    async fn find(&self, account_id: &ID) -> anyhow::Result<Option<ConnectedAccount>>;
    async fn find_by_host(&self, host_id: &ID) -> anyhow::Result<Vec<ConnectedAccount>>;
    async fn find_by_host_and_identity(
        &self,
        host_id: &ID,
        external_identity: &str,
    ) -> anyhow::Result<Option<ConnectedAccount>>;
}

#[cfg(test)]
mod tests {
    use chrono::DateTime;
    use slotbook_domain::REQUIRED_OAUTH_SCOPES;

    use super::*;

    fn account(host_id: &ID, identity: &str) -> ConnectedAccount {
        ConnectedAccount {
            id: Default::default(),
            host_id: host_id.clone(),
            external_identity: identity.into(),
            sealed_access_token: "sealed-access".into(),
            sealed_refresh_token: "sealed-refresh".into(),
            access_token_expires_at: DateTime::from_timestamp_millis(0).unwrap(),
            scopes: REQUIRED_OAUTH_SCOPES.iter().map(|s| s.to_string()).collect(),
            valid: true,
            failed_busy_fetches: 0,
            last_synced_at: None,
        }
    }

    #[tokio::test]
    async fn finds_accounts_by_host_and_identity() {
        let repo = InMemoryAccountRepo::new();
        let host_id = ID::default();
        let a1 = account(&host_id, "work@example.com");
        let a2 = account(&host_id, "personal@example.com");
        let other = account(&ID::default(), "work@example.com");

        repo.insert(&a1).await.unwrap();
        repo.insert(&a2).await.unwrap();
        repo.insert(&other).await.unwrap();

        assert_eq!(repo.find_by_host(&host_id).await.unwrap().len(), 2);
        let found = repo
            .find_by_host_and_identity(&host_id, "work@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, a1.id);
    }

    #[tokio::test]
    async fn save_updates_validity() {
        let repo = InMemoryAccountRepo::new();
        let mut acc = account(&ID::default(), "work@example.com");
        repo.insert(&acc).await.unwrap();

        acc.valid = false;
        acc.failed_busy_fetches = 3;
        repo.save(&acc).await.unwrap();

        let found = repo.find(&acc.id).await.unwrap().unwrap();
        assert!(!found.valid);
        assert_eq!(found.failed_busy_fetches, 3);
    }
}
