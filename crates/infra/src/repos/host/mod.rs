mod inmemory;
mod postgres;

pub use inmemory::InMemoryHostRepo;
pub use postgres::PostgresHostRepo;
use slotbook_domain::{Host, ID};

#[async_trait::async_trait]
pub trait IHostRepo: Send + Sync {
    async fn insert(&self, host: &Host) -> anyhow::Result<()>;
    async fn save(&self, host: &Host) -> anyhow::Result<()>;
    async fn find(&self, host_id: &ID) -> anyhow::Result<Option<Host>>;
}

#[cfg(test)]
mod tests {
    use slotbook_domain::Entity;

    use super::*;

    #[tokio::test]
    async fn insert_find_and_update() {
        let repo = InMemoryHostRepo::new();
        let mut host = Host::new(
            "Grace".into(),
            "grace@example.com".into(),
            chrono_tz::America::New_York,
        );

        repo.insert(&host).await.unwrap();
        let found = repo.find(&host.id()).await.unwrap().unwrap();
        assert_eq!(found.email, "grace@example.com");

        host.timezone = chrono_tz::Europe::Oslo;
        repo.save(&host).await.unwrap();
        let found = repo.find(&host.id()).await.unwrap().unwrap();
        assert_eq!(found.timezone, chrono_tz::Europe::Oslo);

        assert!(repo.find(&ID::default()).await.unwrap().is_none());
    }
}
