mod inmemory;
mod postgres;

pub use inmemory::InMemoryCalendarRepo;
pub use postgres::PostgresCalendarRepo;
use slotbook_domain::{Calendar, ID};

#[async_trait::async_trait]
pub trait ICalendarRepo: Send + Sync {
    async fn insert(&self, calendar: &Calendar) -> anyhow::Result<()>;
    async fn save(&self, calendar: &Calendar) -> anyhow::Result<()>;
    async fn find(&self, calendar_id: &ID) -> anyhow::Result<Option<Calendar>>;
    async fn find_multiple(&self, calendar_ids: Vec<&ID>) -> anyhow::Result<Vec<Calendar>>;
    async fn find_by_account(&self, account_id: &ID) -> anyhow::Result<Vec<Calendar>>;
    async fn delete(&self, calendar_id: &ID) -> anyhow::Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn calendar(account_id: &ID, external_id: &str) -> Calendar {
        Calendar {
            id: Default::default(),
            account_id: account_id.clone(),
            external_id: external_id.into(),
            name: external_id.into(),
            writable: true,
            selected_for_busy: true,
        }
    }

    #[tokio::test]
    async fn create_find_and_delete() {
        let repo = InMemoryCalendarRepo::new();
        let account_id = ID::default();
        let c1 = calendar(&account_id, "primary");
        let c2 = calendar(&account_id, "team");

        repo.insert(&c1).await.unwrap();
        repo.insert(&c2).await.unwrap();

        assert_eq!(repo.find_by_account(&account_id).await.unwrap().len(), 2);
        let found = repo
            .find_multiple(vec![&c1.id, &c2.id])
            .await
            .unwrap();
        assert_eq!(found.len(), 2);

        repo.delete(&c1.id).await.unwrap();
        assert!(repo.find(&c1.id).await.unwrap().is_none());
        assert_eq!(repo.find_by_account(&account_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn save_updates_selection() {
        let repo = InMemoryCalendarRepo::new();
        let mut cal = calendar(&ID::default(), "primary");
        repo.insert(&cal).await.unwrap();

        cal.selected_for_busy = false;
        repo.save(&cal).await.unwrap();
        assert!(!repo.find(&cal.id).await.unwrap().unwrap().selected_for_busy);
    }
}
