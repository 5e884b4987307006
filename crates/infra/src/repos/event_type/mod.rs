mod inmemory;
mod postgres;

pub use inmemory::InMemoryEventTypeRepo;
pub use postgres::PostgresEventTypeRepo;
use slotbook_domain::{EventType, ID};

#[async_trait::async_trait]
pub trait IEventTypeRepo: Send + Sync {
    async fn insert(&self, event_type: &EventType) -> anyhow::Result<()>;
    async fn save(&self, event_type: &EventType) -> anyhow::Result<()>;
    async fn find(&self, event_type_id: &ID) -> anyhow::Result<Option<EventType>>;
    async fn find_by_host(&self, host_id: &ID) -> anyhow::Result<Vec<EventType>>;
    async fn find_by_host_and_slug(
        &self,
        host_id: &ID,
        slug: &str,
    ) -> anyhow::Result<Option<EventType>>;
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveTime, Weekday};
    use slotbook_domain::{LocationKind, WorkingHours};

    use super::*;

    fn event_type(host_id: &ID, slug: &str) -> EventType {
        EventType {
            id: Default::default(),
            host_id: host_id.clone(),
            slug: slug.into(),
            name: slug.into(),
            description: None,
            duration_minutes: 30,
            buffer_before_minutes: 0,
            buffer_after_minutes: 0,
            minimum_notice_minutes: 0,
            scheduling_window_days: 14,
            slot_interval_minutes: 15,
            working_hours: vec![WorkingHours {
                day: Weekday::Mon,
                start: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                end: NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
            }],
            participating_calendars: Vec::new(),
            destination_calendar: None,
            location_kind: LocationKind::Video,
            include_tentative_busy: false,
            requires_confirmation: false,
            custom_questions: Vec::new(),
            active: true,
        }
    }

    #[tokio::test]
    async fn finds_by_host_and_slug() {
        let repo = InMemoryEventTypeRepo::new();
        let host_id = ID::default();
        let et = event_type(&host_id, "intro-call");
        repo.insert(&et).await.unwrap();
        repo.insert(&event_type(&host_id, "deep-dive")).await.unwrap();

        let found = repo
            .find_by_host_and_slug(&host_id, "intro-call")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, et.id);
        assert!(
            repo.find_by_host_and_slug(&ID::default(), "intro-call")
                .await
                .unwrap()
                .is_none()
        );
        assert_eq!(repo.find_by_host(&host_id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn save_deactivates() {
        let repo = InMemoryEventTypeRepo::new();
        let mut et = event_type(&ID::default(), "intro-call");
        repo.insert(&et).await.unwrap();

        et.active = false;
        repo.save(&et).await.unwrap();
        assert!(!repo.find(&et.id).await.unwrap().unwrap().active);
    }
}
