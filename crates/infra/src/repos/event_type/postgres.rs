use serde_json::Value;
use slotbook_domain::{CustomQuestion, EventType, ID, WorkingHours};
use sqlx::{
    FromRow,
    PgPool,
    types::{Json, Uuid},
};
use tracing::{error, instrument};

use super::IEventTypeRepo;

#[derive(Debug)]
pub struct PostgresEventTypeRepo {
    pool: PgPool,
}

impl PostgresEventTypeRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct EventTypeRaw {
    event_type_uid: Uuid,
    host_uid: Uuid,
    slug: String,
    name: String,
    description: Option<String>,
    duration_minutes: i64,
    buffer_before_minutes: i64,
    buffer_after_minutes: i64,
    minimum_notice_minutes: i64,
    scheduling_window_days: i64,
    slot_interval_minutes: i64,
    working_hours: Value,
    participating_calendars: Vec<Uuid>,
    destination_calendar: Option<Uuid>,
    location_kind: String,
    include_tentative_busy: bool,
    requires_confirmation: bool,
    custom_questions: Value,
    active: bool,
}

impl TryFrom<EventTypeRaw> for EventType {
    type Error = anyhow::Error;

    fn try_from(e: EventTypeRaw) -> anyhow::Result<Self> {
        let working_hours: Vec<WorkingHours> = serde_json::from_value(e.working_hours)?;
        let custom_questions: Vec<CustomQuestion> = serde_json::from_value(e.custom_questions)?;

        Ok(Self {
            id: e.event_type_uid.into(),
            host_id: e.host_uid.into(),
            slug: e.slug,
            name: e.name,
            description: e.description,
            duration_minutes: e.duration_minutes,
            buffer_before_minutes: e.buffer_before_minutes,
            buffer_after_minutes: e.buffer_after_minutes,
            minimum_notice_minutes: e.minimum_notice_minutes,
            scheduling_window_days: e.scheduling_window_days,
            slot_interval_minutes: e.slot_interval_minutes,
            working_hours,
            participating_calendars: e
                .participating_calendars
                .into_iter()
                .map(Into::into)
                .collect(),
            destination_calendar: e.destination_calendar.map(Into::into),
            location_kind: e.location_kind.try_into()?,
            include_tentative_busy: e.include_tentative_busy,
            requires_confirmation: e.requires_confirmation,
            custom_questions,
            active: e.active,
        })
    }
}

#[async_trait::async_trait]
impl IEventTypeRepo for PostgresEventTypeRepo {
    #[instrument(skip(self, event_type))]
    async fn insert(&self, event_type: &EventType) -> anyhow::Result<()> {
        let location_kind: String = event_type.location_kind.clone().into();
        let participating: Vec<Uuid> = event_type
            .participating_calendars
            .iter()
            .map(|id| *id.as_ref())
            .collect();
        sqlx::query(
            r#"
            INSERT INTO event_types(
                event_type_uid,
                host_uid,
                slug,
                name,
                description,
                duration_minutes,
                buffer_before_minutes,
                buffer_after_minutes,
                minimum_notice_minutes,
                scheduling_window_days,
                slot_interval_minutes,
                working_hours,
                participating_calendars,
                destination_calendar,
                location_kind,
                include_tentative_busy,
                requires_confirmation,
                custom_questions,
                active
            )
            VALUES($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19)
            "#,
        )
        .bind(*event_type.id.as_ref())
        .bind(*event_type.host_id.as_ref())
        .bind(&event_type.slug)
        .bind(&event_type.name)
        .bind(&event_type.description)
        .bind(event_type.duration_minutes)
        .bind(event_type.buffer_before_minutes)
        .bind(event_type.buffer_after_minutes)
        .bind(event_type.minimum_notice_minutes)
        .bind(event_type.scheduling_window_days)
        .bind(event_type.slot_interval_minutes)
        .bind(Json(&event_type.working_hours))
        .bind(&participating)
        .bind(event_type.destination_calendar.as_ref().map(|id| *id.as_ref()))
        .bind(location_kind)
        .bind(event_type.include_tentative_busy)
        .bind(event_type.requires_confirmation)
        .bind(Json(&event_type.custom_questions))
        .bind(event_type.active)
        .execute(&self.pool)
        .await
        .inspect_err(|err| {
            error!(
                "Unable to insert event type: {:?}. DB returned error: {:?}",
                event_type, err
            );
        })?;

        Ok(())
    }

    #[instrument(skip(self, event_type))]
    async fn save(&self, event_type: &EventType) -> anyhow::Result<()> {
        let location_kind: String = event_type.location_kind.clone().into();
        let participating: Vec<Uuid> = event_type
            .participating_calendars
            .iter()
            .map(|id| *id.as_ref())
            .collect();
        sqlx::query(
            r#"
            UPDATE event_types
            SET slug = $2,
                name = $3,
                description = $4,
                duration_minutes = $5,
                buffer_before_minutes = $6,
                buffer_after_minutes = $7,
                minimum_notice_minutes = $8,
                scheduling_window_days = $9,
                slot_interval_minutes = $10,
                working_hours = $11,
                participating_calendars = $12,
                destination_calendar = $13,
                location_kind = $14,
                include_tentative_busy = $15,
                requires_confirmation = $16,
                custom_questions = $17,
                active = $18
            WHERE event_type_uid = $1
            "#,
        )
        .bind(*event_type.id.as_ref())
        .bind(&event_type.slug)
        .bind(&event_type.name)
        .bind(&event_type.description)
        .bind(event_type.duration_minutes)
        .bind(event_type.buffer_before_minutes)
        .bind(event_type.buffer_after_minutes)
        .bind(event_type.minimum_notice_minutes)
        .bind(event_type.scheduling_window_days)
        .bind(event_type.slot_interval_minutes)
        .bind(Json(&event_type.working_hours))
        .bind(&participating)
        .bind(event_type.destination_calendar.as_ref().map(|id| *id.as_ref()))
        .bind(location_kind)
        .bind(event_type.include_tentative_busy)
        .bind(event_type.requires_confirmation)
        .bind(Json(&event_type.custom_questions))
        .bind(event_type.active)
        .execute(&self.pool)
        .await
        .inspect_err(|err| {
            error!(
                "Unable to save event type: {:?}. DB returned error: {:?}",
                event_type, err
            );
        })?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn find(&self, event_type_id: &ID) -> anyhow::Result<Option<EventType>> {
        let res: Option<EventTypeRaw> = sqlx::query_as(
            r#"
            SELECT * FROM event_types
            WHERE event_type_uid = $1
            "#,
        )
        .bind(*event_type_id.as_ref())
        .fetch_optional(&self.pool)
        .await
        .inspect_err(|err| {
            error!(
                "Unable to find event type {}. DB returned error: {:?}",
                event_type_id, err
            );
        })?;

        res.map(TryInto::try_into).transpose()
    }

    #[instrument(skip(self))]
    async fn find_by_host(&self, host_id: &ID) -> anyhow::Result<Vec<EventType>> {
        let res: Vec<EventTypeRaw> = sqlx::query_as(
            r#"
            SELECT * FROM event_types
            WHERE host_uid = $1
            "#,
        )
        .bind(*host_id.as_ref())
        .fetch_all(&self.pool)
        .await
        .inspect_err(|err| {
            error!(
                "Unable to find event types for host {}. DB returned error: {:?}",
                host_id, err
            );
        })?;

        res.into_iter().map(TryInto::try_into).collect()
    }

    #[instrument(skip(self))]
    async fn find_by_host_and_slug(
        &self,
        host_id: &ID,
        slug: &str,
    ) -> anyhow::Result<Option<EventType>> {
        let res: Option<EventTypeRaw> = sqlx::query_as(
            r#"
            SELECT * FROM event_types
            WHERE host_uid = $1 AND slug = $2
            "#,
        )
        .bind(*host_id.as_ref())
        .bind(slug)
        .fetch_optional(&self.pool)
        .await
        .inspect_err(|err| {
            error!(
                "Unable to find event type for host {}. DB returned error: {:?}",
                host_id, err
            );
        })?;

        res.map(TryInto::try_into).transpose()
    }
}
