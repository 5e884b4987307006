use slotbook_domain::{Calendar, ID};
use sqlx::{FromRow, PgPool, types::Uuid};
use tracing::{error, instrument};

use super::ICalendarRepo;

#[derive(Debug)]
pub struct PostgresCalendarRepo {
    pool: PgPool,
}

impl PostgresCalendarRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct CalendarRaw {
    calendar_uid: Uuid,
    account_uid: Uuid,
    external_id: String,
    name: String,
    writable: bool,
    selected_for_busy: bool,
}

impl From<CalendarRaw> for Calendar {
    fn from(c: CalendarRaw) -> Self {
        Self {
            id: c.calendar_uid.into(),
            account_id: c.account_uid.into(),
            external_id: c.external_id,
            name: c.name,
            writable: c.writable,
            selected_for_busy: c.selected_for_busy,
        }
    }
}

#[async_trait::async_trait]
impl ICalendarRepo for PostgresCalendarRepo {
    #[instrument(skip(self))]
    async fn insert(&self, calendar: &Calendar) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO calendars(
                calendar_uid,
                account_uid,
                external_id,
                name,
                writable,
                selected_for_busy
            )
            VALUES($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(*calendar.id.as_ref())
        .bind(*calendar.account_id.as_ref())
        .bind(&calendar.external_id)
        .bind(&calendar.name)
        .bind(calendar.writable)
        .bind(calendar.selected_for_busy)
        .execute(&self.pool)
        .await
        .inspect_err(|err| {
            error!(
                "Unable to insert calendar: {:?}. DB returned error: {:?}",
                calendar, err
            );
        })?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn save(&self, calendar: &Calendar) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE calendars
            SET name = $2, writable = $3, selected_for_busy = $4
            WHERE calendar_uid = $1
            "#,
        )
        .bind(*calendar.id.as_ref())
        .bind(&calendar.name)
        .bind(calendar.writable)
        .bind(calendar.selected_for_busy)
        .execute(&self.pool)
        .await
        .inspect_err(|err| {
            error!(
                "Unable to save calendar: {:?}. DB returned error: {:?}",
                calendar, err
            );
        })?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn find(&self, calendar_id: &ID) -> anyhow::Result<Option<Calendar>> {
        let res: Option<CalendarRaw> = sqlx::query_as(
            r#"
            SELECT * FROM calendars
            WHERE calendar_uid = $1
            "#,
        )
        .bind(*calendar_id.as_ref())
        .fetch_optional(&self.pool)
        .await
        .inspect_err(|err| {
            error!(
                "Unable to find calendar {}. DB returned error: {:?}",
                calendar_id, err
            );
        })?;

        Ok(res.map(Into::into))
    }

    #[instrument(skip(self))]
    async fn find_multiple(&self, calendar_ids: Vec<&ID>) -> anyhow::Result<Vec<Calendar>> {
        let ids: Vec<Uuid> = calendar_ids.into_iter().map(|id| *id.as_ref()).collect();
        let res: Vec<CalendarRaw> = sqlx::query_as(
            r#"
            SELECT * FROM calendars
            WHERE calendar_uid = ANY($1)
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await
        .inspect_err(|err| {
            error!(
                "Unable to find calendars: {:?}. DB returned error: {:?}",
                ids, err
            );
        })?;

        Ok(res.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self))]
    async fn find_by_account(&self, account_id: &ID) -> anyhow::Result<Vec<Calendar>> {
        let res: Vec<CalendarRaw> = sqlx::query_as(
            r#"
            SELECT * FROM calendars
            WHERE account_uid = $1
            "#,
        )
        .bind(*account_id.as_ref())
        .fetch_all(&self.pool)
        .await
        .inspect_err(|err| {
            error!(
                "Unable to find calendars for account {}. DB returned error: {:?}",
                account_id, err
            );
        })?;

        Ok(res.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self))]
    async fn delete(&self, calendar_id: &ID) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            DELETE FROM calendars
            WHERE calendar_uid = $1
            "#,
        )
        .bind(*calendar_id.as_ref())
        .execute(&self.pool)
        .await
        .inspect_err(|err| {
            error!(
                "Unable to delete calendar {}. DB returned error: {:?}",
                calendar_id, err
            );
        })?;

        Ok(())
    }
}
