mod account;
mod booking;
mod calendar;
mod event_type;
mod host;

use std::sync::Arc;

pub use account::IAccountRepo;
use account::{InMemoryAccountRepo, PostgresAccountRepo};
use anyhow::Context;
pub use booking::{BookingWriteError, IBookingRepo};
use booking::{InMemoryBookingRepo, PostgresBookingRepo};
pub use calendar::ICalendarRepo;
use calendar::{InMemoryCalendarRepo, PostgresCalendarRepo};
pub use event_type::IEventTypeRepo;
use event_type::{InMemoryEventTypeRepo, PostgresEventTypeRepo};
pub use host::IHostRepo;
use host::{InMemoryHostRepo, PostgresHostRepo};
use sqlx::postgres::PgPoolOptions;
use tracing::info;

#[derive(Clone)]
pub struct Repos {
    pub hosts: Arc<dyn IHostRepo>,
    pub accounts: Arc<dyn IAccountRepo>,
    pub calendars: Arc<dyn ICalendarRepo>,
    pub event_types: Arc<dyn IEventTypeRepo>,
    pub bookings: Arc<dyn IBookingRepo>,
}

impl Repos {
    pub async fn create_postgres(connection_string: &str) -> anyhow::Result<Self> {
        info!("DB CHECKING CONNECTION ...");
        let pool = PgPoolOptions::new()
            .max_connections(slotbook_utils::config::APP_CONFIG.pg.max_connections)
            .connect(connection_string)
            .await
            .context(format!(
                "Failed to connect to PG url '{}'",
                remove_password_from_url(connection_string)?
            ))?;
        info!("DB CHECKING CONNECTION ... [done]");

        if !slotbook_utils::config::APP_CONFIG.pg.skip_migrations {
            info!("DB EXECUTING MIGRATION ...");
            sqlx::migrate!().run(&pool).await?;
            info!("DB EXECUTING MIGRATION ... [done]");
        } else {
            info!("DB MIGRATION SKIPPED");
        }

        Ok(Self {
            hosts: Arc::new(PostgresHostRepo::new(pool.clone())),
            accounts: Arc::new(PostgresAccountRepo::new(pool.clone())),
            calendars: Arc::new(PostgresCalendarRepo::new(pool.clone())),
            event_types: Arc::new(PostgresEventTypeRepo::new(pool.clone())),
            bookings: Arc::new(PostgresBookingRepo::new(pool)),
        })
    }

    /// Repositories backed by process memory, with the same invariants as
    /// the Postgres schema. Used by tests and local development without a
    /// database.
    pub fn create_inmemory() -> Self {
        Self {
            hosts: Arc::new(InMemoryHostRepo::new()),
            accounts: Arc::new(InMemoryAccountRepo::new()),
            calendars: Arc::new(InMemoryCalendarRepo::new()),
            event_types: Arc::new(InMemoryEventTypeRepo::new()),
            bookings: Arc::new(InMemoryBookingRepo::new()),
        }
    }
}

fn remove_password_from_url(connection_string: &str) -> anyhow::Result<String> {
    let mut url = match url::Url::parse(connection_string) {
        Ok(url) => url,
        // If the connection string is not a valid URL, return the connection string as is
        Err(_) => return Ok(connection_string.to_string()),
    };
    #[allow(clippy::unwrap_used)]
    url.set_password(Some("*********")).unwrap();
    Ok(url.to_string())
}
