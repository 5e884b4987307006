use slotbook_domain::{Host, ID};
use sqlx::{FromRow, PgPool, types::Uuid};
use tracing::{error, instrument};

use super::IHostRepo;

#[derive(Debug)]
pub struct PostgresHostRepo {
    pool: PgPool,
}

impl PostgresHostRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct HostRaw {
    host_uid: Uuid,
    name: String,
    email: String,
    timezone: String,
}

impl TryFrom<HostRaw> for Host {
    type Error = anyhow::Error;

    fn try_from(h: HostRaw) -> anyhow::Result<Self> {
        Ok(Self {
            id: h.host_uid.into(),
            name: h.name,
            email: h.email,
            timezone: h
                .timezone
                .parse()
                .map_err(|_| anyhow::anyhow!("Invalid timezone stored for host"))?,
        })
    }
}

#[async_trait::async_trait]
impl IHostRepo for PostgresHostRepo {
    #[instrument(skip(self))]
    async fn insert(&self, host: &Host) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO hosts(host_uid, name, email, timezone)
            VALUES($1, $2, $3, $4)
            "#,
        )
        .bind(*host.id.as_ref())
        .bind(&host.name)
        .bind(&host.email)
        .bind(host.timezone.to_string())
        .execute(&self.pool)
        .await
        .inspect_err(|err| {
            error!("Unable to insert host: {:?}. DB returned error: {:?}", host, err);
        })?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn save(&self, host: &Host) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE hosts
            SET name = $2, email = $3, timezone = $4
            WHERE host_uid = $1
            "#,
        )
        .bind(*host.id.as_ref())
        .bind(&host.name)
        .bind(&host.email)
        .bind(host.timezone.to_string())
        .execute(&self.pool)
        .await
        .inspect_err(|err| {
            error!("Unable to save host: {:?}. DB returned error: {:?}", host, err);
        })?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn find(&self, host_id: &ID) -> anyhow::Result<Option<Host>> {
        let res: Option<HostRaw> = sqlx::query_as(
            r#"
            SELECT * FROM hosts
            WHERE host_uid = $1
            "#,
        )
        .bind(*host_id.as_ref())
        .fetch_optional(&self.pool)
        .await
        .inspect_err(|err| {
            error!(
                "Unable to find host with id: {}. DB returned error: {:?}",
                host_id, err
            );
        })?;

        res.map(TryInto::try_into).transpose()
    }
}
