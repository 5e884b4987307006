use chrono::{DateTime, Utc};
use slotbook_domain::{ConnectedAccount, ID};
use sqlx::{FromRow, PgPool, types::Uuid};
use tracing::{error, instrument};

use super::IAccountRepo;

#[derive(Debug)]
pub struct PostgresAccountRepo {
    pool: PgPool,
}

impl PostgresAccountRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct AccountRaw {
    account_uid: Uuid,
    host_uid: Uuid,
    external_identity: String,
    sealed_access_token: String,
    sealed_refresh_token: String,
    access_token_expires_at: DateTime<Utc>,
    scopes: Vec<String>,
    valid: bool,
    failed_busy_fetches: i64,
    last_synced_at: Option<DateTime<Utc>>,
}

impl From<AccountRaw> for ConnectedAccount {
    fn from(a: AccountRaw) -> Self {
        Self {
            id: a.account_uid.into(),
            host_id: a.host_uid.into(),
            external_identity: a.external_identity,
            sealed_access_token: a.sealed_access_token,
            sealed_refresh_token: a.sealed_refresh_token,
            access_token_expires_at: a.access_token_expires_at,
            scopes: a.scopes,
            valid: a.valid,
            failed_busy_fetches: a.failed_busy_fetches,
            last_synced_at: a.last_synced_at,
        }
    }
}

#[async_trait::async_trait]
impl IAccountRepo for PostgresAccountRepo {
    #[instrument(skip(self, account))]
    async fn insert(&self, account: &ConnectedAccount) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO connected_accounts(
                account_uid,
                host_uid,
                external_identity,
                sealed_access_token,
                sealed_refresh_token,
                access_token_expires_at,
                scopes,
                valid,
                failed_busy_fetches,
                last_synced_at
            )
            VALUES($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(*account.id.as_ref())
        .bind(*account.host_id.as_ref())
        .bind(&account.external_identity)
        .bind(&account.sealed_access_token)
        .bind(&account.sealed_refresh_token)
        .bind(account.access_token_expires_at)
        .bind(&account.scopes)
        .bind(account.valid)
        .bind(account.failed_busy_fetches)
        .bind(account.last_synced_at)
        .execute(&self.pool)
        .await
        .inspect_err(|err| {
            error!(
                "Unable to insert connected account for host {}. DB returned error: {:?}",
                account.host_id, err
            );
        })?;

        Ok(())
    }

    #[instrument(skip(self, account))]
    async fn save(&self, account: &ConnectedAccount) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE connected_accounts
            SET external_identity = $2,
                sealed_access_token = $3,
                sealed_refresh_token = $4,
                access_token_expires_at = $5,
                scopes = $6,
                valid = $7,
                failed_busy_fetches = $8,
                last_synced_at = $9
            WHERE account_uid = $1
            "#,
        )
        .bind(*account.id.as_ref())
        .bind(&account.external_identity)
        .bind(&account.sealed_access_token)
        .bind(&account.sealed_refresh_token)
        .bind(account.access_token_expires_at)
        .bind(&account.scopes)
        .bind(account.valid)
        .bind(account.failed_busy_fetches)
        .bind(account.last_synced_at)
        .execute(&self.pool)
        .await
        .inspect_err(|err| {
            error!(
                "Unable to save connected account {}. DB returned error: {:?}",
                account.id, err
            );
        })?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn find(&self, account_id: &ID) -> anyhow::Result<Option<ConnectedAccount>> {
        let res: Option<AccountRaw> = sqlx::query_as(
            r#"
            SELECT * FROM connected_accounts
            WHERE account_uid = $1
            "#,
        )
        .bind(*account_id.as_ref())
        .fetch_optional(&self.pool)
        .await
        .inspect_err(|err| {
            error!(
                "Unable to find connected account {}. DB returned error: {:?}",
                account_id, err
            );
        })?;

        Ok(res.map(Into::into))
    }

    #[instrument(skip(self))]
    async fn find_by_host(&self, host_id: &ID) -> anyhow::Result<Vec<ConnectedAccount>> {
        let res: Vec<AccountRaw> = sqlx::query_as(
            r#"
            SELECT * FROM connected_accounts
            WHERE host_uid = $1
            "#,
        )
        .bind(*host_id.as_ref())
        .fetch_all(&self.pool)
        .await
        .inspect_err(|err| {
            error!(
                "Unable to find connected accounts for host {}. DB returned error: {:?}",
                host_id, err
            );
        })?;

        Ok(res.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self))]
    async fn find_by_host_and_identity(
        &self,
        host_id: &ID,
        external_identity: &str,
    ) -> anyhow::Result<Option<ConnectedAccount>> {
        let res: Option<AccountRaw> = sqlx::query_as(
            r#"
            SELECT * FROM connected_accounts
            WHERE host_uid = $1 AND external_identity = $2
            "#,
        )
        .bind(*host_id.as_ref())
        .bind(external_identity)
        .fetch_optional(&self.pool)
        .await
        .inspect_err(|err| {
            error!(
                "Unable to find connected account for host {}. DB returned error: {:?}",
                host_id, err
            );
        })?;

        Ok(res.map(Into::into))
    }
}
