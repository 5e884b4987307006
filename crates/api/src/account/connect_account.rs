use actix_web::{HttpRequest, HttpResponse, web};
use chrono::TimeDelta;
use slotbook_api_structs::connect_account::{APIResponse, RequestBody};
use slotbook_domain::{Calendar, ConnectedAccount, ID};
use slotbook_infra::SlotbookContext;
use tracing::warn;
use validator::Validate;

use crate::{
    error::SlotbookError,
    shared::{
        auth::protect_host_route,
        rate_limit::{EndpointClass, RateLimiter},
        usecase::{UseCase, execute},
    },
};

pub async fn connect_account_controller(
    http_req: HttpRequest,
    body: web::Json<RequestBody>,
    ctx: web::Data<SlotbookContext>,
    limiter: web::Data<RateLimiter>,
) -> Result<HttpResponse, SlotbookError> {
    let host = protect_host_route(&http_req, &ctx).await?;

    // OAuth endpoints are limited per host, not per client address
    let decision = limiter.check(
        EndpointClass::Oauth,
        &host.id.to_string(),
        ctx.sys.get_timestamp(),
    );
    if !decision.allowed {
        return Err(SlotbookError::RateLimited {
            reset_at: decision.reset_at,
        });
    }

    let body = body.into_inner();
    body.validate()
        .map_err(|e| SlotbookError::BadClientData(e.to_string()))?;

    let usecase = ConnectAccountUseCase {
        host_id: host.id,
        external_identity: body.external_identity,
        access_token: body.access_token,
        refresh_token: body.refresh_token,
        expires_in: body.expires_in,
        scopes: body.scope.split(' ').map(String::from).collect(),
    };

    execute(usecase, &ctx)
        .await
        .map(|res| HttpResponse::Ok().json(APIResponse::new(res.account, res.calendars)))
        .map_err(SlotbookError::from)
}

/// Upserts a connected account from a completed OAuth exchange and
/// reconciles its calendar list from the provider.
pub(crate) struct ConnectAccountUseCase {
    pub host_id: ID,
    pub external_identity: String,
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    pub scopes: Vec<String>,
}

// Tokens never show up in debug output
impl std::fmt::Debug for ConnectAccountUseCase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectAccountUseCase")
            .field("host_id", &self.host_id)
            .field("external_identity", &self.external_identity)
            .field("scopes", &self.scopes)
            .finish()
    }
}

#[derive(Debug)]
pub(crate) struct ConnectedAccountWithCalendars {
    pub account: ConnectedAccount,
    pub calendars: Vec<Calendar>,
}

#[derive(Debug)]
pub(crate) enum UseCaseError {
    MissingScopes,
    StorageError,
    InternalError,
}

impl From<UseCaseError> for SlotbookError {
    fn from(e: UseCaseError) -> Self {
        match e {
            UseCaseError::MissingScopes => Self::BadClientData(
                "The granted scopes do not include calendar read and freebusy access".into(),
            ),
            UseCaseError::StorageError | UseCaseError::InternalError => Self::InternalError,
        }
    }
}

#[async_trait::async_trait]
impl UseCase for ConnectAccountUseCase {
    type Response = ConnectedAccountWithCalendars;

    type Error = UseCaseError;

    const NAME: &'static str = "ConnectAccount";

    async fn execute(&mut self, ctx: &SlotbookContext) -> Result<Self::Response, Self::Error> {
        let now = ctx.sys.get_timestamp();

        let sealed_access_token = ctx
            .token_vault
            .seal(&self.access_token)
            .map_err(|_| UseCaseError::InternalError)?;
        let sealed_refresh_token = ctx
            .token_vault
            .seal(&self.refresh_token)
            .map_err(|_| UseCaseError::InternalError)?;

        // Upsert on (host, identity): re-consent revalidates the account
        let existing = ctx
            .repos
            .accounts
            .find_by_host_and_identity(&self.host_id, &self.external_identity)
            .await
            .map_err(|_| UseCaseError::InternalError)?;

        let is_new = existing.is_none();
        let mut account = existing.unwrap_or_else(|| ConnectedAccount {
            id: Default::default(),
            host_id: self.host_id.clone(),
            external_identity: self.external_identity.clone(),
            sealed_access_token: String::new(),
            sealed_refresh_token: String::new(),
            access_token_expires_at: now,
            scopes: Vec::new(),
            valid: true,
            failed_busy_fetches: 0,
            last_synced_at: None,
        });

        account.sealed_access_token = sealed_access_token;
        account.sealed_refresh_token = sealed_refresh_token;
        account.access_token_expires_at = now + TimeDelta::seconds(self.expires_in);
        account.scopes = self.scopes.clone();
        account.valid = true;

        if !account.has_required_scopes() {
            return Err(UseCaseError::MissingScopes);
        }

        if is_new {
            ctx.repos
                .accounts
                .insert(&account)
                .await
                .map_err(|_| UseCaseError::StorageError)?;
        } else {
            ctx.repos
                .accounts
                .save(&account)
                .await
                .map_err(|_| UseCaseError::StorageError)?;
        }

        let calendars = self.reconcile_calendars(&mut account, ctx).await?;

        Ok(ConnectedAccountWithCalendars { account, calendars })
    }
}

impl ConnectAccountUseCase {
    /// Mirror the provider's calendar list: insert new ones, refresh known
    /// ones, drop the ones the provider no longer reports. Host-controlled
    /// selection survives the refresh.
    async fn reconcile_calendars(
        &self,
        account: &mut ConnectedAccount,
        ctx: &SlotbookContext,
    ) -> Result<Vec<Calendar>, UseCaseError> {
        let provider_calendars = match ctx.calendar_gateway.list_calendars(account).await {
            Ok(calendars) => calendars,
            Err(e) => {
                // The account is connected; reconciliation can run again on
                // the next connect
                warn!(
                    "Unable to list calendars for account {}: {:?}",
                    account.id, e
                );
                return ctx
                    .repos
                    .calendars
                    .find_by_account(&account.id)
                    .await
                    .map_err(|_| UseCaseError::InternalError);
            }
        };

        let known = ctx
            .repos
            .calendars
            .find_by_account(&account.id)
            .await
            .map_err(|_| UseCaseError::InternalError)?;

        let mut calendars = Vec::with_capacity(provider_calendars.len());
        for provider_calendar in &provider_calendars {
            match known
                .iter()
                .find(|c| c.external_id == provider_calendar.external_id)
            {
                Some(existing) => {
                    let mut updated = existing.clone();
                    updated.name = provider_calendar.name.clone();
                    updated.writable = provider_calendar.writable;
                    ctx.repos
                        .calendars
                        .save(&updated)
                        .await
                        .map_err(|_| UseCaseError::StorageError)?;
                    calendars.push(updated);
                }
                None => {
                    let calendar = Calendar {
                        id: Default::default(),
                        account_id: account.id.clone(),
                        external_id: provider_calendar.external_id.clone(),
                        name: provider_calendar.name.clone(),
                        writable: provider_calendar.writable,
                        selected_for_busy: false,
                    };
                    ctx.repos
                        .calendars
                        .insert(&calendar)
                        .await
                        .map_err(|_| UseCaseError::StorageError)?;
                    calendars.push(calendar);
                }
            }
        }

        for gone in known.iter().filter(|c| {
            !provider_calendars
                .iter()
                .any(|p| p.external_id == c.external_id)
        }) {
            ctx.repos
                .calendars
                .delete(&gone.id)
                .await
                .map_err(|_| UseCaseError::StorageError)?;
        }

        account.last_synced_at = Some(ctx.sys.get_timestamp());
        ctx.repos
            .accounts
            .save(account)
            .await
            .map_err(|_| UseCaseError::StorageError)?;

        Ok(calendars)
    }
}

#[cfg(test)]
mod test {
    use slotbook_domain::REQUIRED_OAUTH_SCOPES;
    use slotbook_infra::ProviderCalendar;

    use super::*;
    use crate::shared::fixtures;

    fn usecase(setup: &fixtures::TestSetup, identity: &str) -> ConnectAccountUseCase {
        ConnectAccountUseCase {
            host_id: setup.host.id.clone(),
            external_identity: identity.into(),
            access_token: "plain-access-token".into(),
            refresh_token: "plain-refresh-token".into(),
            expires_in: 3600,
            scopes: REQUIRED_OAUTH_SCOPES.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn connects_an_account_and_reconciles_calendars() {
        let setup = fixtures::setup(chrono_tz::UTC).await;
        setup.gateway.seed_calendars(vec![
            ProviderCalendar {
                external_id: "primary".into(),
                name: "Primary".into(),
                writable: true,
            },
            ProviderCalendar {
                external_id: "team".into(),
                name: "Team".into(),
                writable: false,
            },
        ]);

        let res = usecase(&setup, "new@example.com")
            .execute(&setup.ctx)
            .await
            .unwrap();

        assert!(res.account.valid);
        assert!(res.account.last_synced_at.is_some());
        assert_eq!(res.calendars.len(), 2);

        // tokens are sealed at rest and never stored in the clear
        let stored = setup
            .ctx
            .repos
            .accounts
            .find(&res.account.id)
            .await
            .unwrap()
            .unwrap();
        assert_ne!(stored.sealed_access_token, "plain-access-token");
        assert_eq!(
            setup
                .ctx
                .token_vault
                .open(&stored.sealed_access_token)
                .unwrap(),
            "plain-access-token"
        );
    }

    #[tokio::test]
    async fn reconsent_revalidates_an_invalid_account_and_keeps_selection() {
        let setup = fixtures::setup(chrono_tz::UTC).await;
        setup.gateway.seed_calendars(vec![ProviderCalendar {
            external_id: "primary".into(),
            name: "Primary renamed".into(),
            writable: true,
        }]);

        // break the fixture account
        let mut account = setup.account.clone();
        account.valid = false;
        setup.ctx.repos.accounts.save(&account).await.unwrap();

        let res = usecase(&setup, "grace@example.com")
            .execute(&setup.ctx)
            .await
            .unwrap();

        // same account row, revalidated
        assert_eq!(res.account.id, setup.account.id);
        assert!(res.account.valid);

        // the known calendar kept its id and host selection, took the new name
        assert_eq!(res.calendars.len(), 1);
        assert_eq!(res.calendars[0].id, setup.calendar.id);
        assert!(res.calendars[0].selected_for_busy);
        assert_eq!(res.calendars[0].name, "Primary renamed");
    }

    #[tokio::test]
    async fn calendars_gone_at_the_provider_are_dropped() {
        let setup = fixtures::setup(chrono_tz::UTC).await;
        setup.gateway.seed_calendars(vec![ProviderCalendar {
            external_id: "other".into(),
            name: "Other".into(),
            writable: true,
        }]);

        usecase(&setup, "grace@example.com")
            .execute(&setup.ctx)
            .await
            .unwrap();

        // "primary" disappeared at the provider
        assert!(
            setup
                .ctx
                .repos
                .calendars
                .find(&setup.calendar.id)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn underscoped_grants_are_rejected() {
        let setup = fixtures::setup(chrono_tz::UTC).await;

        let mut underscoped = usecase(&setup, "new@example.com");
        underscoped.scopes = vec!["https://www.googleapis.com/auth/calendar.readonly".into()];
        assert!(matches!(
            underscoped.execute(&setup.ctx).await,
            Err(UseCaseError::MissingScopes)
        ));
    }
}
