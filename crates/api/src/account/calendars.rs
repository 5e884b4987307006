use actix_web::{HttpRequest, HttpResponse, web};
use slotbook_api_structs::{get_calendars, select_calendars};
use slotbook_domain::{Calendar, ID};
use slotbook_infra::SlotbookContext;

use crate::{
    error::SlotbookError,
    shared::{
        auth::protect_host_route,
        usecase::{UseCase, execute},
    },
};

pub async fn get_calendars_controller(
    http_req: HttpRequest,
    path_params: web::Path<get_calendars::PathParams>,
    ctx: web::Data<SlotbookContext>,
) -> Result<HttpResponse, SlotbookError> {
    let host = protect_host_route(&http_req, &ctx).await?;

    let calendars = find_owned_calendars(
        &host.id,
        &path_params.into_inner().account_id,
        &ctx,
    )
    .await?;

    Ok(HttpResponse::Ok().json(get_calendars::APIResponse::new(calendars)))
}

async fn find_owned_calendars(
    host_id: &ID,
    account_id: &ID,
    ctx: &SlotbookContext,
) -> Result<Vec<Calendar>, SlotbookError> {
    let account = ctx
        .repos
        .accounts
        .find(account_id)
        .await
        .map_err(|_| SlotbookError::InternalError)?
        .filter(|account| &account.host_id == host_id)
        .ok_or_else(|| SlotbookError::NotFound(format!("Account {} was not found", account_id)))?;

    ctx.repos
        .calendars
        .find_by_account(&account.id)
        .await
        .map_err(|_| SlotbookError::InternalError)
}

pub async fn select_calendars_controller(
    http_req: HttpRequest,
    path_params: web::Path<select_calendars::PathParams>,
    body: web::Json<select_calendars::RequestBody>,
    ctx: web::Data<SlotbookContext>,
) -> Result<HttpResponse, SlotbookError> {
    let host = protect_host_route(&http_req, &ctx).await?;

    let usecase = SelectCalendarsUseCase {
        host_id: host.id,
        account_id: path_params.into_inner().account_id,
        selected_for_busy: body.into_inner().selected_for_busy,
    };

    execute(usecase, &ctx)
        .await
        .map(|calendars| HttpResponse::Ok().json(select_calendars::APIResponse::new(calendars)))
        .map_err(SlotbookError::from)
}

/// Replaces which of the account's calendars feed the busy composition.
/// Selection is host-controlled and independent of the provider's list.
#[derive(Debug)]
pub(crate) struct SelectCalendarsUseCase {
    pub host_id: ID,
    pub account_id: ID,
    pub selected_for_busy: Vec<ID>,
}

#[derive(Debug)]
pub(crate) enum UseCaseError {
    AccountNotFound(ID),
    UnknownCalendar,
    StorageError,
    InternalError,
}

impl From<UseCaseError> for SlotbookError {
    fn from(e: UseCaseError) -> Self {
        match e {
            UseCaseError::AccountNotFound(id) => {
                Self::NotFound(format!("Account {} was not found", id))
            }
            UseCaseError::UnknownCalendar => {
                Self::BadClientData("A selected calendar does not belong to this account".into())
            }
            UseCaseError::StorageError | UseCaseError::InternalError => Self::InternalError,
        }
    }
}

#[async_trait::async_trait]
impl UseCase for SelectCalendarsUseCase {
    type Response = Vec<Calendar>;

    type Error = UseCaseError;

    const NAME: &'static str = "SelectCalendars";

    async fn execute(&mut self, ctx: &SlotbookContext) -> Result<Self::Response, Self::Error> {
        let account = ctx
            .repos
            .accounts
            .find(&self.account_id)
            .await
            .map_err(|_| UseCaseError::InternalError)?
            .filter(|account| account.host_id == self.host_id)
            .ok_or_else(|| UseCaseError::AccountNotFound(self.account_id.clone()))?;

        let mut calendars = ctx
            .repos
            .calendars
            .find_by_account(&account.id)
            .await
            .map_err(|_| UseCaseError::InternalError)?;

        if self
            .selected_for_busy
            .iter()
            .any(|id| !calendars.iter().any(|c| &c.id == id))
        {
            return Err(UseCaseError::UnknownCalendar);
        }

        for calendar in &mut calendars {
            calendar.selected_for_busy = self.selected_for_busy.contains(&calendar.id);
            ctx.repos
                .calendars
                .save(calendar)
                .await
                .map_err(|_| UseCaseError::StorageError)?;
        }

        Ok(calendars)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::shared::fixtures;

    #[tokio::test]
    async fn replaces_the_selection() {
        let setup = fixtures::setup(chrono_tz::UTC).await;
        let second = Calendar {
            id: Default::default(),
            account_id: setup.account.id.clone(),
            external_id: "team".into(),
            name: "Team".into(),
            writable: false,
            selected_for_busy: false,
        };
        setup.ctx.repos.calendars.insert(&second).await.unwrap();

        let mut usecase = SelectCalendarsUseCase {
            host_id: setup.host.id.clone(),
            account_id: setup.account.id.clone(),
            selected_for_busy: vec![second.id.clone()],
        };
        let calendars = usecase.execute(&setup.ctx).await.unwrap();

        for calendar in calendars {
            assert_eq!(calendar.selected_for_busy, calendar.id == second.id);
        }
    }

    #[tokio::test]
    async fn rejects_foreign_accounts_and_calendars() {
        let setup = fixtures::setup(chrono_tz::UTC).await;

        let mut foreign_account = SelectCalendarsUseCase {
            host_id: ID::default(),
            account_id: setup.account.id.clone(),
            selected_for_busy: Vec::new(),
        };
        assert!(matches!(
            foreign_account.execute(&setup.ctx).await,
            Err(UseCaseError::AccountNotFound(_))
        ));

        let mut foreign_calendar = SelectCalendarsUseCase {
            host_id: setup.host.id.clone(),
            account_id: setup.account.id.clone(),
            selected_for_busy: vec![ID::default()],
        };
        assert!(matches!(
            foreign_calendar.execute(&setup.ctx).await,
            Err(UseCaseError::UnknownCalendar)
        ));
    }
}
