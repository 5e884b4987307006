use actix_web::{HttpRequest, HttpResponse, web};
use slotbook_api_structs::{get_event_type, get_event_types};
use slotbook_domain::{EventType, ID};
use slotbook_infra::SlotbookContext;

use crate::{
    error::SlotbookError,
    shared::{
        auth::protect_host_route,
        usecase::{UseCase, execute},
    },
};

pub async fn get_event_type_controller(
    http_req: HttpRequest,
    path_params: web::Path<get_event_type::PathParams>,
    ctx: web::Data<SlotbookContext>,
) -> Result<HttpResponse, SlotbookError> {
    let host = protect_host_route(&http_req, &ctx).await?;

    let usecase = GetEventTypeUseCase {
        host_id: host.id,
        event_type_id: path_params.into_inner().event_type_id,
    };

    execute(usecase, &ctx)
        .await
        .map(|event_type| HttpResponse::Ok().json(get_event_type::APIResponse::new(event_type)))
        .map_err(SlotbookError::from)
}

pub async fn get_event_types_controller(
    http_req: HttpRequest,
    ctx: web::Data<SlotbookContext>,
) -> Result<HttpResponse, SlotbookError> {
    let host = protect_host_route(&http_req, &ctx).await?;

    let event_types = ctx
        .repos
        .event_types
        .find_by_host(&host.id)
        .await
        .map_err(|_| SlotbookError::InternalError)?;

    Ok(HttpResponse::Ok().json(get_event_types::APIResponse::new(event_types)))
}

#[derive(Debug)]
pub(crate) struct GetEventTypeUseCase {
    pub host_id: ID,
    pub event_type_id: ID,
}

#[derive(Debug)]
pub(crate) enum UseCaseError {
    EventTypeNotFound(ID),
    InternalError,
}

impl From<UseCaseError> for SlotbookError {
    fn from(e: UseCaseError) -> Self {
        match e {
            UseCaseError::EventTypeNotFound(id) => {
                Self::NotFound(format!("Event type {} was not found", id))
            }
            UseCaseError::InternalError => Self::InternalError,
        }
    }
}

#[async_trait::async_trait]
impl UseCase for GetEventTypeUseCase {
    type Response = EventType;

    type Error = UseCaseError;

    const NAME: &'static str = "GetEventType";

    async fn execute(&mut self, ctx: &SlotbookContext) -> Result<Self::Response, Self::Error> {
        ctx.repos
            .event_types
            .find(&self.event_type_id)
            .await
            .map_err(|_| UseCaseError::InternalError)?
            // Another host's event types are indistinguishable from absent ones
            .filter(|et| et.host_id == self.host_id)
            .ok_or_else(|| UseCaseError::EventTypeNotFound(self.event_type_id.clone()))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::shared::fixtures;

    #[tokio::test]
    async fn owners_see_their_event_types_others_do_not() {
        let setup = fixtures::setup(chrono_tz::UTC).await;

        let mut owner = GetEventTypeUseCase {
            host_id: setup.host.id.clone(),
            event_type_id: setup.event_type.id.clone(),
        };
        assert_eq!(
            owner.execute(&setup.ctx).await.unwrap().slug,
            "intro-call"
        );

        let mut stranger = GetEventTypeUseCase {
            host_id: ID::default(),
            event_type_id: setup.event_type.id.clone(),
        };
        assert!(matches!(
            stranger.execute(&setup.ctx).await,
            Err(UseCaseError::EventTypeNotFound(_))
        ));
    }
}
