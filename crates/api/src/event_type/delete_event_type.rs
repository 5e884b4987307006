use actix_web::{HttpRequest, HttpResponse, web};
use slotbook_api_structs::delete_event_type::{APIResponse, PathParams};
use slotbook_domain::{EventType, ID};
use slotbook_infra::SlotbookContext;

use crate::{
    error::SlotbookError,
    shared::{
        auth::protect_host_route,
        usecase::{UseCase, execute},
    },
};

pub async fn delete_event_type_controller(
    http_req: HttpRequest,
    path_params: web::Path<PathParams>,
    ctx: web::Data<SlotbookContext>,
) -> Result<HttpResponse, SlotbookError> {
    let host = protect_host_route(&http_req, &ctx).await?;

    let usecase = DeleteEventTypeUseCase {
        host_id: host.id,
        event_type_id: path_params.into_inner().event_type_id,
    };

    execute(usecase, &ctx)
        .await
        .map(|event_type| HttpResponse::Ok().json(APIResponse::new(event_type)))
        .map_err(SlotbookError::from)
}

/// Deactivation instead of deletion: existing bookings keep their event
/// type, new bookings are refused.
#[derive(Debug)]
pub(crate) struct DeleteEventTypeUseCase {
    pub host_id: ID,
    pub event_type_id: ID,
}

#[derive(Debug)]
pub(crate) enum UseCaseError {
    EventTypeNotFound(ID),
    StorageError,
    InternalError,
}

impl From<UseCaseError> for SlotbookError {
    fn from(e: UseCaseError) -> Self {
        match e {
            UseCaseError::EventTypeNotFound(id) => {
                Self::NotFound(format!("Event type {} was not found", id))
            }
            UseCaseError::StorageError | UseCaseError::InternalError => Self::InternalError,
        }
    }
}

#[async_trait::async_trait]
impl UseCase for DeleteEventTypeUseCase {
    type Response = EventType;

    type Error = UseCaseError;

    const NAME: &'static str = "DeleteEventType";

    async fn execute(&mut self, ctx: &SlotbookContext) -> Result<Self::Response, Self::Error> {
        let mut event_type = ctx
            .repos
            .event_types
            .find(&self.event_type_id)
            .await
            .map_err(|_| UseCaseError::InternalError)?
            .filter(|et| et.host_id == self.host_id)
            .ok_or_else(|| UseCaseError::EventTypeNotFound(self.event_type_id.clone()))?;

        event_type.active = false;
        ctx.repos
            .event_types
            .save(&event_type)
            .await
            .map(|_| event_type)
            .map_err(|_| UseCaseError::StorageError)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::shared::fixtures;

    #[tokio::test]
    async fn soft_deactivates_the_event_type() {
        let setup = fixtures::setup(chrono_tz::UTC).await;

        let mut usecase = DeleteEventTypeUseCase {
            host_id: setup.host.id.clone(),
            event_type_id: setup.event_type.id.clone(),
        };
        let deleted = usecase.execute(&setup.ctx).await.unwrap();
        assert!(!deleted.active);

        // the row is still there, only inactive
        let stored = setup
            .ctx
            .repos
            .event_types
            .find(&setup.event_type.id)
            .await
            .unwrap()
            .unwrap();
        assert!(!stored.active);
    }
}
