use actix_web::{HttpRequest, HttpResponse, web};
use slotbook_api_structs::update_event_type::{APIResponse, PathParams, RequestBody};
use slotbook_domain::{EventType, ID};
use slotbook_infra::SlotbookContext;
use validator::Validate;

use super::create_event_type::{parse_working_hours, validate_calendar_ownership};
use crate::{
    error::SlotbookError,
    shared::{
        auth::protect_host_route,
        usecase::{UseCase, execute},
    },
};

pub async fn update_event_type_controller(
    http_req: HttpRequest,
    path_params: web::Path<PathParams>,
    body: web::Json<RequestBody>,
    ctx: web::Data<SlotbookContext>,
) -> Result<HttpResponse, SlotbookError> {
    let host = protect_host_route(&http_req, &ctx).await?;

    let body = body.into_inner();
    body.validate()
        .map_err(|e| SlotbookError::BadClientData(e.to_string()))?;

    let working_hours = body
        .working_hours
        .as_deref()
        .map(parse_working_hours)
        .transpose()?;
    let usecase = UpdateEventTypeUseCase {
        host_id: host.id,
        event_type_id: path_params.into_inner().event_type_id,
        body,
        working_hours,
    };

    execute(usecase, &ctx)
        .await
        .map(|event_type| HttpResponse::Ok().json(APIResponse::new(event_type)))
        .map_err(SlotbookError::from)
}

#[derive(Debug)]
pub(crate) struct UpdateEventTypeUseCase {
    pub host_id: ID,
    pub event_type_id: ID,
    pub body: RequestBody,
    pub working_hours: Option<Vec<slotbook_domain::WorkingHours>>,
}

#[derive(Debug)]
pub(crate) enum UseCaseError {
    EventTypeNotFound(ID),
    InvalidEventType(String),
    UnknownCalendar,
    StorageError,
    InternalError,
}

impl From<UseCaseError> for SlotbookError {
    fn from(e: UseCaseError) -> Self {
        match e {
            UseCaseError::EventTypeNotFound(id) => {
                Self::NotFound(format!("Event type {} was not found", id))
            }
            UseCaseError::InvalidEventType(msg) => Self::BadClientData(msg),
            UseCaseError::UnknownCalendar => Self::BadClientData(
                "A participating calendar does not exist or belongs to another host".into(),
            ),
            UseCaseError::StorageError | UseCaseError::InternalError => Self::InternalError,
        }
    }
}

#[async_trait::async_trait]
impl UseCase for UpdateEventTypeUseCase {
    type Response = EventType;

    type Error = UseCaseError;

    const NAME: &'static str = "UpdateEventType";

    async fn execute(&mut self, ctx: &SlotbookContext) -> Result<Self::Response, Self::Error> {
        let mut event_type = ctx
            .repos
            .event_types
            .find(&self.event_type_id)
            .await
            .map_err(|_| UseCaseError::InternalError)?
            .filter(|et| et.host_id == self.host_id)
            .ok_or_else(|| UseCaseError::EventTypeNotFound(self.event_type_id.clone()))?;

        let body = &self.body;
        if let Some(name) = &body.name {
            event_type.name = name.clone();
        }
        if body.description.is_some() {
            event_type.description = body.description.clone();
        }
        if let Some(duration) = body.duration_minutes {
            event_type.duration_minutes = duration;
        }
        if let Some(buffer) = body.buffer_before_minutes {
            event_type.buffer_before_minutes = buffer;
        }
        if let Some(buffer) = body.buffer_after_minutes {
            event_type.buffer_after_minutes = buffer;
        }
        if let Some(notice) = body.minimum_notice_minutes {
            event_type.minimum_notice_minutes = notice;
        }
        if let Some(window) = body.scheduling_window_days {
            event_type.scheduling_window_days = window;
        }
        if let Some(interval) = body.slot_interval_minutes {
            event_type.slot_interval_minutes = interval;
        }
        if let Some(working_hours) = &self.working_hours {
            event_type.working_hours = working_hours.clone();
        }
        if let Some(participating) = &body.participating_calendars {
            event_type.participating_calendars = participating.clone();
        }
        if body.destination_calendar.is_some() {
            event_type.destination_calendar = body.destination_calendar.clone();
        }
        if let Some(location_kind) = &body.location_kind {
            event_type.location_kind = location_kind.clone();
        }
        if let Some(include_tentative) = body.include_tentative_busy {
            event_type.include_tentative_busy = include_tentative;
        }
        if let Some(requires_confirmation) = body.requires_confirmation {
            event_type.requires_confirmation = requires_confirmation;
        }
        if let Some(custom_questions) = &body.custom_questions {
            event_type.custom_questions = custom_questions.clone();
        }
        if let Some(active) = body.active {
            event_type.active = active;
        }

        event_type
            .validate()
            .map_err(|e| UseCaseError::InvalidEventType(e.to_string()))?;
        validate_calendar_ownership(&event_type, ctx)
            .await
            .map_err(|e| match e {
                super::create_event_type::UseCaseError::UnknownCalendar => {
                    UseCaseError::UnknownCalendar
                }
                _ => UseCaseError::InternalError,
            })?;

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

    fn empty_body() -> RequestBody {
        RequestBody {
            name: None,
            description: None,
            duration_minutes: None,
            buffer_before_minutes: None,
            buffer_after_minutes: None,
            minimum_notice_minutes: None,
            scheduling_window_days: None,
            slot_interval_minutes: None,
            working_hours: None,
            participating_calendars: None,
            destination_calendar: None,
            location_kind: None,
            include_tentative_busy: None,
            requires_confirmation: None,
            custom_questions: None,
            active: None,
        }
    }

    #[tokio::test]
    async fn updates_only_the_provided_fields() {
        let setup = fixtures::setup(chrono_tz::UTC).await;

        let mut usecase = UpdateEventTypeUseCase {
            host_id: setup.host.id.clone(),
            event_type_id: setup.event_type.id.clone(),
            body: RequestBody {
                duration_minutes: Some(45),
                buffer_after_minutes: Some(10),
                ..empty_body()
            },
            working_hours: None,
        };

        let updated = usecase.execute(&setup.ctx).await.unwrap();
        assert_eq!(updated.duration_minutes, 45);
        assert_eq!(updated.buffer_after_minutes, 10);
        // untouched fields survive
        assert_eq!(updated.slug, "intro-call");
        assert_eq!(updated.slot_interval_minutes, 15);
    }

    #[tokio::test]
    async fn invalid_updates_are_rejected() {
        let setup = fixtures::setup(chrono_tz::UTC).await;

        let mut usecase = UpdateEventTypeUseCase {
            host_id: setup.host.id.clone(),
            event_type_id: setup.event_type.id.clone(),
            body: RequestBody {
                slot_interval_minutes: Some(2),
                ..empty_body()
            },
            working_hours: None,
        };
        assert!(matches!(
            usecase.execute(&setup.ctx).await,
            Err(UseCaseError::InvalidEventType(_))
        ));
    }

    #[tokio::test]
    async fn other_hosts_cannot_update() {
        let setup = fixtures::setup(chrono_tz::UTC).await;

        let mut usecase = UpdateEventTypeUseCase {
            host_id: ID::default(),
            event_type_id: setup.event_type.id.clone(),
            body: empty_body(),
            working_hours: None,
        };
        assert!(matches!(
            usecase.execute(&setup.ctx).await,
            Err(UseCaseError::EventTypeNotFound(_))
        ));
    }
}
