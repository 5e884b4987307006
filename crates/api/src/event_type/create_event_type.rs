use actix_web::{HttpRequest, HttpResponse, web};
use slotbook_api_structs::create_event_type::{APIResponse, RequestBody};
use slotbook_api_structs::dtos::WorkingHoursDTO;
use slotbook_domain::{CustomQuestion, EventType, ID, LocationKind, WorkingHours};
use slotbook_infra::SlotbookContext;
use validator::Validate;

use crate::{
    error::SlotbookError,
    shared::{
        auth::protect_host_route,
        usecase::{UseCase, execute},
    },
};

pub async fn create_event_type_controller(
    http_req: HttpRequest,
    body: web::Json<RequestBody>,
    ctx: web::Data<SlotbookContext>,
) -> Result<HttpResponse, SlotbookError> {
    let host = protect_host_route(&http_req, &ctx).await?;

    let body = body.into_inner();
    body.validate()
        .map_err(|e| SlotbookError::BadClientData(e.to_string()))?;

    let working_hours = parse_working_hours(&body.working_hours)?;
    let usecase = CreateEventTypeUseCase {
        host_id: host.id,
        slug: body.slug,
        name: body.name,
        description: body.description,
        duration_minutes: body.duration_minutes,
        buffer_before_minutes: body.buffer_before_minutes,
        buffer_after_minutes: body.buffer_after_minutes,
        minimum_notice_minutes: body.minimum_notice_minutes,
        scheduling_window_days: body.scheduling_window_days,
        slot_interval_minutes: body.slot_interval_minutes,
        working_hours,
        participating_calendars: body.participating_calendars,
        destination_calendar: body.destination_calendar,
        location_kind: body.location_kind,
        include_tentative_busy: body.include_tentative_busy,
        requires_confirmation: body.requires_confirmation,
        custom_questions: body.custom_questions,
    };

    execute(usecase, &ctx)
        .await
        .map(|event_type| HttpResponse::Created().json(APIResponse::new(event_type)))
        .map_err(SlotbookError::from)
}

pub(crate) fn parse_working_hours(
    dtos: &[WorkingHoursDTO],
) -> Result<Vec<WorkingHours>, SlotbookError> {
    dtos.iter()
        .map(|dto| dto.to_domain().map_err(SlotbookError::BadClientData))
        .collect()
}

#[derive(Debug)]
pub(crate) struct CreateEventTypeUseCase {
    pub host_id: ID,
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
    pub duration_minutes: i64,
    pub buffer_before_minutes: i64,
    pub buffer_after_minutes: i64,
    pub minimum_notice_minutes: i64,
    pub scheduling_window_days: i64,
    pub slot_interval_minutes: i64,
    pub working_hours: Vec<WorkingHours>,
    pub participating_calendars: Vec<ID>,
    pub destination_calendar: Option<ID>,
    pub location_kind: LocationKind,
    pub include_tentative_busy: bool,
    pub requires_confirmation: bool,
    pub custom_questions: Vec<CustomQuestion>,
}

#[derive(Debug)]
pub(crate) enum UseCaseError {
    InvalidEventType(String),
    SlugTaken(String),
    UnknownCalendar,
    StorageError,
    InternalError,
}

impl From<UseCaseError> for SlotbookError {
    fn from(e: UseCaseError) -> Self {
        match e {
            UseCaseError::InvalidEventType(msg) => Self::BadClientData(msg),
            UseCaseError::SlugTaken(slug) => {
                Self::BadClientData(format!("Slug '{}' is already in use", slug))
            }
            UseCaseError::UnknownCalendar => Self::BadClientData(
                "A participating calendar does not exist or belongs to another host".into(),
            ),
            UseCaseError::StorageError | UseCaseError::InternalError => Self::InternalError,
        }
    }
}

#[async_trait::async_trait]
impl UseCase for CreateEventTypeUseCase {
    type Response = EventType;

    type Error = UseCaseError;

    const NAME: &'static str = "CreateEventType";

    async fn execute(&mut self, ctx: &SlotbookContext) -> Result<Self::Response, Self::Error> {
        let event_type = EventType {
            id: Default::default(),
            host_id: self.host_id.clone(),
            slug: self.slug.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            duration_minutes: self.duration_minutes,
            buffer_before_minutes: self.buffer_before_minutes,
            buffer_after_minutes: self.buffer_after_minutes,
            minimum_notice_minutes: self.minimum_notice_minutes,
            scheduling_window_days: self.scheduling_window_days,
            slot_interval_minutes: self.slot_interval_minutes,
            working_hours: self.working_hours.clone(),
            participating_calendars: self.participating_calendars.clone(),
            destination_calendar: self.destination_calendar.clone(),
            location_kind: self.location_kind.clone(),
            include_tentative_busy: self.include_tentative_busy,
            requires_confirmation: self.requires_confirmation,
            custom_questions: self.custom_questions.clone(),
            active: true,
        };

        event_type
            .validate()
            .map_err(|e| UseCaseError::InvalidEventType(e.to_string()))?;

        // Slug unique per host
        let existing = ctx
            .repos
            .event_types
            .find_by_host_and_slug(&self.host_id, &self.slug)
            .await
            .map_err(|_| UseCaseError::InternalError)?;
        if existing.is_some() {
            return Err(UseCaseError::SlugTaken(self.slug.clone()));
        }

        // Participating calendars must belong to this host's accounts
        validate_calendar_ownership(&event_type, ctx).await?;

        ctx.repos
            .event_types
            .insert(&event_type)
            .await
            .map(|_| event_type)
            .map_err(|_| UseCaseError::StorageError)
    }
}

pub(crate) async fn validate_calendar_ownership(
    event_type: &EventType,
    ctx: &SlotbookContext,
) -> Result<(), UseCaseError> {
    if event_type.participating_calendars.is_empty() {
        return Ok(());
    }

    let calendars = ctx
        .repos
        .calendars
        .find_multiple(event_type.participating_calendars.iter().collect())
        .await
        .map_err(|_| UseCaseError::InternalError)?;
    if calendars.len() != event_type.participating_calendars.len() {
        return Err(UseCaseError::UnknownCalendar);
    }

    let accounts = ctx
        .repos
        .accounts
        .find_by_host(&event_type.host_id)
        .await
        .map_err(|_| UseCaseError::InternalError)?;
    let owned = |account_id: &ID| accounts.iter().any(|a| &a.id == account_id);
    if calendars.iter().any(|c| !owned(&c.account_id)) {
        return Err(UseCaseError::UnknownCalendar);
    }

    Ok(())
}
