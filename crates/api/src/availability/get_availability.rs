use actix_web::{HttpRequest, HttpResponse, web};
use chrono::{Datelike, NaiveDate, TimeDelta};
use slotbook_api_structs::get_availability::{APIResponse, QueryParams};
use slotbook_domain::{ID, Slot, SlotsDate, TimeSpan, Tz, group_slots_by_date, timezone};
use slotbook_infra::SlotbookContext;

use tracing::warn;

use super::fetch_busy_snapshot;
use crate::{
    error::SlotbookError,
    shared::{
        rate_limit::{EndpointClass, RateLimiter},
        usecase::{UseCase, execute},
    },
};

pub async fn get_availability_controller(
    http_req: HttpRequest,
    query_params: web::Query<QueryParams>,
    ctx: web::Data<SlotbookContext>,
    limiter: web::Data<RateLimiter>,
) -> Result<HttpResponse, SlotbookError> {
    let client_key = http_req
        .connection_info()
        .realip_remote_addr()
        .unwrap_or("unknown")
        .to_string();
    let decision = limiter.check(
        EndpointClass::Availability,
        &client_key,
        ctx.sys.get_timestamp(),
    );
    if !decision.allowed {
        return Err(SlotbookError::RateLimited {
            reset_at: decision.reset_at,
        });
    }

    let query_params = query_params.into_inner();
    let usecase = GetAvailabilityUseCase {
        event_type_id: query_params.event_type_id,
        start_date: query_params.start_date,
        end_date: query_params.end_date,
        guest_timezone: query_params.timezone,
    };

    execute(usecase, &ctx)
        .await
        .map(|res| HttpResponse::Ok().json(APIResponse::new(res.dates, res.timezone)))
        .map_err(SlotbookError::from)
}

#[derive(Debug)]
pub(crate) struct GetAvailabilityUseCase {
    pub event_type_id: ID,
    /// Local date in the guest timezone, YYYY-MM-DD
    pub start_date: String,
    /// Local date in the guest timezone, YYYY-MM-DD, inclusive
    pub end_date: String,
    pub guest_timezone: Option<Tz>,
}

#[derive(Debug)]
pub(crate) struct AvailableDates {
    pub dates: Vec<SlotsDate>,
    pub timezone: Tz,
}

#[derive(Debug)]
pub(crate) enum UseCaseError {
    EventTypeNotFound(ID),
    InvalidDate(String),
    InvalidTimespan,
    InternalError,
}

impl From<UseCaseError> for SlotbookError {
    fn from(e: UseCaseError) -> Self {
        match e {
            UseCaseError::EventTypeNotFound(id) => {
                Self::NotFound(format!("Event type {} was not found", id))
            }
            UseCaseError::InvalidDate(date) => Self::BadClientData(format!(
                "Date {} is not a valid date of format YYYY-MM-DD",
                date
            )),
            UseCaseError::InvalidTimespan => {
                Self::BadClientData("The provided start_date and end_date is invalid".into())
            }
            UseCaseError::InternalError => Self::InternalError,
        }
    }
}

#[async_trait::async_trait]
impl UseCase for GetAvailabilityUseCase {
    type Response = AvailableDates;

    type Error = UseCaseError;

    const NAME: &'static str = "GetAvailability";

    async fn execute(&mut self, ctx: &SlotbookContext) -> Result<Self::Response, Self::Error> {
        let guest_tz = self.guest_timezone.unwrap_or(chrono_tz::UTC);

        let event_type = ctx
            .repos
            .event_types
            .find(&self.event_type_id)
            .await
            .map_err(|_| UseCaseError::InternalError)?
            .filter(|et| et.active)
            .ok_or_else(|| UseCaseError::EventTypeNotFound(self.event_type_id.clone()))?;

        let host = ctx
            .repos
            .hosts
            .find(&event_type.host_id)
            .await
            .map_err(|_| UseCaseError::InternalError)?
            .ok_or(UseCaseError::InternalError)?;

        // The requested range: guest-local midnight of the first day up to
        // the midnight after the last day
        let start_date = parse_date(&self.start_date)?;
        let end_date = parse_date(&self.end_date)?;
        let range_start = timezone::local_day_bounds(start_date, &guest_tz).0;
        let range_end = timezone::local_day_bounds(end_date, &guest_tz).1;

        let range = TimeSpan::new(range_start, range_end);
        if range.is_empty() || range.greater_than(ctx.config.availability_query_duration_limit) {
            return Err(UseCaseError::InvalidTimespan);
        }

        // Clamp to the effective window
        let now = ctx.sys.get_timestamp();
        let effective_start = range_start.max(now + event_type.minimum_notice());
        let effective_end = range_end.min(now + event_type.scheduling_window());
        if effective_start >= effective_end {
            return Ok(AvailableDates {
                dates: Vec::new(),
                timezone: guest_tz,
            });
        }
        let window = TimeSpan::new(effective_start, effective_end);

        // Snapshot of external busy blocks and the booking ledger; accounts
        // that fail contribute nothing (fail-open)
        let snapshot = fetch_busy_snapshot(&event_type, &host, &window, ctx)
            .await
            .map_err(|_| UseCaseError::InternalError)?;
        if !snapshot.failed_accounts.is_empty() {
            warn!(
                "Availability for event type {} computed without {} unreachable account(s)",
                event_type.id,
                snapshot.failed_accounts.len()
            );
        }

        // Walk each local day in the host timezone and keep the candidates
        // inside the effective window that clear the busy set
        let mut slots: Vec<Slot> = Vec::new();
        let mut day = timezone::to_local_wall(effective_start, &host.timezone).date();
        let last_day = timezone::to_local_wall(effective_end, &host.timezone).date();
        while day <= last_day {
            let candidates = slotbook_domain::enumerate_day(
                day,
                &event_type.working_hours_on(day.weekday()),
                event_type.duration(),
                event_type.slot_interval(),
                &host.timezone,
            );
            slots.extend(candidates.into_iter().filter(|slot| {
                slot.start >= effective_start
                    && slot.start < effective_end
                    && !snapshot.busy.conflicts(
                        slot.start,
                        slot.end,
                        event_type.buffer_before(),
                        event_type.buffer_after(),
                    )
            }));
            day += TimeDelta::days(1);
        }

        slots.sort_by_key(|s| s.start);

        Ok(AvailableDates {
            dates: group_slots_by_date(slots, &guest_tz),
            timezone: guest_tz,
        })
    }
}

fn parse_date(value: &str) -> Result<NaiveDate, UseCaseError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| UseCaseError::InvalidDate(value.to_string()))
}
