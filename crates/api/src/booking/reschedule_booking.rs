use actix_web::{HttpRequest, HttpResponse, web};
use chrono::{DateTime, Utc};
use slotbook_api_structs::reschedule_booking::{APIResponse, PathParams, RequestBody};
use slotbook_domain::{
    Booking,
    BookingStatus,
    EventType,
    Host,
    Tz,
    generate_ical_content_for_booking,
};
use slotbook_infra::{BookingEmail, BookingWriteError, EmailTemplate, SlotbookContext};
use tracing::{error, warn};
use validator::Validate;

use super::cancel_booking::Caller;
use crate::{
    availability::is_slot_bookable,
    error::SlotbookError,
    shared::{
        auth::maybe_host,
        rate_limit::{EndpointClass, RateLimiter},
        usecase::{Subscriber, UseCase, execute},
    },
};

pub async fn reschedule_booking_controller(
    http_req: HttpRequest,
    path_params: web::Path<PathParams>,
    body: web::Json<RequestBody>,
    ctx: web::Data<SlotbookContext>,
    limiter: web::Data<RateLimiter>,
) -> Result<HttpResponse, SlotbookError> {
    let client_key = http_req
        .connection_info()
        .realip_remote_addr()
        .unwrap_or("unknown")
        .to_string();
    let decision = limiter.check(EndpointClass::Booking, &client_key, ctx.sys.get_timestamp());
    if !decision.allowed {
        return Err(SlotbookError::RateLimited {
            reset_at: decision.reset_at,
        });
    }

    let body = body.into_inner();
    body.validate()
        .map_err(|e| SlotbookError::BadClientData(e.to_string()))?;

    let caller = match maybe_host(&http_req, &ctx).await? {
        Some(host) => Caller::Host(host.id),
        None => match &body.email {
            Some(email) => Caller::Guest(email.clone()),
            None => Caller::Anonymous,
        },
    };

    let usecase = RescheduleBookingUseCase {
        uid: path_params.into_inner().uid,
        new_start_time: body.new_start_time,
        guest_timezone: body.timezone,
        caller,
    };

    execute(usecase, &ctx)
        .await
        .map(|res| HttpResponse::Ok().json(APIResponse::new(res.booking)))
        .map_err(SlotbookError::from)
}

#[derive(Debug)]
pub(crate) struct RescheduleBookingUseCase {
    pub uid: String,
    pub new_start_time: DateTime<Utc>,
    pub guest_timezone: Tz,
    pub caller: Caller,
}

#[derive(Debug)]
pub(crate) struct RescheduledBooking {
    pub booking: Booking,
    pub event_type: EventType,
    pub host: Host,
    /// Rescheduling to the current time is acknowledged without side effects
    pub unchanged: bool,
}

#[derive(Debug)]
pub(crate) enum UseCaseError {
    BookingNotFound(String),
    Unauthorized,
    SlotTaken,
    InvalidInput(String),
    UpstreamUnavailable,
    StorageError,
    InternalError,
}

impl From<UseCaseError> for SlotbookError {
    fn from(e: UseCaseError) -> Self {
        match e {
            UseCaseError::BookingNotFound(uid) => {
                Self::NotFound(format!("Booking {} was not found", uid))
            }
            UseCaseError::Unauthorized => Self::Unauthorized(
                "Only the host or the guest who booked can reschedule this booking".into(),
            ),
            UseCaseError::SlotTaken => {
                Self::SlotTaken("The requested slot is no longer available".into())
            }
            UseCaseError::InvalidInput(msg) => Self::BadClientData(msg),
            UseCaseError::UpstreamUnavailable => Self::UpstreamUnavailable(
                "The external calendar could not be updated, please retry".into(),
            ),
            UseCaseError::StorageError | UseCaseError::InternalError => Self::InternalError,
        }
    }
}

#[async_trait::async_trait]
impl UseCase for RescheduleBookingUseCase {
    type Response = RescheduledBooking;

    type Error = UseCaseError;

    const NAME: &'static str = "RescheduleBooking";

    fn subscribers() -> Vec<Box<dyn Subscriber<Self>>> {
        vec![Box::new(NotifyParticipantsOnReschedule {})]
    }

    async fn execute(&mut self, ctx: &SlotbookContext) -> Result<Self::Response, Self::Error> {
        let booking = ctx
            .repos
            .bookings
            .find_by_uid(&self.uid)
            .await
            .map_err(|_| UseCaseError::InternalError)?
            .ok_or_else(|| UseCaseError::BookingNotFound(self.uid.clone()))?;

        let authorized = match &self.caller {
            Caller::Host(host_id) => host_id == &booking.host_id,
            Caller::Guest(email) => booking.guest_matches(email),
            Caller::Anonymous => false,
        };
        if !authorized {
            return Err(UseCaseError::Unauthorized);
        }

        if booking.status == BookingStatus::Cancelled {
            return Err(UseCaseError::InvalidInput(
                "A cancelled booking cannot be rescheduled".into(),
            ));
        }

        // Deactivation stops new bookings; existing ones may still move
        let event_type = ctx
            .repos
            .event_types
            .find(&booking.event_type_id)
            .await
            .map_err(|_| UseCaseError::InternalError)?
            .ok_or(UseCaseError::InternalError)?;
        let host = ctx
            .repos
            .hosts
            .find(&booking.host_id)
            .await
            .map_err(|_| UseCaseError::InternalError)?
            .ok_or(UseCaseError::InternalError)?;

        if self.new_start_time == booking.start_time {
            return Ok(RescheduledBooking {
                booking,
                event_type,
                host,
                unchanged: true,
            });
        }

        // Pre-commit check for the new time
        let bookable = is_slot_bookable(&event_type, &host, self.new_start_time, ctx)
            .await
            .map_err(|_| UseCaseError::InternalError)?;
        if !bookable {
            return Err(UseCaseError::SlotTaken);
        }

        // Mutate start/end atomically; the uid is regenerated and the prior
        // uid kept as a back-reference
        let previous = booking.clone();
        let mut booking = booking;
        booking.rescheduled_from_uid = Some(previous.uid.clone());
        booking.uid = slotbook_utils::create_booking_uid();
        booking.start_time = self.new_start_time;
        booking.end_time = self.new_start_time + event_type.duration();
        booking.guest_timezone = self.guest_timezone;
        booking.updated = ctx.sys.get_timestamp();

        match ctx.repos.bookings.save(&booking).await {
            Ok(()) => {}
            // The unique constraint keeps the new time from colliding
            Err(BookingWriteError::SlotTaken) => return Err(UseCaseError::SlotTaken),
            Err(e) => {
                error!("Unable to reschedule booking {}: {:?}", previous.uid, e);
                return Err(UseCaseError::StorageError);
            }
        }

        // Fail closed on the external move: restore the previous state when
        // the provider cannot be updated
        if booking.external_event_created {
            if let Err(e) = self.move_external_event(&booking, &event_type, ctx).await {
                if let Err(rollback_err) = ctx.repos.bookings.save(&previous).await {
                    error!(
                        "Unable to roll back reschedule of booking {}: {:?}",
                        previous.uid, rollback_err
                    );
                }
                return Err(e);
            }
        }

        Ok(RescheduledBooking {
            booking,
            event_type,
            host,
            unchanged: false,
        })
    }
}

impl RescheduleBookingUseCase {
    async fn move_external_event(
        &self,
        booking: &Booking,
        event_type: &EventType,
        ctx: &SlotbookContext,
    ) -> Result<(), UseCaseError> {
        let Some(event_ref) = &booking.external_event_ref else {
            return Ok(());
        };
        let Some(destination) = &event_type.destination_calendar else {
            return Ok(());
        };

        let calendar = ctx
            .repos
            .calendars
            .find(destination)
            .await
            .map_err(|_| UseCaseError::InternalError)?;
        let Some(calendar) = calendar else {
            warn!(
                "Destination calendar of booking {} no longer exists",
                booking.uid
            );
            return Ok(());
        };

        let account = ctx
            .repos
            .accounts
            .find(&calendar.account_id)
            .await
            .map_err(|_| UseCaseError::InternalError)?
            .filter(|account| account.valid);
        let Some(account) = account else {
            warn!(
                "Account of destination calendar {} is missing or invalid",
                calendar.id
            );
            return Ok(());
        };

        ctx.calendar_gateway
            .move_event(
                &account,
                &calendar.external_id,
                event_ref,
                booking.start_time,
                booking.end_time,
            )
            .await
            .map_err(|e| {
                warn!(
                    "External event move failed for booking {}: {:?}",
                    booking.uid, e
                );
                UseCaseError::UpstreamUnavailable
            })
    }
}

/// Emails both participants the new time
struct NotifyParticipantsOnReschedule {}

#[async_trait::async_trait]
impl Subscriber<RescheduleBookingUseCase> for NotifyParticipantsOnReschedule {
    async fn notify(&self, rescheduled: &RescheduledBooking, ctx: &SlotbookContext) {
        if rescheduled.unchanged {
            return;
        }

        let ical = generate_ical_content_for_booking(
            &rescheduled.booking,
            &rescheduled.event_type,
            &rescheduled.host,
        );
        let email = BookingEmail {
            template: EmailTemplate::BookingRescheduled,
            recipients: vec![
                rescheduled.booking.guest.email.clone(),
                rescheduled.host.email.clone(),
            ],
            variables: serde_json::json!({
                "bookingUid": rescheduled.booking.uid,
                "previousUid": rescheduled.booking.rescheduled_from_uid,
                "eventTypeName": rescheduled.event_type.name,
                "guestName": rescheduled.booking.guest.name,
                "startTime": rescheduled.booking.start_time,
                "endTime": rescheduled.booking.end_time,
            }),
            ical_attachment: Some(ical),
        };

        if let Err(e) = ctx.mailer.send(&email).await {
            error!(
                "Unable to send reschedule email for booking {}: {:?}",
                rescheduled.booking.uid, e
            );
        }
    }
}
