use std::collections::HashMap;

use actix_web::{HttpRequest, HttpResponse, web};
use chrono::{DateTime, Utc};
use slotbook_api_structs::create_booking::{APIResponse, RequestBody};
use slotbook_domain::{
    Booking,
    BookingStatus,
    EventType,
    Guest,
    Host,
    ID,
    LocationKind,
    Tz,
    derive_idempotency_key,
    generate_ical_content_for_booking,
};
use slotbook_infra::{
    BookingEmail,
    BookingWriteError,
    CalendarEventInput,
    EmailTemplate,
    SlotbookContext,
    metrics,
};
use tracing::{error, warn};
use validator::Validate;

use crate::{
    availability::is_slot_bookable,
    error::SlotbookError,
    shared::{
        rate_limit::{EndpointClass, RateLimiter},
        usecase::{Subscriber, UseCase, execute},
    },
};

pub async fn create_booking_controller(
    http_req: HttpRequest,
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

    let usecase = CreateBookingUseCase {
        event_type_id: body.event_type_id,
        start_time: body.start_time,
        guest: Guest {
            name: body.guest.name,
            email: body.guest.email,
            phone: body.guest.phone,
            company: body.guest.company,
            notes: body.guest.notes,
        },
        guest_timezone: body.timezone,
        custom_responses: body.custom_responses.unwrap_or_default(),
        idempotency_key: body.idempotency_key,
    };

    execute(usecase, &ctx)
        .await
        .map(|res| {
            // A replay of a stored idempotency key is a 200, a fresh commit a 201
            if res.idempotent_replay {
                HttpResponse::Ok().json(APIResponse::new(res.booking))
            } else {
                HttpResponse::Created().json(APIResponse::new(res.booking))
            }
        })
        .map_err(SlotbookError::from)
}

#[derive(Debug)]
pub(crate) struct CreateBookingUseCase {
    pub event_type_id: ID,
    pub start_time: DateTime<Utc>,
    pub guest: Guest,
    pub guest_timezone: Tz,
    pub custom_responses: HashMap<String, String>,
    pub idempotency_key: Option<String>,
}

#[derive(Debug)]
pub(crate) struct CommittedBooking {
    pub booking: Booking,
    pub event_type: EventType,
    pub host: Host,
    pub idempotent_replay: bool,
}

#[derive(Debug, PartialEq)]
pub(crate) enum UseCaseError {
    EventTypeNotFound(ID),
    SlotTaken,
    InvalidInput(String),
    StorageError,
    InternalError,
}

impl From<UseCaseError> for SlotbookError {
    fn from(e: UseCaseError) -> Self {
        match e {
            UseCaseError::EventTypeNotFound(id) => {
                Self::NotFound(format!("Event type {} was not found", id))
            }
            UseCaseError::SlotTaken => {
                Self::SlotTaken("The requested slot is no longer available".into())
            }
            UseCaseError::InvalidInput(msg) => Self::BadClientData(msg),
            UseCaseError::StorageError | UseCaseError::InternalError => Self::InternalError,
        }
    }
}

#[async_trait::async_trait]
impl UseCase for CreateBookingUseCase {
    type Response = CommittedBooking;

    type Error = UseCaseError;

    const NAME: &'static str = "CreateBooking";

    fn subscribers() -> Vec<Box<dyn Subscriber<Self>>> {
        vec![Box::new(NotifyParticipantsOnCommit {})]
    }

    async fn execute(&mut self, ctx: &SlotbookContext) -> Result<Self::Response, Self::Error> {
        let now = ctx.sys.get_timestamp();

        // A request without a client key gets a derived one, so a naive
        // retry within the same wall-clock millisecond is deduplicated
        let idempotency_key = self.idempotency_key.clone().unwrap_or_else(|| {
            derive_idempotency_key(&self.event_type_id, self.start_time, &self.guest.email, now)
        });

        // Idempotency hit: hand back the stored booking unchanged
        let prior = ctx
            .repos
            .bookings
            .find_by_idempotency_key(&idempotency_key)
            .await
            .map_err(|_| UseCaseError::InternalError)?;
        if let Some(prior) = prior {
            return self.replay(prior, ctx).await;
        }

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

        // Answers are validated before anything touches the ledger
        for question in &event_type.custom_questions {
            let answer = self.custom_responses.get(&question.label);
            if !question.accepts(answer.map(|a| a.as_str())) {
                return Err(UseCaseError::InvalidInput(format!(
                    "Missing or invalid answer for question '{}'",
                    question.label
                )));
            }
        }

        // Pre-commit check against fresh busy data
        let bookable = is_slot_bookable(&event_type, &host, self.start_time, ctx)
            .await
            .map_err(|_| UseCaseError::InternalError)?;
        if !bookable {
            return Err(UseCaseError::SlotTaken);
        }

        let mut booking = Booking {
            id: Default::default(),
            uid: slotbook_utils::create_booking_uid(),
            host_id: host.id.clone(),
            event_type_id: event_type.id.clone(),
            start_time: self.start_time,
            end_time: self.start_time + event_type.duration(),
            guest: self.guest.clone(),
            guest_timezone: self.guest_timezone,
            status: if event_type.requires_confirmation {
                BookingStatus::Pending
            } else {
                BookingStatus::Confirmed
            },
            idempotency_key: Some(idempotency_key.clone()),
            custom_responses: serde_json::to_value(&self.custom_responses)
                .unwrap_or(serde_json::Value::Null),
            external_event_ref: None,
            external_event_created: false,
            meeting_url: None,
            rescheduled_from_uid: None,
            cancelled_at: None,
            created: now,
            updated: now,
        };

        // The insert is the uniqueness gate: under two simultaneous commits
        // for the same slot exactly one passes
        match ctx.repos.bookings.insert(&booking).await {
            Ok(()) => {}
            Err(BookingWriteError::SlotTaken) => return Err(UseCaseError::SlotTaken),
            Err(BookingWriteError::DuplicateIdempotencyKey) => {
                // Lost a race against an identical retry; return its row
                let prior = ctx
                    .repos
                    .bookings
                    .find_by_idempotency_key(&idempotency_key)
                    .await
                    .map_err(|_| UseCaseError::InternalError)?
                    .ok_or(UseCaseError::StorageError)?;
                return self.replay(prior, ctx).await;
            }
            Err(BookingWriteError::Other(e)) => {
                error!("Unable to insert booking: {:?}", e);
                return Err(UseCaseError::StorageError);
            }
        }
        metrics::BOOKINGS_COMMITTED.inc();

        // External side effects never gate the commit
        booking = write_external_event(booking, &event_type, &host, ctx).await;

        Ok(CommittedBooking {
            booking,
            event_type,
            host,
            idempotent_replay: false,
        })
    }
}

impl CreateBookingUseCase {
    async fn replay(
        &self,
        prior: Booking,
        ctx: &SlotbookContext,
    ) -> Result<CommittedBooking, UseCaseError> {
        let event_type = ctx
            .repos
            .event_types
            .find(&prior.event_type_id)
            .await
            .map_err(|_| UseCaseError::InternalError)?
            .ok_or(UseCaseError::InternalError)?;
        let host = ctx
            .repos
            .hosts
            .find(&prior.host_id)
            .await
            .map_err(|_| UseCaseError::InternalError)?
            .ok_or(UseCaseError::InternalError)?;

        Ok(CommittedBooking {
            booking: prior,
            event_type,
            host,
            idempotent_replay: true,
        })
    }
}

/// Best-effort write of the booking to the destination calendar.
///
/// On success the row is updated with the external reference and meeting
/// link; on failure the booking stands, the flag stays false and the
/// failure is visible in telemetry only.
async fn write_external_event(
    mut booking: Booking,
    event_type: &EventType,
    host: &Host,
    ctx: &SlotbookContext,
) -> Booking {
    let Some(destination) = &event_type.destination_calendar else {
        return booking;
    };

    let destination = match ctx.repos.calendars.find(destination).await {
        Ok(Some(calendar)) if calendar.destination_eligible() => calendar,
        Ok(_) => {
            warn!(
                "Destination calendar of event type {} is missing or read-only",
                event_type.id
            );
            metrics::EXTERNAL_EVENT_WRITE_FAILURES.inc();
            return booking;
        }
        Err(e) => {
            error!("Unable to load destination calendar: {:?}", e);
            metrics::EXTERNAL_EVENT_WRITE_FAILURES.inc();
            return booking;
        }
    };

    let account = match ctx.repos.accounts.find(&destination.account_id).await {
        Ok(Some(account)) if account.valid => account,
        Ok(_) => {
            warn!(
                "Account of destination calendar {} is missing or invalid",
                destination.id
            );
            metrics::EXTERNAL_EVENT_WRITE_FAILURES.inc();
            return booking;
        }
        Err(e) => {
            error!("Unable to load destination account: {:?}", e);
            metrics::EXTERNAL_EVENT_WRITE_FAILURES.inc();
            return booking;
        }
    };

    let input = CalendarEventInput {
        calendar_external_id: destination.external_id.clone(),
        summary: format!("{} with {}", event_type.name, booking.guest.name),
        description: event_type.description.clone(),
        start_time: booking.start_time,
        end_time: booking.end_time,
        host_email: host.email.clone(),
        guest_email: booking.guest.email.clone(),
        uid: booking.uid.clone(),
        with_meeting_link: matches!(event_type.location_kind, LocationKind::Video),
    };

    match ctx.calendar_gateway.create_event(&account, input).await {
        Ok(created) => {
            booking.external_event_ref = Some(created.event_ref);
            booking.meeting_url = created.meeting_url;
            booking.external_event_created = true;
            booking.updated = ctx.sys.get_timestamp();
            if let Err(e) = ctx.repos.bookings.save(&booking).await {
                error!(
                    "Booking {} committed but saving its external event reference failed: {:?}",
                    booking.uid, e
                );
            }
        }
        Err(e) => {
            warn!(
                "External event creation failed for booking {}; booking stands: {:?}",
                booking.uid, e
            );
            metrics::EXTERNAL_EVENT_WRITE_FAILURES.inc();
        }
    }

    booking
}

/// Emails both participants once a commit (not a replay) succeeded
struct NotifyParticipantsOnCommit {}

#[async_trait::async_trait]
impl Subscriber<CreateBookingUseCase> for NotifyParticipantsOnCommit {
    async fn notify(&self, committed: &CommittedBooking, ctx: &SlotbookContext) {
        if committed.idempotent_replay {
            return;
        }

        let ical = generate_ical_content_for_booking(
            &committed.booking,
            &committed.event_type,
            &committed.host,
        );
        let email = BookingEmail {
            template: EmailTemplate::BookingConfirmed,
            recipients: vec![
                committed.booking.guest.email.clone(),
                committed.host.email.clone(),
            ],
            variables: serde_json::json!({
                "bookingUid": committed.booking.uid,
                "eventTypeName": committed.event_type.name,
                "guestName": committed.booking.guest.name,
                "startTime": committed.booking.start_time,
                "endTime": committed.booking.end_time,
                "guestTimezone": committed.booking.guest_timezone.to_string(),
                "meetingUrl": committed.booking.meeting_url,
            }),
            ical_attachment: Some(ical),
        };

        if let Err(e) = ctx.mailer.send(&email).await {
            // Best effort: failures surface in telemetry, never to the guest
            error!(
                "Unable to send confirmation email for booking {}: {:?}",
                committed.booking.uid, e
            );
        }
    }
}
