use actix_web::{HttpRequest, HttpResponse, web};
use slotbook_api_structs::cancel_booking::{APIResponse, PathParams, RequestBody};
use slotbook_domain::{
    Booking,
    BookingStatus,
    EventType,
    Host,
    ID,
    generate_ical_content_for_booking,
};
use slotbook_infra::{BookingEmail, EmailTemplate, SlotbookContext};
use tracing::{error, warn};
use validator::Validate;

use crate::{
    error::SlotbookError,
    shared::{
        auth::maybe_host,
        usecase::{Subscriber, UseCase, execute},
    },
};

pub async fn cancel_booking_controller(
    http_req: HttpRequest,
    path_params: web::Path<PathParams>,
    body: Option<web::Json<RequestBody>>,
    ctx: web::Data<SlotbookContext>,
) -> Result<HttpResponse, SlotbookError> {
    let body = body.map(|b| b.into_inner()).unwrap_or_default();
    body.validate()
        .map_err(|e| SlotbookError::BadClientData(e.to_string()))?;

    // The caller is either the authenticated host or the guest identified
    // by their booking email
    let caller = match maybe_host(&http_req, &ctx).await? {
        Some(host) => Caller::Host(host.id),
        None => match &body.email {
            Some(email) => Caller::Guest(email.clone()),
            None => Caller::Anonymous,
        },
    };

    let usecase = CancelBookingUseCase {
        uid: path_params.into_inner().uid,
        caller,
        reason: body.reason,
    };

    execute(usecase, &ctx)
        .await
        .map(|_| HttpResponse::Ok().json(APIResponse { success: true }))
        .map_err(SlotbookError::from)
}

#[derive(Debug)]
pub(crate) enum Caller {
    Host(ID),
    Guest(String),
    Anonymous,
}

#[derive(Debug)]
pub(crate) struct CancelBookingUseCase {
    pub uid: String,
    pub caller: Caller,
    pub reason: Option<String>,
}

#[derive(Debug)]
pub(crate) struct CancelledBooking {
    pub booking: Booking,
    pub event_type: EventType,
    pub host: Host,
    pub reason: Option<String>,
    /// A repeated cancel is acknowledged without side effects
    pub already_cancelled: bool,
}

#[derive(Debug)]
pub(crate) enum UseCaseError {
    BookingNotFound(String),
    Unauthorized,
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
                "Only the host or the guest who booked can cancel this booking".into(),
            ),
            UseCaseError::UpstreamUnavailable => Self::UpstreamUnavailable(
                "The external calendar could not be updated, please retry".into(),
            ),
            UseCaseError::StorageError | UseCaseError::InternalError => Self::InternalError,
        }
    }
}

#[async_trait::async_trait]
impl UseCase for CancelBookingUseCase {
    type Response = CancelledBooking;

    type Error = UseCaseError;

    const NAME: &'static str = "CancelBooking";

    fn subscribers() -> Vec<Box<dyn Subscriber<Self>>> {
        vec![Box::new(NotifyParticipantsOnCancel {})]
    }

    async fn execute(&mut self, ctx: &SlotbookContext) -> Result<Self::Response, Self::Error> {
        let mut booking = ctx
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

        if booking.status == BookingStatus::Cancelled {
            return Ok(CancelledBooking {
                booking,
                event_type,
                host,
                reason: self.reason.take(),
                already_cancelled: true,
            });
        }

        // Fail closed: if the external event cannot be removed the booking
        // is left untouched and the caller retries
        if booking.external_event_created {
            self.delete_external_event(&booking, &event_type, ctx)
                .await?;
        }

        booking.status = BookingStatus::Cancelled;
        booking.cancelled_at = Some(ctx.sys.get_timestamp());
        booking.updated = ctx.sys.get_timestamp();
        ctx.repos
            .bookings
            .save(&booking)
            .await
            .map_err(|_| UseCaseError::StorageError)?;

        Ok(CancelledBooking {
            booking,
            event_type,
            host,
            reason: self.reason.take(),
            already_cancelled: false,
        })
    }
}

impl CancelBookingUseCase {
    async fn delete_external_event(
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
            // The calendar is gone, nothing left to delete
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
            .delete_event(&account, &calendar.external_id, event_ref)
            .await
            .map_err(|e| {
                warn!(
                    "External event deletion failed for booking {}: {:?}",
                    booking.uid, e
                );
                UseCaseError::UpstreamUnavailable
            })
    }
}

/// Emails both participants a cancellation notice
struct NotifyParticipantsOnCancel {}

#[async_trait::async_trait]
impl Subscriber<CancelBookingUseCase> for NotifyParticipantsOnCancel {
    async fn notify(&self, cancelled: &CancelledBooking, ctx: &SlotbookContext) {
        if cancelled.already_cancelled {
            return;
        }

        let ical = generate_ical_content_for_booking(
            &cancelled.booking,
            &cancelled.event_type,
            &cancelled.host,
        );
        let email = BookingEmail {
            template: EmailTemplate::BookingCancelled,
            recipients: vec![
                cancelled.booking.guest.email.clone(),
                cancelled.host.email.clone(),
            ],
            variables: serde_json::json!({
                "bookingUid": cancelled.booking.uid,
                "eventTypeName": cancelled.event_type.name,
                "guestName": cancelled.booking.guest.name,
                "startTime": cancelled.booking.start_time,
                "reason": cancelled.reason,
            }),
            ical_attachment: Some(ical),
        };

        if let Err(e) = ctx.mailer.send(&email).await {
            error!(
                "Unable to send cancellation email for booking {}: {:?}",
                cancelled.booking.uid, e
            );
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        booking::test_booking,
        shared::fixtures::{self, utc},
    };

    fn cancel(uid: &str, caller: Caller) -> CancelBookingUseCase {
        CancelBookingUseCase {
            uid: uid.into(),
            caller,
            reason: Some("schedule conflict".into()),
        }
    }

    #[tokio::test]
    async fn guest_with_matching_email_can_cancel() {
        let setup = fixtures::setup(chrono_tz::UTC).await;
        let booking = test_booking(
            &setup,
            utc("2024-01-15T10:00:00Z"),
            utc("2024-01-15T10:30:00Z"),
        );
        setup.ctx.repos.bookings.insert(&booking).await.unwrap();

        let res = cancel(&booking.uid, Caller::Guest("ADA@example.com ".into()))
            .execute(&setup.ctx)
            .await
            .unwrap();
        assert_eq!(res.booking.status, BookingStatus::Cancelled);
        assert!(res.booking.cancelled_at.is_some());

        let stored = setup
            .ctx
            .repos
            .bookings
            .find_by_uid(&booking.uid)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, BookingStatus::Cancelled);
    }

    #[tokio::test]
    async fn wrong_guest_and_anonymous_callers_are_unauthorized() {
        let setup = fixtures::setup(chrono_tz::UTC).await;
        let booking = test_booking(
            &setup,
            utc("2024-01-15T10:00:00Z"),
            utc("2024-01-15T10:30:00Z"),
        );
        setup.ctx.repos.bookings.insert(&booking).await.unwrap();

        let res = cancel(&booking.uid, Caller::Guest("mallory@example.com".into()))
            .execute(&setup.ctx)
            .await;
        assert!(matches!(res, Err(UseCaseError::Unauthorized)));

        let res = cancel(&booking.uid, Caller::Anonymous)
            .execute(&setup.ctx)
            .await;
        assert!(matches!(res, Err(UseCaseError::Unauthorized)));

        // the booking is untouched
        let stored = setup
            .ctx
            .repos
            .bookings
            .find_by_uid(&booking.uid)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, BookingStatus::Confirmed);
    }

    #[tokio::test]
    async fn owning_host_can_cancel_other_hosts_cannot() {
        let setup = fixtures::setup(chrono_tz::UTC).await;
        let booking = test_booking(
            &setup,
            utc("2024-01-15T10:00:00Z"),
            utc("2024-01-15T10:30:00Z"),
        );
        setup.ctx.repos.bookings.insert(&booking).await.unwrap();

        let res = cancel(&booking.uid, Caller::Host(ID::default()))
            .execute(&setup.ctx)
            .await;
        assert!(matches!(res, Err(UseCaseError::Unauthorized)));

        let res = cancel(&booking.uid, Caller::Host(setup.host.id.clone()))
            .execute(&setup.ctx)
            .await
            .unwrap();
        assert_eq!(res.booking.status, BookingStatus::Cancelled);
    }

    #[tokio::test]
    async fn repeated_cancel_is_acknowledged() {
        let setup = fixtures::setup(chrono_tz::UTC).await;
        let booking = test_booking(
            &setup,
            utc("2024-01-15T10:00:00Z"),
            utc("2024-01-15T10:30:00Z"),
        );
        setup.ctx.repos.bookings.insert(&booking).await.unwrap();

        let first = cancel(&booking.uid, Caller::Host(setup.host.id.clone()))
            .execute(&setup.ctx)
            .await
            .unwrap();
        assert!(!first.already_cancelled);

        let second = cancel(&booking.uid, Caller::Host(setup.host.id.clone()))
            .execute(&setup.ctx)
            .await
            .unwrap();
        assert!(second.already_cancelled);
    }

    #[tokio::test]
    async fn failing_external_delete_leaves_the_booking_confirmed() {
        let setup = fixtures::setup(chrono_tz::UTC).await;
        let mut booking = test_booking(
            &setup,
            utc("2024-01-15T10:00:00Z"),
            utc("2024-01-15T10:30:00Z"),
        );
        booking.external_event_created = true;
        booking.external_event_ref = Some("evt-1".into());
        setup.ctx.repos.bookings.insert(&booking).await.unwrap();

        setup.gateway.set_failing(&setup.account.id, true);
        let res = cancel(&booking.uid, Caller::Host(setup.host.id.clone()))
            .execute(&setup.ctx)
            .await;
        assert!(matches!(res, Err(UseCaseError::UpstreamUnavailable)));

        let stored = setup
            .ctx
            .repos
            .bookings
            .find_by_uid(&booking.uid)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, BookingStatus::Confirmed);

        // once the upstream recovers the cancel goes through and the
        // external event is removed
        setup.gateway.set_failing(&setup.account.id, false);
        cancel(&booking.uid, Caller::Host(setup.host.id.clone()))
            .execute(&setup.ctx)
            .await
            .unwrap();
        assert_eq!(setup.gateway.deleted_events(), vec!["evt-1".to_string()]);
    }

    #[tokio::test]
    async fn unknown_uid_is_not_found() {
        let setup = fixtures::setup(chrono_tz::UTC).await;
        let res = cancel("missing", Caller::Anonymous).execute(&setup.ctx).await;
        assert!(matches!(res, Err(UseCaseError::BookingNotFound(_))));
    }
}
