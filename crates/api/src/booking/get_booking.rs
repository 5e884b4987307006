use actix_web::{HttpResponse, web};
use slotbook_api_structs::get_booking::{APIResponse, PathParams};
use slotbook_domain::Booking;
use slotbook_infra::SlotbookContext;

use crate::{
    error::SlotbookError,
    shared::usecase::{UseCase, execute},
};

pub async fn get_booking_controller(
    path_params: web::Path<PathParams>,
    ctx: web::Data<SlotbookContext>,
) -> Result<HttpResponse, SlotbookError> {
    let usecase = GetBookingUseCase {
        uid: path_params.into_inner().uid,
    };

    execute(usecase, &ctx)
        .await
        .map(|booking| HttpResponse::Ok().json(APIResponse::new(booking)))
        .map_err(SlotbookError::from)
}

#[derive(Debug)]
pub(crate) struct GetBookingUseCase {
    pub uid: String,
}

#[derive(Debug)]
pub(crate) enum UseCaseError {
    BookingNotFound(String),
    InternalError,
}

impl From<UseCaseError> for SlotbookError {
    fn from(e: UseCaseError) -> Self {
        match e {
            UseCaseError::BookingNotFound(uid) => {
                Self::NotFound(format!("Booking {} was not found", uid))
            }
            UseCaseError::InternalError => Self::InternalError,
        }
    }
}

#[async_trait::async_trait]
impl UseCase for GetBookingUseCase {
    type Response = Booking;

    type Error = UseCaseError;

    const NAME: &'static str = "GetBooking";

    async fn execute(&mut self, ctx: &SlotbookContext) -> Result<Self::Response, Self::Error> {
        ctx.repos
            .bookings
            .find_by_uid(&self.uid)
            .await
            .map_err(|_| UseCaseError::InternalError)?
            .ok_or_else(|| UseCaseError::BookingNotFound(self.uid.clone()))
    }
}

#[cfg(test)]
mod test {
    use slotbook_api_structs::dtos::BookingDTO;

    use super::*;
    use crate::{
        booking::test_booking,
        shared::fixtures::{self, utc},
    };

    #[tokio::test]
    async fn finds_by_uid_and_strips_host_private_fields() {
        let setup = fixtures::setup(chrono_tz::UTC).await;
        let mut booking = test_booking(
            &setup,
            utc("2024-01-15T10:00:00Z"),
            utc("2024-01-15T10:30:00Z"),
        );
        booking.idempotency_key = Some("secret-key".into());
        setup.ctx.repos.bookings.insert(&booking).await.unwrap();

        let mut usecase = GetBookingUseCase {
            uid: booking.uid.clone(),
        };
        let found = usecase.execute(&setup.ctx).await.unwrap();
        assert_eq!(found.uid, booking.uid);

        // the public view hides guest contact details and internal keys
        let view = serde_json::to_value(BookingDTO::new(found)).unwrap();
        assert!(view.get("idempotencyKey").is_none());
        assert!(view.get("guestEmail").is_none());
        assert_eq!(view["guestName"], "Ada Lovelace");

        let mut missing = GetBookingUseCase {
            uid: "missing".into(),
        };
        assert!(matches!(
            missing.execute(&setup.ctx).await,
            Err(UseCaseError::BookingNotFound(_))
        ));
    }
}
