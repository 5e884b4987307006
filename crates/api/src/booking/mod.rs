mod cancel_booking;
mod create_booking;
mod get_booking;
mod reschedule_booking;

use actix_web::web;
use cancel_booking::cancel_booking_controller;
#[cfg(test)]
pub(crate) use cancel_booking::{CancelBookingUseCase, Caller};
use create_booking::create_booking_controller;
use get_booking::get_booking_controller;
use reschedule_booking::reschedule_booking_controller;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/bookings", web::post().to(create_booking_controller))
        .route("/bookings/{uid}", web::get().to(get_booking_controller))
        .route("/bookings/{uid}", web::delete().to(cancel_booking_controller))
        .route("/bookings/{uid}", web::patch().to(reschedule_booking_controller));
}

#[cfg(test)]
pub(crate) fn test_booking(
    setup: &crate::shared::fixtures::TestSetup,
    start_time: chrono::DateTime<chrono::Utc>,
    end_time: chrono::DateTime<chrono::Utc>,
) -> slotbook_domain::Booking {
    slotbook_domain::Booking {
        id: Default::default(),
        uid: slotbook_utils::create_booking_uid(),
        host_id: setup.host.id.clone(),
        event_type_id: setup.event_type.id.clone(),
        start_time,
        end_time,
        guest: slotbook_domain::Guest {
            name: "Ada Lovelace".into(),
            email: "ada@example.com".into(),
            phone: None,
            company: None,
            notes: None,
        },
        guest_timezone: chrono_tz::UTC,
        status: slotbook_domain::BookingStatus::Confirmed,
        idempotency_key: None,
        custom_responses: serde_json::Value::Null,
        external_event_ref: None,
        external_event_created: false,
        meeting_url: None,
        rescheduled_from_uid: None,
        cancelled_at: None,
        created: start_time,
        updated: start_time,
    }
}
