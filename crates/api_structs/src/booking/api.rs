use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::dtos::BookingDTO;

/// Booking object
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingResponse {
    /// Booking retrieved or created
    pub booking: BookingDTO,
}

impl BookingResponse {
    pub fn new(booking: slotbook_domain::Booking) -> Self {
        Self {
            booking: BookingDTO::new(booking),
        }
    }
}

/// The guest identity attached to a booking request
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GuestRequestBody {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(max = 50))]
    pub phone: Option<String>,
    #[validate(length(max = 200))]
    pub company: Option<String>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

pub mod create_booking {
    use std::collections::HashMap;

    use chrono::{DateTime, Utc};
    use slotbook_domain::{ID, Tz};

    use super::*;

    /// Request body for committing a booking
    #[derive(Debug, Serialize, Deserialize, Validate)]
    #[serde(rename_all = "camelCase")]
    pub struct RequestBody {
        pub event_type_id: ID,
        pub start_time: DateTime<Utc>,
        /// Guest timezone, used for date grouping and confirmation emails
        pub timezone: Tz,
        #[validate(nested)]
        pub guest: GuestRequestBody,
        /// Answers to the event type's custom questions, keyed by label
        pub custom_responses: Option<HashMap<String, String>>,
        #[validate(length(min = 1, max = 255))]
        pub idempotency_key: Option<String>,
    }

    pub type APIResponse = BookingResponse;
}

pub mod get_booking {
    use super::*;

    #[derive(Debug, Deserialize)]
    pub struct PathParams {
        pub uid: String,
    }

    pub type APIResponse = BookingResponse;
}

pub mod cancel_booking {
    use super::*;

    #[derive(Debug, Deserialize)]
    pub struct PathParams {
        pub uid: String,
    }

    /// Request body for cancelling a booking.
    ///
    /// The email identifies the guest; the host cancels through the
    /// authenticated host surface instead.
    #[derive(Debug, Default, Serialize, Deserialize, Validate)]
    #[serde(rename_all = "camelCase")]
    pub struct RequestBody {
        #[validate(email)]
        pub email: Option<String>,
        #[validate(length(max = 2000))]
        pub reason: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct APIResponse {
        pub success: bool,
    }
}

pub mod reschedule_booking {
    use chrono::{DateTime, Utc};
    use slotbook_domain::Tz;

    use super::*;

    #[derive(Debug, Deserialize)]
    pub struct PathParams {
        pub uid: String,
    }

    #[derive(Debug, Serialize, Deserialize, Validate)]
    #[serde(rename_all = "camelCase")]
    pub struct RequestBody {
        pub new_start_time: DateTime<Utc>,
        pub timezone: Tz,
        #[validate(email)]
        pub email: Option<String>,
    }

    pub type APIResponse = BookingResponse;
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn it_validates_guest_email() {
        let guest = GuestRequestBody {
            name: "Ada".into(),
            email: "not-an-email".into(),
            phone: None,
            company: None,
            notes: None,
        };
        assert!(guest.validate().is_err());

        let guest = GuestRequestBody {
            email: "ada@example.com".into(),
            ..guest
        };
        assert!(guest.validate().is_ok());
    }
}
