use serde::{Deserialize, Serialize};
use slotbook_domain::{Calendar, ID};
use validator::Validate;

use crate::dtos::{CalendarDTO, ConnectedAccountDTO};

pub mod connect_account {
    use super::*;

    /// Request body for connecting (or re-consenting) a calendar account.
    ///
    /// Carries the token exchange result of an OAuth dance that completed
    /// elsewhere; this endpoint never sees an authorization code.
    #[derive(Debug, Serialize, Deserialize, Validate)]
    #[serde(rename_all = "camelCase")]
    pub struct RequestBody {
        #[validate(email)]
        pub external_identity: String,
        #[validate(length(min = 1))]
        pub access_token: String,
        #[validate(length(min = 1))]
        pub refresh_token: String,
        /// Access token lifetime in seconds
        pub expires_in: i64,
        /// Space-separated granted scopes
        pub scope: String,
    }

    /// API response for connecting an account
    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct APIResponse {
        pub account: ConnectedAccountDTO,
        /// Calendars reconciled from the provider
        pub calendars: Vec<CalendarDTO>,
    }

    impl APIResponse {
        pub fn new(account: slotbook_domain::ConnectedAccount, calendars: Vec<Calendar>) -> Self {
            Self {
                account: ConnectedAccountDTO::new(account),
                calendars: calendars.into_iter().map(CalendarDTO::new).collect(),
            }
        }
    }
}

pub mod get_calendars {
    use super::*;

    #[derive(Debug, Deserialize)]
    pub struct PathParams {
        pub account_id: ID,
    }

    /// API response for listing an account's calendars
    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct APIResponse {
        pub calendars: Vec<CalendarDTO>,
    }

    impl APIResponse {
        pub fn new(calendars: Vec<Calendar>) -> Self {
            Self {
                calendars: calendars.into_iter().map(CalendarDTO::new).collect(),
            }
        }
    }
}

pub mod select_calendars {
    use super::*;

    #[derive(Debug, Deserialize)]
    pub struct PathParams {
        pub account_id: ID,
    }

    /// Request body replacing the set of calendars used for busy checks
    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct RequestBody {
        pub selected_for_busy: Vec<ID>,
    }

    pub type APIResponse = super::get_calendars::APIResponse;
}
