pub mod get_availability {
    use std::collections::BTreeMap;

    use serde::{Deserialize, Serialize};
    use slotbook_domain::{ID, SlotsDate, Tz};

    use crate::dtos::SlotDTO;

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct QueryParams {
        pub event_type_id: ID,
        /// Local date, YYYY-MM-DD
        pub start_date: String,
        /// Local date, YYYY-MM-DD (inclusive)
        pub end_date: String,
        /// Guest timezone used for date grouping; defaults to UTC
        pub timezone: Option<Tz>,
    }

    /// API response for listing bookable slots.
    ///
    /// Keys are local dates in the guest timezone; slot instants are UTC.
    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct APIResponse {
        pub slots: BTreeMap<String, Vec<SlotDTO>>,
        pub timezone: String,
    }

    impl APIResponse {
        pub fn new(dates: Vec<SlotsDate>, timezone: Tz) -> Self {
            Self {
                slots: dates
                    .into_iter()
                    .map(|d| (d.date, d.slots.into_iter().map(SlotDTO::new).collect()))
                    .collect(),
                timezone: timezone.to_string(),
            }
        }
    }

}
