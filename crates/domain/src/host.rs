use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::shared::entity::{Entity, ID};

/// The owner of event types, connected calendar accounts and bookings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Host {
    pub id: ID,
    pub name: String,
    pub email: String,
    /// IANA zone all working hours are interpreted in
    pub timezone: Tz,
}

impl Host {
    pub fn new(name: String, email: String, timezone: Tz) -> Self {
        Self {
            id: Default::default(),
            name,
            email,
            timezone,
        }
    }
}

impl Entity<ID> for Host {
    fn id(&self) -> ID {
        self.id.clone()
    }
}
