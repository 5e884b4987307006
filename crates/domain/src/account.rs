use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::shared::entity::{Entity, ID};

/// Scopes a connected account must hold for availability to use it
pub const REQUIRED_OAUTH_SCOPES: [&str; 2] = [
    "https://www.googleapis.com/auth/calendar.readonly",
    "https://www.googleapis.com/auth/calendar.freebusy",
];

/// Access tokens are refreshed once they are within this skew of expiry
pub const TOKEN_EXPIRY_SKEW_SECONDS: i64 = 60;

/// One external calendar account connected by a host.
///
/// Token fields hold ciphertext sealed by the token vault, never plaintext.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectedAccount {
    pub id: ID,
    pub host_id: ID,
    /// Identity at the provider, e.g. the account email
    pub external_identity: String,
    pub sealed_access_token: String,
    pub sealed_refresh_token: String,
    pub access_token_expires_at: DateTime<Utc>,
    pub scopes: Vec<String>,
    /// Flipped to false when a token refresh fails; re-consent flips it back
    pub valid: bool,
    /// Soft-failure counter bumped when a busy fetch errors
    pub failed_busy_fetches: i64,
    pub last_synced_at: Option<DateTime<Utc>>,
}

impl Entity<ID> for ConnectedAccount {
    fn id(&self) -> ID {
        self.id.clone()
    }
}

impl ConnectedAccount {
    pub fn has_required_scopes(&self) -> bool {
        REQUIRED_OAUTH_SCOPES
            .iter()
            .all(|required| self.scopes.iter().any(|s| s == required))
    }

    /// Whether availability may query this account at all
    pub fn usable_for_busy(&self) -> bool {
        self.valid && self.has_required_scopes()
    }

    /// Whether the access token needs a refresh before the next request
    pub fn token_expiring(&self, now: DateTime<Utc>) -> bool {
        now + TimeDelta::seconds(TOKEN_EXPIRY_SKEW_SECONDS) > self.access_token_expires_at
    }
}

/// A calendar reconciled from the provider's list for one account.
///
/// Selection is host-controlled and survives reconciliation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Calendar {
    pub id: ID,
    pub account_id: ID,
    /// Identifier at the provider
    pub external_id: String,
    pub name: String,
    pub writable: bool,
    /// Whether busy blocks from this calendar gate availability
    pub selected_for_busy: bool,
}

impl Entity<ID> for Calendar {
    fn id(&self) -> ID {
        self.id.clone()
    }
}

impl Calendar {
    /// Only writable calendars can receive booking events
    pub fn destination_eligible(&self) -> bool {
        self.writable
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn account() -> ConnectedAccount {
        ConnectedAccount {
            id: Default::default(),
            host_id: Default::default(),
            external_identity: "host@example.com".into(),
            sealed_access_token: "sealed".into(),
            sealed_refresh_token: "sealed".into(),
            access_token_expires_at: DateTime::from_timestamp_millis(10_000_000).unwrap(),
            scopes: REQUIRED_OAUTH_SCOPES.iter().map(|s| s.to_string()).collect(),
            valid: true,
            failed_busy_fetches: 0,
            last_synced_at: None,
        }
    }

    #[test]
    fn invalid_or_underscoped_accounts_are_not_usable() {
        assert!(account().usable_for_busy());

        let mut invalid = account();
        invalid.valid = false;
        assert!(!invalid.usable_for_busy());

        let mut underscoped = account();
        underscoped.scopes.pop();
        assert!(!underscoped.usable_for_busy());
    }

    #[test]
    fn token_refresh_uses_a_sixty_second_skew() {
        let acc = account();
        let expiry = acc.access_token_expires_at;
        assert!(!acc.token_expiring(expiry - TimeDelta::seconds(61)));
        assert!(acc.token_expiring(expiry - TimeDelta::seconds(59)));
        assert!(acc.token_expiring(expiry + TimeDelta::seconds(1)));
    }
}
