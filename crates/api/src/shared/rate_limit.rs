use std::{
    collections::HashMap,
    sync::Mutex,
};

use chrono::{DateTime, TimeDelta, Utc};

/// Entries are swept once the map grows past this, on access
const SWEEP_THRESHOLD: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndpointClass {
    Booking,
    Availability,
    Oauth,
}

impl EndpointClass {
    /// `(max requests, window length)` per class
    fn limit(&self) -> (u32, TimeDelta) {
        match self {
            EndpointClass::Booking => (10, TimeDelta::seconds(60)),
            EndpointClass::Availability => (30, TimeDelta::seconds(60)),
            EndpointClass::Oauth => (5, TimeDelta::seconds(60)),
        }
    }
}

/// Outcome of a limiter check
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub remaining: u32,
    pub reset_at: DateTime<Utc>,
}

#[derive(Debug)]
struct Window {
    started_at: DateTime<Utc>,
    count: u32,
}

/// Fixed-window request counters per `(endpoint class, client key)`.
///
/// The only process-wide mutable state besides the token refresh locks;
/// access is mutually excluded and expired windows are evicted lazily.
#[derive(Default)]
pub struct RateLimiter {
    windows: Mutex<HashMap<(EndpointClass, String), Window>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check(
        &self,
        class: EndpointClass,
        client_key: &str,
        now: DateTime<Utc>,
    ) -> RateLimitDecision {
        let (max_requests, window_len) = class.limit();

        let mut windows = match self.windows.lock() {
            Ok(windows) => windows,
            Err(poisoned) => poisoned.into_inner(),
        };

        if windows.len() > SWEEP_THRESHOLD {
            windows.retain(|(class, _), w| w.started_at + class.limit().1 > now);
        }

        let window = windows
            .entry((class, client_key.to_string()))
            .or_insert(Window {
                started_at: now,
                count: 0,
            });

        // Expired windows restart on access
        if window.started_at + window_len <= now {
            window.started_at = now;
            window.count = 0;
        }

        let reset_at = window.started_at + window_len;
        if window.count >= max_requests {
            return RateLimitDecision {
                allowed: false,
                remaining: 0,
                reset_at,
            };
        }

        window.count += 1;
        RateLimitDecision {
            allowed: true,
            remaining: max_requests - window.count,
            reset_at,
        }
    }
}
