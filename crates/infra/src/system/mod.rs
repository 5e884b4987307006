use std::sync::Mutex;

use chrono::{DateTime, Utc};

// Mocking out time so that it is possible to run tests that depend on time.
pub trait ISys: Send + Sync {
    /// The current timestamp in millis
    fn get_timestamp_millis(&self) -> i64;
    fn get_timestamp(&self) -> DateTime<Utc>;
}

/// System that gets the real time and is used when not testing
pub struct RealSys {}
impl ISys for RealSys {
    fn get_timestamp_millis(&self) -> i64 {
        Utc::now().timestamp_millis()
    }

    fn get_timestamp(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// System pinned to a fixed instant, advanced explicitly by tests
pub struct FakeSys {
    now: Mutex<DateTime<Utc>>,
}

impl FakeSys {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        if let Ok(mut guard) = self.now.lock() {
            *guard = now;
        }
    }
}

impl ISys for FakeSys {
    fn get_timestamp_millis(&self) -> i64 {
        self.get_timestamp().timestamp_millis()
    }

    fn get_timestamp(&self) -> DateTime<Utc> {
        self.now.lock().map(|now| *now).unwrap_or_else(|_| Utc::now())
    }
}
