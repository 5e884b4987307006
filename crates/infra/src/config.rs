use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: usize,
    /// Deadline for a single free/busy fetch against one external account.
    /// An account that misses it contributes an empty busy list.
    pub busy_fetch_timeout: Duration,
    /// Maximum allowed duration in millis for an availability query.
    /// This is used to avoid having clients ask for slots in a timespan of
    /// several years which will take a lot of time to compute and is also
    /// not very useful information to query about anyways.
    pub availability_query_duration_limit: i64,
}

impl Config {
    pub fn new() -> Self {
        let app_config = &slotbook_utils::config::APP_CONFIG;
        Self {
            port: app_config.http_port,
            busy_fetch_timeout: Duration::from_millis(app_config.busy_fetch_timeout_millis),
            availability_query_duration_limit: app_config.availability_query_duration_limit,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
