//! Default configuration values

use std::time::Duration;

/// Default database file
pub const DATABASE_PATH: &str = "berth.db";

/// Default SQLite busy timeout (5 seconds)
pub const BUSY_TIMEOUT_MS: u64 = 5_000;

/// Default docker executable
pub const DOCKER_BINARY: &str = "docker";

/// Default user-defined bridge network for plugin containers
pub const PLUGIN_NETWORK: &str = "berth-plugins";

/// Default health poll interval (500 milliseconds)
pub const HEALTH_POLL_INTERVAL_MS: u64 = 500;

/// Default activation health timeout (30 seconds)
pub const HEALTH_TIMEOUT_SECS: u64 = 30;

/// Default event bus capacity
pub const EVENT_CAPACITY: usize = 256;

/// Get busy timeout as Duration
pub fn busy_timeout() -> Duration {
    Duration::from_millis(BUSY_TIMEOUT_MS)
}

/// Get health poll interval as Duration
pub fn health_poll_interval() -> Duration {
    Duration::from_millis(HEALTH_POLL_INTERVAL_MS)
}

/// Get activation health timeout as Duration
pub fn health_timeout() -> Duration {
    Duration::from_secs(HEALTH_TIMEOUT_SECS)
}
