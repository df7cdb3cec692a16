//! Engine configuration passed to `Database::with_options`.

use std::time::Duration;

const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Connection settings applied to every session a `Database` opens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOptions {
    /// How long SQLite waits on a locked database before failing.
    pub busy_timeout: Duration,
    /// Enables SQLite foreign-key enforcement per connection.
    pub foreign_keys: bool,
    /// PostgreSQL connect timeout; `None` waits for the OS.
    pub connect_timeout: Option<Duration>,
    /// Logs every statement at debug level.
    pub echo: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
            foreign_keys: true,
            connect_timeout: None,
            echo: false,
        }
    }
}
