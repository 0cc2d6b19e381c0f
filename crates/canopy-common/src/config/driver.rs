//! Storage driver configuration.

use std::time::Duration;

/// Configuration passed to `StorageDriver::open`.
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Database name or location understood by the driver.
    pub database: String,
    /// Connection timeout.
    pub connect_timeout: Duration,
    /// Statement timeout.
    pub query_timeout: Duration,
    /// Application name for identification.
    pub application_name: Option<String>,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            database: "canopy".to_string(),
            connect_timeout: Duration::from_secs(10),
            query_timeout: Duration::from_secs(300),
            application_name: Some("canopy".to_string()),
        }
    }
}

impl DriverConfig {
    /// Creates a new driver configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the database name.
    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    /// Sets the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the statement timeout.
    pub fn query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }

    /// Sets the application name.
    pub fn application_name(mut self, name: impl Into<String>) -> Self {
        self.application_name = Some(name.into());
        self
    }
}
