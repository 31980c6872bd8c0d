//! Application configuration loaded from environment variables.

use std::net::SocketAddr;
use std::time::Duration;

use serde::Deserialize;
use url::Url;

use crate::error::ConfigError;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // === Database ===
    /// PostgreSQL connection string. Required.
    #[serde(default)]
    pub postgres_dsn: Option<String>,

    // === Connection Pool ===
    /// Upper bound on open connections.
    #[serde(default = "default_max_connections")]
    pub pool_max_connections: u32,

    /// Connections kept open while idle.
    #[serde(default = "default_min_connections")]
    pub pool_min_connections: u32,

    /// Maximum age of a connection before it is recycled.
    #[serde(default = "default_max_lifetime")]
    pub pool_max_lifetime_secs: u64,

    /// Maximum idle time before a connection is closed.
    #[serde(default = "default_max_idle")]
    pub pool_max_idle_secs: u64,

    /// Period of the background health check.
    #[serde(default = "default_health_check")]
    pub pool_health_check_secs: u64,

    /// How long a request waits for a free connection.
    #[serde(default = "default_acquire_timeout")]
    pub pool_acquire_timeout_secs: u64,

    // === Server Configuration ===
    /// Listener address for the HTTP server.
    #[serde(default = "default_server_addr")]
    pub server_addr: String,

    /// Per-request deadline.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Bounded wait for in-flight requests on shutdown.
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,

    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub rust_log: String,
}

/// Connection pool limits, resolved to durations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolSettings {
    pub max_connections: u32,
    pub min_connections: u32,
    pub max_lifetime: Duration,
    pub max_idle: Duration,
    pub health_check_period: Duration,
    pub acquire_timeout: Duration,
}

fn default_max_connections() -> u32 {
    60
}

fn default_min_connections() -> u32 {
    10
}

fn default_max_lifetime() -> u64 {
    120
}

fn default_max_idle() -> u64 {
    20
}

fn default_health_check() -> u64 {
    30
}

fn default_acquire_timeout() -> u64 {
    5
}

fn default_server_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_shutdown_timeout() -> u64 {
    10
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from environment, reading .env file first.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Ok(envy::from_env()?)
    }

    /// Build configuration from explicit key/value pairs (uppercase keys).
    pub fn from_pairs<I>(pairs: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        Ok(envy::from_iter(pairs)?)
    }

    /// Check if the configuration is valid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.dsn()?;
        self.bind_addr()?;

        if self.pool_max_connections == 0 {
            return Err(ConfigError::InvalidPool(
                "POOL_MAX_CONNECTIONS must be at least 1".to_string(),
            ));
        }

        if self.pool_min_connections > self.pool_max_connections {
            return Err(ConfigError::InvalidPool(format!(
                "POOL_MIN_CONNECTIONS ({}) exceeds POOL_MAX_CONNECTIONS ({})",
                self.pool_min_connections, self.pool_max_connections
            )));
        }

        let timeouts = [
            ("POOL_MAX_LIFETIME_SECS", self.pool_max_lifetime_secs),
            ("POOL_MAX_IDLE_SECS", self.pool_max_idle_secs),
            ("POOL_HEALTH_CHECK_SECS", self.pool_health_check_secs),
            ("POOL_ACQUIRE_TIMEOUT_SECS", self.pool_acquire_timeout_secs),
            ("REQUEST_TIMEOUT_SECS", self.request_timeout_secs),
            ("SHUTDOWN_TIMEOUT_SECS", self.shutdown_timeout_secs),
        ];
        if let Some((name, _)) = timeouts.iter().find(|(_, secs)| *secs == 0) {
            return Err(ConfigError::ZeroTimeout { name: *name });
        }

        Ok(())
    }

    /// The connection string, or [`ConfigError::MissingDsn`] if absent or blank.
    pub fn dsn(&self) -> Result<&str, ConfigError> {
        match self.postgres_dsn.as_deref().map(str::trim) {
            Some(dsn) if !dsn.is_empty() => Ok(dsn),
            _ => Err(ConfigError::MissingDsn),
        }
    }

    /// Parsed listener address. A bare `:port` binds every interface.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let addr = self.server_addr.trim();
        let addr = match addr.strip_prefix(':') {
            Some(port) => format!("0.0.0.0:{port}"),
            None => addr.to_string(),
        };

        addr.parse()
            .map_err(|e: std::net::AddrParseError| ConfigError::InvalidAddr {
                addr: self.server_addr.clone(),
                reason: e.to_string(),
            })
    }

    /// Pool limits as durations.
    pub fn pool_settings(&self) -> PoolSettings {
        PoolSettings {
            max_connections: self.pool_max_connections,
            min_connections: self.pool_min_connections,
            max_lifetime: Duration::from_secs(self.pool_max_lifetime_secs),
            max_idle: Duration::from_secs(self.pool_max_idle_secs),
            health_check_period: Duration::from_secs(self.pool_health_check_secs),
            acquire_timeout: Duration::from_secs(self.pool_acquire_timeout_secs),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }

    /// Connection string with the password masked, for logs and `check-config`.
    pub fn redacted_dsn(&self) -> Option<String> {
        let dsn = self.dsn().ok()?;
        match Url::parse(dsn) {
            Ok(mut url) => {
                if url.password().is_some() {
                    // set_password only fails for cannot-be-a-base URLs
                    let _ = url.set_password(Some("****"));
                }
                Some(url.to_string())
            }
            // key=value form; never echo it back
            Err(_) => Some("<unparsed dsn>".to_string()),
        }
    }
}
