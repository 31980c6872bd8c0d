//! Unified error types for the sorted-numbers service.
//!
//! Startup failures (configuration, connectivity, migrations) and per-request
//! store failures are kept apart so logs can tell them apart, even though the
//! HTTP contract reports every store failure as a 500.

use thiserror::Error;

/// Top-level error type for the service.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration could not be loaded or is invalid.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The store could not be reached at startup.
    #[error("failed to connect to database: {0}")]
    Connect(#[source] sqlx::Error),

    /// Schema migrations failed.
    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    /// Store operation failed outside a request.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// IO error (listener bind, signal handler install).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration loading and validation errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Environment could not be deserialized.
    #[error("failed to read environment: {0}")]
    Env(#[from] envy::Error),

    /// `POSTGRES_DSN` is absent or empty.
    #[error("POSTGRES_DSN is not set")]
    MissingDsn,

    /// `SERVER_ADDR` is not a socket address.
    #[error("invalid SERVER_ADDR {addr:?}: {reason}")]
    InvalidAddr {
        /// The rejected address.
        addr: String,
        /// Parser message.
        reason: String,
    },

    /// Pool limits are inconsistent.
    #[error("invalid pool settings: {0}")]
    InvalidPool(String),

    /// A timeout was set to zero.
    #[error("{name} must be greater than zero")]
    ZeroTimeout {
        /// Environment variable name.
        name: &'static str,
    },
}

/// Errors raised by a [`NumberStore`](crate::store::NumberStore).
#[derive(Error, Debug)]
pub enum StoreError {
    /// The database rejected the statement or could not be reached.
    #[error("{0}")]
    Database(#[from] sqlx::Error),

    /// The store is unavailable for a reason outside the database driver.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Errors returned by [`NumbersClient`](crate::client::NumbersClient).
#[derive(Error, Debug)]
pub enum ClientError {
    /// Transport or body decoding failure.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The base URL could not be joined with an endpoint path.
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),

    /// The service answered with a non-success status.
    #[error("service returned {status}: {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Message from the `error` field of the body.
        message: String,
    },
}

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, AppError>;
