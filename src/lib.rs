//! Sorted-numbers service.
//!
//! A single HTTP operation stores an integer in PostgreSQL and answers with
//! every stored integer in ascending order:
//!
//! ```text
//! POST /numbers?number=3   -> {"numbers":[3]}
//! POST /numbers?number=1   -> {"numbers":[1,3]}
//! POST /numbers?number=3   -> {"numbers":[1,3,3]}
//! ```
//!
//! The insert and the sorted read are two independent statements, so a
//! concurrent caller's value may or may not show up in a given response.
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from environment
//! - [`error`]: Unified error types
//! - [`store`]: Number storage (PostgreSQL and in-memory)
//! - [`api`]: HTTP API, health checks and OpenAPI document
//! - [`client`]: Typed HTTP client
//! - [`metrics`]: Prometheus metrics
//! - [`utils`]: Signal handling and bounded graceful shutdown

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod metrics;
pub mod store;
pub mod utils;

pub use config::Config;
pub use error::{AppError, Result};
