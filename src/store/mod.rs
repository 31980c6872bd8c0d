//! Number storage.
//!
//! This module handles:
//! - The [`Record`] type and the [`NumberStore`] query interface
//! - PostgreSQL-backed storage with a bounded connection pool
//! - In-memory storage for tests

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::StoreError;

pub use memory::{MemoryNumberStore, MockStoreConfig};
pub use postgres::{spawn_health_check, PgNumberStore};

/// One stored number with its system-generated identifier.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Record {
    /// Assigned by the store on insert, never reused.
    pub id: Uuid,
    /// Caller-supplied value.
    #[sqlx(rename = "number")]
    pub value: i32,
}

/// Insert-and-list query pair backing the numbers endpoint.
///
/// The two operations are independent statements; callers that run them back
/// to back get no atomicity between them.
#[async_trait]
pub trait NumberStore: Send + Sync + std::fmt::Debug {
    /// Store `value` as a new record.
    async fn insert(&self, value: i32) -> Result<Record, StoreError>;

    /// Every stored record ordered by value ascending. Ties have no defined order.
    async fn list_sorted(&self) -> Result<Vec<Record>, StoreError>;

    /// Round-trip to the store without touching data.
    async fn ping(&self) -> Result<(), StoreError>;
}
