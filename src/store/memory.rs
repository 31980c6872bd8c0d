//! In-memory number store for unit testing.
//!
//! This module provides a store that can be used in tests without a running
//! database, with switches to make individual operations fail.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::StoreError;

use super::{NumberStore, Record};

/// Configuration for mock store behavior.
#[derive(Debug, Clone, Default)]
pub struct MockStoreConfig {
    /// Whether to fail inserts.
    pub fail_insert: bool,
    /// Whether to fail sorted reads.
    pub fail_list: bool,
    /// Whether to fail pings.
    pub fail_ping: bool,
}

/// Store keeping records in a vector, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct MemoryNumberStore {
    config: MockStoreConfig,
    records: Arc<Mutex<Vec<Record>>>,
    pings: Arc<AtomicUsize>,
}

impl MemoryNumberStore {
    /// Create an empty store that never fails.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store with custom failure switches.
    pub fn with_config(config: MockStoreConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Number of stored records, regardless of failure switches.
    pub fn len(&self) -> usize {
        self.records.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of pings received so far.
    pub fn ping_count(&self) -> usize {
        self.pings.load(Ordering::SeqCst)
    }

    /// Drop every record.
    pub fn clear(&self) {
        if let Ok(mut records) = self.records.lock() {
            records.clear();
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Vec<Record>>, StoreError> {
        self.records
            .lock()
            .map_err(|_| StoreError::Unavailable("record lock poisoned".to_string()))
    }
}

#[async_trait]
impl NumberStore for MemoryNumberStore {
    async fn insert(&self, value: i32) -> Result<Record, StoreError> {
        if self.config.fail_insert {
            return Err(StoreError::Unavailable("mock insert failure".to_string()));
        }

        let record = Record {
            id: Uuid::new_v4(),
            value,
        };
        self.lock()?.push(record.clone());
        Ok(record)
    }

    async fn list_sorted(&self) -> Result<Vec<Record>, StoreError> {
        if self.config.fail_list {
            return Err(StoreError::Unavailable("mock list failure".to_string()));
        }

        let mut records = self.lock()?.clone();
        // stable: equal values keep insertion order
        records.sort_by_key(|r| r.value);
        Ok(records)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.pings.fetch_add(1, Ordering::SeqCst);
        if self.config.fail_ping {
            return Err(StoreError::Unavailable("mock ping failure".to_string()));
        }
        Ok(())
    }
}
