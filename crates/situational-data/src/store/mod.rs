//! Store abstraction
//!
//! The provider only needs two things from a store: run a fixed query and
//! hand back one JSON object per row, and answer a liveness ping.
//! [`PgStore`] talks to PostGIS through a bounded `sqlx` pool;
//! [`MemoryStore`] replays scripted answers for tests and offline demos.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::OnceCell;

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::{PgSettings, PgStore};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("connection pool exhausted")]
    PoolExhausted,
    #[error("query timed out after {0:?}")]
    Timeout(Duration),
    #[error("{0}")]
    Query(String),
    #[error("malformed row {index}: {reason}")]
    MalformedRow { index: usize, reason: String },
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Run a parameterless SELECT and return each row as a JSON object.
    async fn fetch_rows(&self, query: &str) -> Result<Vec<serde_json::Value>, StoreError>;

    /// Cheap round trip used by health checks.
    async fn ping(&self) -> Result<(), StoreError>;
}

/// Shared slot for the store. Starts empty when the connection is still being
/// established; once a store is attached it stays for the life of the process.
#[derive(Clone, Default)]
pub struct StoreHandle {
    slot: Arc<OnceCell<Arc<dyn RecordStore>>>,
}

impl StoreHandle {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn connected(store: Arc<dyn RecordStore>) -> Self {
        let handle = Self::empty();
        handle.attach(store);
        handle
    }

    /// Returns false if a store was already attached; the first one wins.
    pub fn attach(&self, store: Arc<dyn RecordStore>) -> bool {
        self.slot.set(store).is_ok()
    }

    pub fn get(&self) -> Option<&Arc<dyn RecordStore>> {
        self.slot.get()
    }

    pub fn is_attached(&self) -> bool {
        self.slot.initialized()
    }
}

impl From<Option<Arc<dyn RecordStore>>> for StoreHandle {
    fn from(store: Option<Arc<dyn RecordStore>>) -> Self {
        match store {
            Some(store) => Self::connected(store),
            None => Self::empty(),
        }
    }
}

impl std::fmt::Debug for StoreHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreHandle")
            .field("attached", &self.is_attached())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_handle_attaches_once() {
        let handle = StoreHandle::empty();
        let shared = handle.clone();
        assert!(handle.get().is_none());

        assert!(shared.attach(Arc::new(MemoryStore::new())));
        assert!(handle.is_attached());
        assert!(handle.get().unwrap().ping().await.is_ok());

        assert!(!handle.attach(Arc::new(MemoryStore::new().unreachable())));
        assert!(handle.get().unwrap().ping().await.is_ok());
    }
}
