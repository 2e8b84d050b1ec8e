use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{RecordStore, StoreError};

#[derive(Debug, Clone)]
enum Scripted {
    Rows(Vec<Value>),
    Fail(StoreError),
    Stall,
}

/// In-memory store answering each query text with a scripted result.
///
/// Unscripted queries fail, the way an unknown relation would.
#[derive(Debug, Default)]
pub struct MemoryStore {
    answers: HashMap<String, Scripted>,
    unreachable: bool,
    calls: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(mut self, query: &str, rows: Vec<Value>) -> Self {
        self.answers.insert(query.to_string(), Scripted::Rows(rows));
        self
    }

    pub fn with_failure(mut self, query: &str, error: StoreError) -> Self {
        self.answers.insert(query.to_string(), Scripted::Fail(error));
        self
    }

    /// The query never completes; callers must bound it with a timeout.
    pub fn with_stall(mut self, query: &str) -> Self {
        self.answers.insert(query.to_string(), Scripted::Stall);
        self
    }

    /// Pings fail as if the server went away.
    pub fn unreachable(mut self) -> Self {
        self.unreachable = true;
        self
    }

    /// Number of `fetch_rows` calls served so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn fetch_rows(&self, query: &str) -> Result<Vec<Value>, StoreError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        match self.answers.get(query) {
            Some(Scripted::Rows(rows)) => Ok(rows.clone()),
            Some(Scripted::Fail(err)) => Err(err.clone()),
            Some(Scripted::Stall) => std::future::pending().await,
            None => Err(StoreError::Query(format!("no scripted answer for query: {}", query.trim()))),
        }
    }

    async fn ping(&self) -> Result<(), StoreError> {
        if self.unreachable {
            Err(StoreError::Connect("connection refused".into()))
        } else {
            Ok(())
        }
    }
}
