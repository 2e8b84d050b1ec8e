//! Response envelope shared by every domain endpoint

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Source of capture timestamps.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock used in production.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock pinned to one instant, for deterministic envelopes.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// `{success, data, count, timestamp, note?}`
///
/// Fields are private so `count` can only ever be the length of `data`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseEnvelope<R> {
    success: bool,
    data: Vec<R>,
    count: usize,
    timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    note: Option<String>,
}

impl<R> ResponseEnvelope<R> {
    /// Wrap records; the timestamp is taken from `clock` at this call.
    pub fn new(data: Vec<R>, note: Option<String>, clock: &dyn Clock) -> Self {
        Self {
            success: true,
            count: data.len(),
            data,
            timestamp: clock.now(),
            note,
        }
    }

    pub fn success(&self) -> bool {
        self.success
    }

    pub fn data(&self) -> &[R] {
        &self.data
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn note(&self) -> Option<&str> {
        self.note.as_deref()
    }

    /// True when the data came from a fallback set.
    pub fn is_degraded(&self) -> bool {
        self.note.is_some()
    }
}
