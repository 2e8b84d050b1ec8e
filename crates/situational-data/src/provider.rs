//! Resilient Data Provider
//!
//! One provider serves every domain. For each request it:
//!
//! 1. serves the fallback set if no store is attached (offline/demo mode, or
//!    the startup connection has not completed yet)
//! 2. runs the domain's fixed query, bounded by a timeout
//! 3. decodes and validates every row into the domain's record type
//! 4. on any store-side failure, serves the fallback set with a note
//!
//! An empty live result is a real answer and is never replaced by fallback
//! data. Nothing is retried.

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::domain::Domain;
use crate::envelope::{Clock, ResponseEnvelope};
use crate::fallback::FallbackSet;
use crate::records::DomainRecord;
use crate::store::{RecordStore, StoreError, StoreHandle};

pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Why an envelope carries fallback data. The display text is the envelope note.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Degradation {
    /// No store handle; permanent until reconfigured.
    #[error("store not connected")]
    StoreUnavailable,
    /// Store present but this query did not produce usable rows.
    #[error("store query failed: {0}")]
    QueryFailed(StoreError),
}

/// Everything the provider needs to serve one domain.
#[derive(Debug, Clone)]
pub struct DomainDescriptor<R> {
    query: String,
    fallback: FallbackSet<R>,
}

impl<R: DomainRecord> DomainDescriptor<R> {
    pub fn new(query: impl Into<String>, fallback: FallbackSet<R>) -> Self {
        Self {
            query: query.into(),
            fallback,
        }
    }

    pub fn domain(&self) -> Domain {
        R::DOMAIN
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn fallback(&self) -> &FallbackSet<R> {
        &self.fallback
    }
}

pub struct ResilientProvider {
    store: StoreHandle,
    clock: Arc<dyn Clock>,
    query_timeout: Duration,
}

impl ResilientProvider {
    pub fn new(store: Option<Arc<dyn RecordStore>>, clock: Arc<dyn Clock>) -> Self {
        Self::with_handle(StoreHandle::from(store), clock)
    }

    /// Provider over a handle the store may be attached to later.
    pub fn with_handle(store: StoreHandle, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            query_timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }

    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }

    pub fn store(&self) -> Option<&Arc<dyn RecordStore>> {
        self.store.get()
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub fn query_timeout(&self) -> Duration {
        self.query_timeout
    }

    /// Live rows when the store answers, fallback rows with a note otherwise.
    pub async fn fetch<R: DomainRecord>(&self, descriptor: &DomainDescriptor<R>) -> ResponseEnvelope<R> {
        let domain = descriptor.domain();

        match self.load(descriptor).await {
            Ok(records) => {
                debug!(%domain, count = records.len(), "serving live records");
                ResponseEnvelope::new(records, None, self.clock())
            }
            Err(degradation) => {
                match &degradation {
                    Degradation::StoreUnavailable => {
                        warn!(%domain, "store not connected, serving fallback set");
                    }
                    Degradation::QueryFailed(reason) => {
                        warn!(%domain, %reason, "store query failed, serving fallback set");
                    }
                }
                ResponseEnvelope::new(
                    descriptor.fallback().to_vec(),
                    Some(degradation.to_string()),
                    self.clock(),
                )
            }
        }
    }

    async fn load<R: DomainRecord>(&self, descriptor: &DomainDescriptor<R>) -> Result<Vec<R>, Degradation> {
        let store = self.store.get().ok_or(Degradation::StoreUnavailable)?;

        let rows = tokio::time::timeout(self.query_timeout, store.fetch_rows(descriptor.query()))
            .await
            .map_err(|_| Degradation::QueryFailed(StoreError::Timeout(self.query_timeout)))?
            .map_err(Degradation::QueryFailed)?;

        decode_rows(rows).map_err(Degradation::QueryFailed)
    }
}

/// One bad row taints the whole result; partial live data is never mixed with fallback.
fn decode_rows<R: DomainRecord>(rows: Vec<serde_json::Value>) -> Result<Vec<R>, StoreError> {
    rows.into_iter()
        .enumerate()
        .map(|(index, row)| {
            let record: R = serde_json::from_value(row).map_err(|e| StoreError::MalformedRow {
                index,
                reason: e.to_string(),
            })?;
            record
                .validate()
                .map_err(|reason| StoreError::MalformedRow { index, reason })?;
            Ok(record)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::FixedClock;
    use crate::fallback::{builtin_incidents, builtin_shelters};
    use crate::records::{Incident, RecordId, Shelter};
    use crate::store::MemoryStore;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    const SHELTER_QUERY: &str = "SELECT * FROM shelters";
    const INCIDENT_QUERY: &str = "SELECT * FROM active_incidents_view LIMIT 10";

    fn clock() -> Arc<dyn Clock> {
        Arc::new(FixedClock(Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()))
    }

    fn shelters() -> DomainDescriptor<Shelter> {
        DomainDescriptor::new(SHELTER_QUERY, FallbackSet::new(builtin_shelters()).unwrap())
    }

    fn incidents() -> DomainDescriptor<Incident> {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        DomainDescriptor::new(INCIDENT_QUERY, FallbackSet::new(builtin_incidents(now)).unwrap())
    }

    fn with_store(store: MemoryStore) -> ResilientProvider {
        ResilientProvider::new(Some(Arc::new(store)), clock())
    }

    fn shelter_row(id: i64, available: i64) -> serde_json::Value {
        json!({
            "id": id,
            "facility_name": format!("Shelter {}", id),
            "facility_type": "School",
            "longitude": -122.15,
            "latitude": 37.43,
            "address": null,
            "total_capacity": 300,
            "current_occupancy": 300 - available,
            "available_capacity": available,
            "operational_status": "Open",
            "has_kitchen": false,
            "has_medical": false,
            "wheelchair_accessible": true,
            "contact_phone": null
        })
    }

    #[tokio::test]
    async fn test_no_store_serves_named_shelters() {
        let provider = ResilientProvider::new(None, clock());
        let envelope = provider.fetch(&shelters()).await;

        assert!(envelope.success());
        assert_eq!(envelope.count(), 2);
        let names: Vec<_> = envelope.data().iter().filter_map(|s| s.facility_name.as_deref()).collect();
        assert_eq!(names, ["Mitchell Park Community Center", "Cubberley Community Center"]);
        assert_eq!(envelope.data()[1].total_capacity, Some(200));
        assert_eq!(envelope.data()[1].available_capacity, Some(120));
        assert!(envelope.note().unwrap().contains("not connected"));
    }

    #[tokio::test]
    async fn test_empty_live_result_is_not_degraded() {
        let provider = with_store(MemoryStore::new().with_rows(INCIDENT_QUERY, vec![]));
        let envelope = provider.fetch(&incidents()).await;

        assert!(envelope.success());
        assert!(envelope.data().is_empty());
        assert_eq!(envelope.count(), 0);
        assert_eq!(envelope.note(), None);
    }

    #[tokio::test]
    async fn test_live_rows_served_in_order() {
        let rows = vec![shelter_row(9, 250), shelter_row(4, 10)];
        let provider = with_store(MemoryStore::new().with_rows(SHELTER_QUERY, rows));
        let envelope = provider.fetch(&shelters()).await;

        assert_eq!(envelope.count(), 2);
        assert_eq!(envelope.data()[0].facility_name.as_deref(), Some("Shelter 9"));
        assert_eq!(envelope.data()[1].available_capacity, Some(10));
        assert!(!envelope.is_degraded());
    }

    #[tokio::test]
    async fn test_nullable_columns_and_extra_columns_served_live() {
        let rows = vec![
            json!({
                "id": 41,
                "incident_number": "INC-2025-000041",
                "incident_type": "Gas Leak",
                "severity": "High",
                "priority": 1,
                "status": "Active",
                "longitude": -122.16,
                "latitude": 37.44,
                "title": "Gas odor reported",
                "reported_at": "2025-06-01T11:30:00+00:00",
                "assigned_units": 3
            }),
            json!({
                "id": 42,
                "incident_number": "INC-2025-000042",
                "longitude": null,
                "latitude": null,
                "title": null,
                "reported_at": "2025-06-01 11:45:00",
                "assigned_units": 0
            }),
        ];
        let envelope = with_store(MemoryStore::new().with_rows(INCIDENT_QUERY, rows))
            .fetch(&incidents())
            .await;

        assert_eq!(envelope.note(), None);
        assert_eq!(envelope.count(), 2);
        assert_eq!(envelope.data()[0].id, RecordId::Int(41));
        assert_eq!(envelope.data()[1].longitude, None);

        let body = serde_json::to_value(&envelope).unwrap();
        assert_eq!(body["data"][0]["assigned_units"], 3);
        assert_eq!(body["data"][1]["assigned_units"], 0);
        assert_eq!(body["data"][1]["longitude"], serde_json::Value::Null);
    }

    #[tokio::test]
    async fn test_store_attached_after_startup() {
        let handle = StoreHandle::empty();
        let provider = ResilientProvider::with_handle(handle.clone(), clock());

        let before = provider.fetch(&shelters()).await;
        assert!(before.note().unwrap().contains("not connected"));

        handle.attach(Arc::new(MemoryStore::new().with_rows(SHELTER_QUERY, vec![shelter_row(5, 60)])));
        let after = provider.fetch(&shelters()).await;
        assert_eq!(after.note(), None);
        assert_eq!(after.data()[0].id, RecordId::Int(5));
    }

    #[tokio::test]
    async fn test_connection_reset_serves_fallback() {
        let store = MemoryStore::new().with_failure(
            INCIDENT_QUERY,
            StoreError::Connect("connection reset by peer".into()),
        );
        let envelope = with_store(store).fetch(&incidents()).await;

        assert!(envelope.success());
        assert_eq!(envelope.data(), incidents().fallback().records());
        let note = envelope.note().unwrap();
        assert!(note.contains("failed"));
        assert!(note.contains("connection reset by peer"));
    }

    #[tokio::test]
    async fn test_pool_exhaustion_serves_fallback() {
        let store = MemoryStore::new().with_failure(SHELTER_QUERY, StoreError::PoolExhausted);
        let envelope = with_store(store).fetch(&shelters()).await;

        assert_eq!(envelope.count(), 2);
        assert_eq!(envelope.note(), Some("store query failed: connection pool exhausted"));
    }

    #[tokio::test]
    async fn test_stalled_query_times_out_to_fallback() {
        let provider = with_store(MemoryStore::new().with_stall(SHELTER_QUERY))
            .with_query_timeout(Duration::from_millis(20));
        let envelope = provider.fetch(&shelters()).await;

        assert_eq!(envelope.count(), 2);
        assert!(envelope.note().unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn test_malformed_row_serves_fallback() {
        let rows = vec![shelter_row(1, 5), json!({"id": 2, "total_capacity": "full"})];
        let envelope = with_store(MemoryStore::new().with_rows(SHELTER_QUERY, rows))
            .fetch(&shelters())
            .await;

        assert_eq!(envelope.data(), shelters().fallback().records());
        assert!(envelope.note().unwrap().contains("malformed row 1"));
    }

    #[tokio::test]
    async fn test_invalid_coordinates_serve_fallback() {
        let mut row = shelter_row(1, 5);
        row["latitude"] = json!(137.43);
        let envelope = with_store(MemoryStore::new().with_rows(SHELTER_QUERY, vec![row]))
            .fetch(&shelters())
            .await;

        assert!(envelope.is_degraded());
        assert_eq!(envelope.count(), 2);
    }

    #[tokio::test]
    async fn test_repeated_fetch_is_idempotent() {
        let provider = with_store(MemoryStore::new().with_rows(SHELTER_QUERY, vec![shelter_row(3, 40)]));
        let first = provider.fetch(&shelters()).await;
        let second = provider.fetch(&shelters()).await;
        assert_eq!(first, second);

        let offline = ResilientProvider::new(None, clock());
        assert_eq!(offline.fetch(&shelters()).await, offline.fetch(&shelters()).await);

        let failing = with_store(MemoryStore::new().with_failure(SHELTER_QUERY, StoreError::PoolExhausted));
        let first = failing.fetch(&shelters()).await;
        let second = failing.fetch(&shelters()).await;
        assert!(first.is_degraded());
        assert_eq!(first, second);
    }
}
