//! Data service: `fetch(domain)` for the HTTP layer

use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::error;

use crate::catalog::DomainCatalog;
use crate::domain::Domain;
use crate::provider::{DomainDescriptor, ResilientProvider};
use crate::records::DomainRecord;

/// A failure outside the store path. Never degraded, always a hard error.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("failed to serialize {domain} envelope: {source}")]
    Envelope {
        domain: Domain,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreHealth {
    Connected,
    Disconnected,
    Error,
}

#[derive(Clone)]
pub struct DataService {
    provider: Arc<ResilientProvider>,
    catalog: Arc<DomainCatalog>,
}

impl DataService {
    pub fn new(provider: ResilientProvider, catalog: DomainCatalog) -> Self {
        Self {
            provider: Arc::new(provider),
            catalog: Arc::new(catalog),
        }
    }

    /// Envelope for `domain`, serialized for the wire.
    pub async fn fetch(&self, domain: Domain) -> Result<serde_json::Value, FetchError> {
        match domain {
            Domain::Incidents => self.fetch_descriptor(&self.catalog.incidents).await,
            Domain::Personnel => self.fetch_descriptor(&self.catalog.personnel).await,
            Domain::Shelters => self.fetch_descriptor(&self.catalog.shelters).await,
            Domain::Assets => self.fetch_descriptor(&self.catalog.assets).await,
        }
    }

    pub async fn fetch_descriptor<R: DomainRecord>(
        &self,
        descriptor: &DomainDescriptor<R>,
    ) -> Result<serde_json::Value, FetchError> {
        let envelope = self.provider.fetch(descriptor).await;
        serde_json::to_value(&envelope).map_err(|source| FetchError::Envelope {
            domain: descriptor.domain(),
            source,
        })
    }

    pub async fn store_health(&self) -> StoreHealth {
        let Some(store) = self.provider.store() else {
            return StoreHealth::Disconnected;
        };

        match tokio::time::timeout(self.provider.query_timeout(), store.ping()).await {
            Ok(Ok(())) => StoreHealth::Connected,
            Ok(Err(e)) => {
                error!(error = %e, "health check database error");
                StoreHealth::Error
            }
            Err(_) => {
                error!(timeout = ?self.provider.query_timeout(), "health check database ping timed out");
                StoreHealth::Error
            }
        }
    }
}
