//! Fallback sets served when the store cannot answer
//!
//! A fallback set is built once at startup and never changes. An empty set is
//! only possible through [`FallbackSet::empty_by_design`] (or an override file
//! that explicitly holds `[]`), so a domain cannot end up empty by accident.

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

use crate::records::{Asset, DomainRecord, ExtraColumns, Incident, RecordId, Shelter, Unit};

#[derive(Error, Debug)]
pub enum FallbackError {
    #[error("fallback set must not be empty; use FallbackSet::empty_by_design")]
    Empty,
    #[error("failed to read fallback file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse fallback file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid record {index} in fallback file {path}: {reason}")]
    Invalid {
        path: PathBuf,
        index: usize,
        reason: String,
    },
}

/// Fixed, ordered, read-only records for one domain.
#[derive(Debug, Clone)]
pub struct FallbackSet<R> {
    records: Arc<[R]>,
}

impl<R: DomainRecord> FallbackSet<R> {
    pub fn new(records: Vec<R>) -> Result<Self, FallbackError> {
        if records.is_empty() {
            return Err(FallbackError::Empty);
        }
        Ok(Self {
            records: records.into(),
        })
    }

    /// A domain that deliberately has nothing to show when the store is down.
    pub fn empty_by_design() -> Self {
        Self {
            records: Vec::new().into(),
        }
    }

    /// Load a JSON array of records. `[]` is an explicit empty set.
    pub fn from_json_file(path: &Path) -> Result<Self, FallbackError> {
        let raw = std::fs::read_to_string(path).map_err(|source| FallbackError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let records: Vec<R> = serde_json::from_str(&raw).map_err(|source| FallbackError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        for (index, record) in records.iter().enumerate() {
            record.validate().map_err(|reason| FallbackError::Invalid {
                path: path.to_path_buf(),
                index,
                reason,
            })?;
        }

        if records.is_empty() {
            Ok(Self::empty_by_design())
        } else {
            Self::new(records)
        }
    }

    pub fn records(&self) -> &[R] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn to_vec(&self) -> Vec<R> {
        self.records.to_vec()
    }
}

// ============================================================================
// Built-in fixtures (Palo Alto service area)
// ============================================================================

pub fn builtin_incidents(now: DateTime<Utc>) -> Vec<Incident> {
    let incident = |id: i64, kind: &str, severity: &str, priority: i32, lon: f64, lat: f64, address: &str, title: &str, description: &str| Incident {
        id: RecordId::Int(id),
        incident_number: Some(format!("INC-2025-{:06}", id)),
        incident_type: Some(kind.into()),
        severity: Some(severity.into()),
        priority: Some(priority),
        status: Some("Active".into()),
        longitude: Some(lon),
        latitude: Some(lat),
        address: Some(address.into()),
        title: Some(title.into()),
        description: Some(description.into()),
        reported_at: Some(now),
        extra: ExtraColumns::new(),
    };

    vec![
        incident(
            1,
            "Structure Fire",
            "High",
            1,
            -122.1630,
            37.4419,
            "450 University Ave",
            "Commercial Building Fire",
            "Heavy smoke showing from 2-story commercial building",
        ),
        incident(
            2,
            "Medical Emergency",
            "Medium",
            2,
            -122.1334,
            37.4505,
            "660 Stanford Shopping Center",
            "Medical Emergency",
            "Person collapsed, conscious and breathing",
        ),
    ]
}

pub fn builtin_personnel(now: DateTime<Utc>) -> Vec<Unit> {
    let unit = |id: &str, call_sign: &str, unit_type: &str, status: &str, lon: f64, lat: f64| Unit {
        unit_id: RecordId::from(id),
        call_sign: Some(call_sign.into()),
        unit_type: Some(unit_type.into()),
        status: Some(status.into()),
        longitude: Some(lon),
        latitude: Some(lat),
        last_update: Some(now),
        extra: ExtraColumns::new(),
    };

    vec![
        unit("PAFD-E01", "Engine 1", "Fire Engine", "Available", -122.1576, 37.4614),
        unit("PAEMS-M01", "Medic 1", "Ambulance", "Dispatched", -122.1540, 37.4349),
        unit("PAPD-01", "Unit 1", "Police Unit", "On Patrol", -122.1560, 37.4419),
    ]
}

pub fn builtin_shelters() -> Vec<Shelter> {
    let shelter = |id: &str, name: &str, lon: f64, lat: f64, address: &str, total: i32, occupied: i32, has_medical: bool, phone: &str| Shelter {
        id: RecordId::from(id),
        facility_name: Some(name.into()),
        facility_type: Some("Community Center".into()),
        longitude: Some(lon),
        latitude: Some(lat),
        address: Some(address.into()),
        total_capacity: Some(total),
        current_occupancy: Some(occupied),
        available_capacity: Some(total - occupied),
        operational_status: Some("Available".into()),
        has_kitchen: Some(true),
        has_medical: Some(has_medical),
        wheelchair_accessible: Some(true),
        contact_phone: Some(phone.into()),
        extra: ExtraColumns::new(),
    };

    vec![
        shelter(
            "SHELTER-01",
            "Mitchell Park Community Center",
            -122.1549,
            37.4282,
            "3700 Middlefield Rd, Palo Alto, CA",
            150,
            0,
            true,
            "(650) 463-4920",
        ),
        shelter(
            "SHELTER-02",
            "Cubberley Community Center",
            -122.1345,
            37.4092,
            "4000 Middlefield Rd, Palo Alto, CA",
            200,
            80,
            false,
            "(650) 463-4950",
        ),
    ]
}

/// No static asset positions are meaningful offline.
pub fn builtin_assets() -> FallbackSet<Asset> {
    FallbackSet::empty_by_design()
}
