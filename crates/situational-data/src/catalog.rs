//! Domain catalog: fixed query plus fallback set for each domain

use chrono::{DateTime, Utc};
use std::path::Path;
use tracing::info;

use crate::domain::Domain;
use crate::fallback::{
    builtin_assets, builtin_incidents, builtin_personnel, builtin_shelters, FallbackError, FallbackSet,
};
use crate::provider::DomainDescriptor;
use crate::records::{Asset, DomainRecord, Incident, Shelter, Unit};

pub const INCIDENTS_QUERY: &str = "SELECT * FROM active_incidents_view LIMIT 10";

pub const PERSONNEL_QUERY: &str = r#"
    SELECT
        u.id AS unit_id,
        u.call_sign,
        ut.type_name AS unit_type,
        u.status,
        ST_X(ul.location) AS longitude,
        ST_Y(ul.location) AS latitude,
        ul.timestamp AS last_update
    FROM units u
    JOIN unit_types ut ON u.unit_type_id = ut.id
    LEFT JOIN LATERAL (
        SELECT location, timestamp
        FROM unit_locations
        WHERE unit_id = u.id
        ORDER BY timestamp DESC
        LIMIT 1
    ) ul ON true
"#;

pub const SHELTERS_QUERY: &str = r#"
    SELECT
        id, facility_name, facility_type,
        ST_X(location) AS longitude,
        ST_Y(location) AS latitude,
        address, total_capacity, current_occupancy, available_capacity,
        operational_status, has_kitchen, has_medical, wheelchair_accessible, contact_phone
    FROM shelters
    WHERE operational_status IN ('Available', 'Open')
    ORDER BY available_capacity DESC
"#;

pub const ASSETS_QUERY: &str = r#"
    SELECT
        ta.asset_id,
        ta.type_code,
        ta.tactical_call,
        ta.description,
        ta.url,
        ta.status,
        tat.icon,
        ST_X(tal.location) AS longitude,
        ST_Y(tal.location) AS latitude,
        EXTRACT(EPOCH FROM tal.timestamp) AS last_update
    FROM tracked_assets ta
    JOIN tracked_asset_types tat ON ta.type_code = tat.type_code
    LEFT JOIN LATERAL (
        SELECT location, timestamp
        FROM tracked_asset_locations
        WHERE asset_id = ta.asset_id
        ORDER BY timestamp DESC
        LIMIT 1
    ) tal ON true
"#;

/// The four domain descriptors, built once at startup.
#[derive(Debug, Clone)]
pub struct DomainCatalog {
    pub incidents: DomainDescriptor<Incident>,
    pub personnel: DomainDescriptor<Unit>,
    pub shelters: DomainDescriptor<Shelter>,
    pub assets: DomainDescriptor<Asset>,
}

impl DomainCatalog {
    /// Built-in fixtures; `now` stamps the fixture timestamps.
    pub fn builtin(now: DateTime<Utc>) -> Result<Self, FallbackError> {
        Ok(Self {
            incidents: DomainDescriptor::new(INCIDENTS_QUERY, FallbackSet::new(builtin_incidents(now))?),
            personnel: DomainDescriptor::new(PERSONNEL_QUERY, FallbackSet::new(builtin_personnel(now))?),
            shelters: DomainDescriptor::new(SHELTERS_QUERY, FallbackSet::new(builtin_shelters())?),
            assets: DomainDescriptor::new(ASSETS_QUERY, builtin_assets()),
        })
    }

    /// Built-in fixtures, replaced per domain by `<domain>.json` files found in `dir`.
    pub fn with_overrides(dir: &Path, now: DateTime<Utc>) -> Result<Self, FallbackError> {
        let builtin = Self::builtin(now)?;
        Ok(Self {
            incidents: override_descriptor(dir, builtin.incidents)?,
            personnel: override_descriptor(dir, builtin.personnel)?,
            shelters: override_descriptor(dir, builtin.shelters)?,
            assets: override_descriptor(dir, builtin.assets)?,
        })
    }

    /// Fallback sizes per domain, for the startup log.
    pub fn fallback_sizes(&self) -> [(Domain, usize); 4] {
        [
            (Domain::Incidents, self.incidents.fallback().len()),
            (Domain::Personnel, self.personnel.fallback().len()),
            (Domain::Shelters, self.shelters.fallback().len()),
            (Domain::Assets, self.assets.fallback().len()),
        ]
    }
}

fn override_descriptor<R: DomainRecord>(
    dir: &Path,
    builtin: DomainDescriptor<R>,
) -> Result<DomainDescriptor<R>, FallbackError> {
    let path = dir.join(R::DOMAIN.fallback_file());
    if !path.is_file() {
        return Ok(builtin);
    }

    let fallback = FallbackSet::from_json_file(&path)?;
    info!(domain = %R::DOMAIN, path = %path.display(), records = fallback.len(), "fallback set overridden");
    Ok(DomainDescriptor::new(builtin.query(), fallback))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_sizes() {
        let catalog = DomainCatalog::builtin(Utc::now()).unwrap();
        assert_eq!(
            catalog.fallback_sizes(),
            [
                (Domain::Incidents, 2),
                (Domain::Personnel, 3),
                (Domain::Shelters, 2),
                (Domain::Assets, 0),
            ]
        );
    }

    #[test]
    fn test_queries_bound_to_domains() {
        let catalog = DomainCatalog::builtin(Utc::now()).unwrap();
        assert_eq!(catalog.incidents.domain(), Domain::Incidents);
        assert_eq!(catalog.assets.domain(), Domain::Assets);
        assert!(catalog.shelters.query().contains("FROM shelters"));
        assert!(catalog.personnel.query().contains("FROM units u"));
    }

    #[test]
    fn test_override_dir_replaces_only_present_domains() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("assets.json"),
            r#"[{"asset_id": "TRUCK-2", "type_code": "TRK", "tactical_call": "Water 2", "status": "Staged"}]"#,
        )
        .unwrap();

        let catalog = DomainCatalog::with_overrides(dir.path(), Utc::now()).unwrap();
        assert_eq!(catalog.assets.fallback().len(), 1);
        assert_eq!(catalog.assets.query(), ASSETS_QUERY);
        assert_eq!(catalog.shelters.fallback().len(), 2);
    }

    #[test]
    fn test_bad_override_aborts() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("shelters.json"), "{not json").unwrap();

        let err = DomainCatalog::with_overrides(dir.path(), Utc::now()).unwrap_err();
        assert!(matches!(err, FallbackError::Parse { .. }));
    }
}
