//! Typed domain records
//!
//! Rows arrive from the store as JSON objects keyed by column name. Each
//! domain decodes them into its own record type: named columns are typed and
//! may be NULL, unnamed columns ride along in `extra`. Only the identifier is
//! required. A row that is not an object, has no identifier, carries a column
//! of the wrong type or an out-of-range value is malformed.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::Domain;

/// A record shape served by one domain.
pub trait DomainRecord: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const DOMAIN: Domain;

    /// Reject values the store returned but the dashboard cannot use.
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

/// Identifier column; integer keys in the database, string keys in fixtures.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Int(i64),
    Text(String),
}

impl From<i64> for RecordId {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{}", v),
            Self::Text(v) => f.write_str(v),
        }
    }
}

/// Columns a record does not name, passed through untouched.
pub type ExtraColumns = serde_json::Map<String, serde_json::Value>;

/// Incident row from `active_incidents_view`. Only the id is required; the
/// view may leave any other column NULL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Incident {
    pub id: RecordId,
    pub incident_number: Option<String>,
    pub incident_type: Option<String>,
    pub severity: Option<String>,
    pub priority: Option<i32>,
    pub status: Option<String>,
    pub longitude: Option<f64>,
    pub latitude: Option<f64>,
    pub address: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(default, deserialize_with = "timestamp::optional")]
    pub reported_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: ExtraColumns,
}

impl DomainRecord for Incident {
    const DOMAIN: Domain = Domain::Incidents;

    fn validate(&self) -> Result<(), String> {
        check_coordinates(self.longitude, self.latitude)
    }
}

/// A personnel unit (engine, medic, patrol car).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    pub unit_id: RecordId,
    pub call_sign: Option<String>,
    pub unit_type: Option<String>,
    pub status: Option<String>,
    pub longitude: Option<f64>,
    pub latitude: Option<f64>,
    #[serde(default, deserialize_with = "timestamp::optional")]
    pub last_update: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: ExtraColumns,
}

impl DomainRecord for Unit {
    const DOMAIN: Domain = Domain::Personnel;

    fn validate(&self) -> Result<(), String> {
        check_coordinates(self.longitude, self.latitude)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shelter {
    pub id: RecordId,
    pub facility_name: Option<String>,
    pub facility_type: Option<String>,
    pub longitude: Option<f64>,
    pub latitude: Option<f64>,
    pub address: Option<String>,
    pub total_capacity: Option<i32>,
    pub current_occupancy: Option<i32>,
    pub available_capacity: Option<i32>,
    pub operational_status: Option<String>,
    pub has_kitchen: Option<bool>,
    pub has_medical: Option<bool>,
    pub wheelchair_accessible: Option<bool>,
    pub contact_phone: Option<String>,
    #[serde(flatten)]
    pub extra: ExtraColumns,
}

impl DomainRecord for Shelter {
    const DOMAIN: Domain = Domain::Shelters;

    fn validate(&self) -> Result<(), String> {
        check_coordinates(self.longitude, self.latitude)?;
        let capacities = [self.total_capacity, self.current_occupancy, self.available_capacity];
        if capacities.iter().flatten().any(|c| *c < 0) {
            return Err(format!("negative capacity for shelter {}", self.id));
        }
        Ok(())
    }
}

/// A tracked asset (vehicle, radio, drone) with its latest fix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub asset_id: RecordId,
    pub type_code: Option<String>,
    pub tactical_call: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub status: Option<String>,
    pub icon: Option<String>,
    pub longitude: Option<f64>,
    pub latitude: Option<f64>,
    /// Seconds since the Unix epoch.
    pub last_update: Option<f64>,
    #[serde(flatten)]
    pub extra: ExtraColumns,
}

impl DomainRecord for Asset {
    const DOMAIN: Domain = Domain::Assets;

    fn validate(&self) -> Result<(), String> {
        check_coordinates(self.longitude, self.latitude)
    }
}

fn check_coordinates(longitude: Option<f64>, latitude: Option<f64>) -> Result<(), String> {
    if let Some(lon) = longitude {
        if !(-180.0..=180.0).contains(&lon) {
            return Err(format!("longitude {} out of range", lon));
        }
    }
    if let Some(lat) = latitude {
        if !(-90.0..=90.0).contains(&lat) {
            return Err(format!("latitude {} out of range", lat));
        }
    }
    Ok(())
}

/// Postgres `timestamp` columns serialize without an offset; those are read as UTC.
mod timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer};

    const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

    pub(super) fn parse(raw: &str) -> Result<DateTime<Utc>, String> {
        if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
            return Ok(ts.with_timezone(&Utc));
        }
        NAIVE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
            .map(|naive| naive.and_utc())
            .ok_or_else(|| format!("unrecognized timestamp '{}'", raw))
    }

    pub(super) fn optional<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<String>::deserialize(deserializer)? {
            Some(raw) => parse(&raw).map(Some).map_err(serde::de::Error::custom),
            None => Ok(None),
        }
    }
}
