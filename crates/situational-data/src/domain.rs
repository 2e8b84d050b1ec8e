use serde::{Deserialize, Serialize};
use std::fmt;

/// The data categories served by the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    Incidents,
    Personnel,
    Shelters,
    Assets,
}

impl Domain {
    pub const ALL: [Domain; 4] = [
        Domain::Incidents,
        Domain::Personnel,
        Domain::Shelters,
        Domain::Assets,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Incidents => "incidents",
            Self::Personnel => "personnel",
            Self::Shelters => "shelters",
            Self::Assets => "assets",
        }
    }

    /// Path under `/api/v1` that serves this domain.
    pub fn route(&self) -> &'static str {
        match self {
            Self::Incidents => "/incidents/active",
            Self::Personnel => "/personnel/status",
            Self::Shelters => "/shelters/available",
            Self::Assets => "/assets/status",
        }
    }

    /// Caller-facing message for a hard failure. Never carries internal detail.
    pub fn failure_message(&self) -> &'static str {
        match self {
            Self::Incidents => "Failed to retrieve incidents",
            Self::Personnel => "Failed to retrieve personnel status",
            Self::Shelters => "Failed to retrieve shelter information",
            Self::Assets => "Failed to retrieve asset status",
        }
    }

    /// File name of the fallback override for this domain.
    pub fn fallback_file(&self) -> String {
        format!("{}.json", self.as_str())
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_routes_are_distinct() {
        let mut routes: Vec<_> = Domain::ALL.iter().map(|d| d.route()).collect();
        routes.sort();
        routes.dedup();
        assert_eq!(routes.len(), 4);
    }

    #[test]
    fn test_fallback_file_names() {
        assert_eq!(Domain::Shelters.fallback_file(), "shelters.json");
        assert_eq!(Domain::Assets.to_string(), "assets");
    }
}
