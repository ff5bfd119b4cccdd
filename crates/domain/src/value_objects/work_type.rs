//! Construction work type value object

use serde::{Deserialize, Serialize};
use std::fmt;

/// Category of work captured in the photo
///
/// Used by backends to bias detection and by the safe-default backend to
/// pick generic reminders when no model is available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WorkType {
    /// Mixed or unspecified site work
    #[default]
    GeneralConstruction,
    /// Electrical installation or service
    Electrical,
    /// Roofing and work at height
    Roofing,
    /// Trenching and excavation
    Excavation,
    /// Structural steel erection
    Steelwork,
    /// Concrete pouring and forming
    Concrete,
}

impl WorkType {
    /// Human-readable label
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::GeneralConstruction => "General construction",
            Self::Electrical => "Electrical",
            Self::Roofing => "Roofing",
            Self::Excavation => "Excavation",
            Self::Steelwork => "Steelwork",
            Self::Concrete => "Concrete",
        }
    }

    /// Snake-case wire name, matching the serde representation
    #[must_use]
    pub const fn wire_name(self) -> &'static str {
        match self {
            Self::GeneralConstruction => "general_construction",
            Self::Electrical => "electrical",
            Self::Roofing => "roofing",
            Self::Excavation => "excavation",
            Self::Steelwork => "steelwork",
            Self::Concrete => "concrete",
        }
    }
}

impl fmt::Display for WorkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_general() {
        assert_eq!(WorkType::default(), WorkType::GeneralConstruction);
    }

    #[test]
    fn serde_snake_case() {
        let json = serde_json::to_string(&WorkType::GeneralConstruction).unwrap();
        assert_eq!(json, "\"general_construction\"");
        let back: WorkType = serde_json::from_str("\"roofing\"").unwrap();
        assert_eq!(back, WorkType::Roofing);
    }

    #[test]
    fn wire_name_matches_serde() {
        for wt in [
            WorkType::GeneralConstruction,
            WorkType::Electrical,
            WorkType::Roofing,
            WorkType::Excavation,
            WorkType::Steelwork,
            WorkType::Concrete,
        ] {
            let json = serde_json::to_string(&wt).unwrap();
            assert_eq!(json, format!("\"{}\"", wt.wire_name()));
        }
    }
}
