//! Hazard severity value object

use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity of a detected hazard
///
/// Ordered from least to most severe; merging multiple detections of the
/// same hazard always keeps the more conservative (higher) severity.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Minor issue, note for awareness
    #[default]
    Low,
    /// Should be corrected during the shift
    Medium,
    /// Requires prompt corrective action
    High,
    /// Imminent danger, stop work
    Critical,
}

impl Severity {
    /// Numeric rank, higher is more severe
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::Low => 0,
            Self::Medium => 1,
            Self::High => 2,
            Self::Critical => 3,
        }
    }

    /// The more conservative of two severities
    #[must_use]
    pub fn most_conservative(self, other: Self) -> Self {
        self.max(other)
    }

    /// Human-readable label
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
            Self::Critical => "Critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}
