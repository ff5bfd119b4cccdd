//! Overall risk level for an analysis outcome

use serde::{Deserialize, Serialize};
use std::fmt;

use super::severity::Severity;

/// Overall site risk communicated to the caller
///
/// Derived from the maximum hazard severity in an outcome; an empty hazard
/// list maps to `Low`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    /// No actionable hazards found
    #[default]
    Low,
    /// Hazards present, routine mitigation
    Moderate,
    /// Hazards requiring prompt attention
    High,
    /// Stop-work conditions observed
    Severe,
}

impl RiskLevel {
    /// Derive the overall risk from a set of hazard severities
    #[must_use]
    pub fn from_severities<I: IntoIterator<Item = Severity>>(severities: I) -> Self {
        severities
            .into_iter()
            .map(Self::from)
            .max()
            .unwrap_or_default()
    }
}

impl From<Severity> for RiskLevel {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::Low => Self::Low,
            Severity::Medium => Self::Moderate,
            Severity::High => Self::High,
            Severity::Critical => Self::Severe,
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Low => "low",
            Self::Moderate => "moderate",
            Self::High => "high",
            Self::Severe => "severe",
        };
        write!(f, "{label}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_severities_default_to_low() {
        assert_eq!(RiskLevel::from_severities([]), RiskLevel::Low);
    }

    #[test]
    fn maximum_severity_wins() {
        let risk =
            RiskLevel::from_severities([Severity::Low, Severity::Critical, Severity::Medium]);
        assert_eq!(risk, RiskLevel::Severe);
    }

    #[test]
    fn maps_each_severity() {
        assert_eq!(RiskLevel::from(Severity::Low), RiskLevel::Low);
        assert_eq!(RiskLevel::from(Severity::Medium), RiskLevel::Moderate);
        assert_eq!(RiskLevel::from(Severity::High), RiskLevel::High);
        assert_eq!(RiskLevel::from(Severity::Critical), RiskLevel::Severe);
    }
}
