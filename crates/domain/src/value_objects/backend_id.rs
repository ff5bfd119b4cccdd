//! Inference backend identifier

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::DomainError;

/// Identifier of a registered inference backend
///
/// Identifiers are lowercase kebab-case (`local-npu`, `cloud-vision`) so
/// they can appear verbatim in logs, metrics labels, and audit records.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BackendId(String);

impl BackendId {
    /// Create a validated backend id
    pub fn new(id: impl Into<String>) -> Result<Self, DomainError> {
        let id = id.into();
        if id.is_empty()
            || !id
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        {
            return Err(DomainError::InvalidBackendId(id));
        }
        Ok(Self(id))
    }

    /// The id as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BackendId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_kebab_case() {
        assert!(BackendId::new("local-npu").is_ok());
        assert!(BackendId::new("cloud-vision-2").is_ok());
    }

    #[test]
    fn rejects_empty() {
        assert!(BackendId::new("").is_err());
    }

    #[test]
    fn rejects_uppercase_and_spaces() {
        assert!(BackendId::new("LocalNpu").is_err());
        assert!(BackendId::new("local npu").is_err());
        assert!(BackendId::new("local_npu").is_err());
    }

    #[test]
    fn ordering_is_lexicographic() {
        let a = BackendId::new("cloud-vision").unwrap();
        let b = BackendId::new("local-npu").unwrap();
        assert!(a < b);
    }
}
