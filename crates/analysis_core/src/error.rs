//! Analysis errors
//!
//! Per-backend operational errors are recovered inside the orchestration
//! engine and converted into "advance to the next candidate"; only
//! `Validation` and `Configuration` ever reach the caller.

use domain::DomainError;
use thiserror::Error;

/// Errors that can occur during analysis orchestration
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalysisError {
    /// Model weights could not be loaded or the backend never initialized
    #[error("model load failed: {0}")]
    ModelLoad(String),

    /// An inference attempt exceeded its timeout
    #[error("inference timeout after {0}ms")]
    InferenceTimeout(u64),

    /// Backend ran out of memory during inference
    #[error("out of memory: {0}")]
    OutOfMemory(String),

    /// Network-bound backend failed at the transport or server level
    #[error("network error: {0}")]
    Network(String),

    /// The device cannot run the requested backend at all
    #[error("unsupported device: {0}")]
    UnsupportedDevice(String),

    /// Malformed request - fatal, surfaced to the caller immediately
    #[error("validation error: {0}")]
    Validation(#[from] DomainError),

    /// Startup-time registry or config inconsistency
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The attempt was cancelled cooperatively
    #[error("inference cancelled")]
    Cancelled,

    /// Unexpected internal failure (e.g. a panicked worker)
    #[error("internal error: {0}")]
    Internal(String),
}

impl AnalysisError {
    /// Stable label recorded in attempt records and metrics
    #[must_use]
    pub const fn error_kind(&self) -> &'static str {
        match self {
            Self::ModelLoad(_) => "model_load",
            Self::InferenceTimeout(_) => "timeout",
            Self::OutOfMemory(_) => "out_of_memory",
            Self::Network(_) => "network",
            Self::UnsupportedDevice(_) => "unsupported_device",
            Self::Validation(_) => "validation",
            Self::Configuration(_) => "configuration",
            Self::Cancelled => "cancelled",
            Self::Internal(_) => "internal",
        }
    }

    /// Whether this error must be surfaced to the caller instead of being
    /// absorbed by the fallback chain
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::Configuration(_))
    }

    /// Whether this error counts as a timeout for attempt classification
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::InferenceTimeout(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_validation_and_configuration_are_fatal() {
        assert!(AnalysisError::Validation(DomainError::EmptyImage).is_fatal());
        assert!(AnalysisError::Configuration("dup".into()).is_fatal());
        assert!(!AnalysisError::Network("down".into()).is_fatal());
        assert!(!AnalysisError::InferenceTimeout(2000).is_fatal());
        assert!(!AnalysisError::OutOfMemory("npu".into()).is_fatal());
        assert!(!AnalysisError::Cancelled.is_fatal());
    }

    #[test]
    fn error_kind_labels_are_stable() {
        assert_eq!(AnalysisError::InferenceTimeout(1).error_kind(), "timeout");
        assert_eq!(AnalysisError::ModelLoad(String::new()).error_kind(), "model_load");
        assert_eq!(AnalysisError::Network(String::new()).error_kind(), "network");
    }

    #[test]
    fn domain_error_converts_to_validation() {
        let err: AnalysisError = DomainError::EmptyImage.into();
        assert!(matches!(err, AnalysisError::Validation(_)));
    }
}
