//! Domain errors

use thiserror::Error;

/// Errors raised by domain validation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// Request carries no image data
    #[error("image payload is empty")]
    EmptyImage,

    /// Image dimensions are not usable
    #[error("invalid image dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    /// Deadline must be a positive number of milliseconds
    #[error("invalid deadline: {0}ms")]
    InvalidDeadline(u64),

    /// Backend identifier failed validation
    #[error("invalid backend id: {0}")]
    InvalidBackendId(String),

    /// Bounding region coordinates are out of range or inverted
    #[error("invalid bounding region: {0}")]
    InvalidRegion(String),
}
