//! Value objects for the safety analysis domain

pub mod backend_id;
pub mod bounding_region;
pub mod request_id;
pub mod risk_level;
pub mod severity;
pub mod work_type;

pub use backend_id::BackendId;
pub use bounding_region::BoundingRegion;
pub use request_id::RequestId;
pub use risk_level::RiskLevel;
pub use severity::Severity;
pub use work_type::WorkType;
