//! Domain entities

pub mod analysis_outcome;
pub mod analysis_request;
pub mod device_profile;
pub mod hazard;

pub use analysis_outcome::{AnalysisOutcome, AttemptOutcome, AttemptRecord};
pub use analysis_request::AnalysisRequest;
pub use device_profile::{DeviceProfile, DeviceTier, ThermalState};
pub use hazard::Hazard;
