//! Domain layer for the safety analysis engine
//!
//! Contains the entities, value objects, and domain errors shared by the
//! orchestration core. This layer has no async code and no I/O; it defines
//! the ubiquitous language for hazard analysis.

pub mod entities;
pub mod errors;
pub mod value_objects;

pub use entities::*;
pub use errors::DomainError;
pub use value_objects::*;
