//! Backend adapters
//!
//! Concrete `InferenceBackend` implementations: the cloud vision client,
//! the wrapper that adapts injected on-device runtimes, and the
//! always-available safe default.

pub mod cloud;
pub mod local;
pub mod safe_default;

pub use cloud::{CloudVisionBackend, CloudVisionConfig};
pub use local::{LocalModelBackend, LocalRuntime};
pub use safe_default::SafeDefaultBackend;
