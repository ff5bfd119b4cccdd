//! Analysis Core - AI orchestration for construction safety analysis
//!
//! Routes captured site photos across local and cloud inference backends
//! under a global deadline, with per-backend circuit breaking, capability
//! aware selection, and ensemble result merging.

pub mod backends;
pub mod breaker;
pub mod config;
pub mod engine;
pub mod error;
pub mod merger;
pub mod ports;
pub mod profiler;
pub mod registry;
pub mod selector;
pub mod telemetry;

pub use backends::{
    CloudVisionBackend, CloudVisionConfig, LocalModelBackend, LocalRuntime, SafeDefaultBackend,
};
pub use breaker::{CircuitState, HealthBoard};
pub use config::{BreakerConfig, EngineConfig, SelectorWeights, TierThresholds};
pub use engine::{ConnectivityProbe, OrchestrationEngine, OrchestrationEngineBuilder};
pub use error::AnalysisError;
pub use merger::{MergeInput, ResultMerger};
pub use ports::{
    BackendDescriptor, BackendKind, CancelToken, DeviceProbe, DeviceSnapshot, InferenceBackend,
    OutcomeSink, ProgressEvent, ProgressStage, RawBackendOutput,
};
pub use profiler::DeviceCapabilityProfiler;
pub use registry::{BackendRegistry, BackendRegistryBuilder, RegisteredBackend};
pub use selector::BackendSelector;
pub use telemetry::{BackendStats, RequestSummary, TelemetryReport};
