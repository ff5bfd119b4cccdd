//! Backend registry
//!
//! Holds the registered inference backends and their static capability
//! descriptors. Built once at startup and immutable afterwards; duplicate
//! ids are a `Configuration` error at build time, never at request time.

use std::collections::HashMap;
use std::sync::Arc;

use domain::BackendId;
use tracing::info;

use crate::error::AnalysisError;
use crate::ports::{BackendDescriptor, InferenceBackend};

/// One registered backend: its descriptor plus the adapter
#[derive(Clone)]
pub struct RegisteredBackend {
    /// Static capability descriptor
    pub descriptor: BackendDescriptor,
    /// The adapter implementation
    pub backend: Arc<dyn InferenceBackend>,
}

impl std::fmt::Debug for RegisteredBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredBackend")
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}

/// Builder collecting backend registrations before startup validation
#[derive(Debug, Default)]
pub struct BackendRegistryBuilder {
    entries: Vec<RegisteredBackend>,
    safe_default: Option<BackendId>,
}

impl BackendRegistryBuilder {
    /// Start an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a backend under its descriptor's id
    #[must_use]
    pub fn register(
        mut self,
        descriptor: BackendDescriptor,
        backend: Arc<dyn InferenceBackend>,
    ) -> Self {
        self.entries.push(RegisteredBackend {
            descriptor,
            backend,
        });
        self
    }

    /// Designate the always-available minimal-capability backend
    ///
    /// The selector falls back to a single-element chain containing this
    /// backend when filtering leaves nothing; it must be registered.
    #[must_use]
    pub fn safe_default(mut self, id: BackendId) -> Self {
        self.safe_default = Some(id);
        self
    }

    /// Validate and freeze the registry
    pub fn build(self) -> Result<BackendRegistry, AnalysisError> {
        let mut entries: HashMap<BackendId, RegisteredBackend> = HashMap::new();
        for entry in self.entries {
            let id = entry.descriptor.id.clone();
            if entries.insert(id.clone(), entry).is_some() {
                return Err(AnalysisError::Configuration(format!(
                    "duplicate backend id: {id}"
                )));
            }
        }
        let safe_default = self.safe_default.ok_or_else(|| {
            AnalysisError::Configuration("no safe-default backend designated".into())
        })?;
        if !entries.contains_key(&safe_default) {
            return Err(AnalysisError::Configuration(format!(
                "safe-default backend is not registered: {safe_default}"
            )));
        }

        info!(backends = entries.len(), safe_default = %safe_default, "backend registry built");
        Ok(BackendRegistry {
            entries,
            safe_default,
        })
    }
}

/// Immutable set of available backends
#[derive(Debug)]
pub struct BackendRegistry {
    entries: HashMap<BackendId, RegisteredBackend>,
    safe_default: BackendId,
}

impl BackendRegistry {
    /// Start building a registry
    #[must_use]
    pub fn builder() -> BackendRegistryBuilder {
        BackendRegistryBuilder::new()
    }

    /// All descriptors, sorted by id for deterministic iteration
    #[must_use]
    pub fn all(&self) -> Vec<BackendDescriptor> {
        let mut descriptors: Vec<BackendDescriptor> = self
            .entries
            .values()
            .map(|entry| entry.descriptor.clone())
            .collect();
        descriptors.sort_by(|a, b| a.id.cmp(&b.id));
        descriptors
    }

    /// Look up a registered backend by id
    #[must_use]
    pub fn get(&self, id: &BackendId) -> Option<&RegisteredBackend> {
        self.entries.get(id)
    }

    /// Descriptor of the designated safe-default backend
    #[must_use]
    pub fn safe_default_descriptor(&self) -> BackendDescriptor {
        // Presence is validated at build time.
        self.entries[&self.safe_default].descriptor.clone()
    }

    /// Number of registered backends
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry holds no backends
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use domain::AnalysisRequest;

    use super::*;
    use crate::ports::{BackendKind, CancelToken, RawBackendOutput};

    struct NullBackend;

    #[async_trait]
    impl InferenceBackend for NullBackend {
        async fn initialize(&self) -> Result<(), AnalysisError> {
            Ok(())
        }

        async fn infer(
            &self,
            _request: &AnalysisRequest,
            _cancel: CancelToken,
        ) -> Result<RawBackendOutput, AnalysisError> {
            Ok(RawBackendOutput {
                hazards: Vec::new(),
                confidence: 0.0,
                model: None,
            })
        }

        async fn is_available(&self) -> bool {
            true
        }

        async fn shutdown(&self) -> Result<(), AnalysisError> {
            Ok(())
        }
    }

    fn backend_id(s: &str) -> BackendId {
        BackendId::new(s).unwrap()
    }

    fn descriptor(id: &str, kind: BackendKind) -> BackendDescriptor {
        BackendDescriptor::new(backend_id(id), kind)
    }

    #[test]
    fn build_with_unique_ids_succeeds() {
        let registry = BackendRegistry::builder()
            .register(
                descriptor("local-cpu", BackendKind::LocalCpu),
                Arc::new(NullBackend),
            )
            .register(
                descriptor("cloud-vision", BackendKind::Cloud),
                Arc::new(NullBackend),
            )
            .safe_default(backend_id("local-cpu"))
            .build()
            .unwrap();
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn duplicate_id_fails_at_build_time() {
        let result = BackendRegistry::builder()
            .register(
                descriptor("local-cpu", BackendKind::LocalCpu),
                Arc::new(NullBackend),
            )
            .register(
                descriptor("local-cpu", BackendKind::LocalCpu),
                Arc::new(NullBackend),
            )
            .safe_default(backend_id("local-cpu"))
            .build();
        assert!(matches!(result, Err(AnalysisError::Configuration(_))));
    }

    #[test]
    fn missing_safe_default_fails() {
        let result = BackendRegistry::builder()
            .register(
                descriptor("local-cpu", BackendKind::LocalCpu),
                Arc::new(NullBackend),
            )
            .build();
        assert!(matches!(result, Err(AnalysisError::Configuration(_))));
    }

    #[test]
    fn unregistered_safe_default_fails() {
        let result = BackendRegistry::builder()
            .register(
                descriptor("local-cpu", BackendKind::LocalCpu),
                Arc::new(NullBackend),
            )
            .safe_default(backend_id("ghost"))
            .build();
        assert!(matches!(result, Err(AnalysisError::Configuration(_))));
    }

    #[test]
    fn all_is_sorted_by_id() {
        let registry = BackendRegistry::builder()
            .register(
                descriptor("local-npu", BackendKind::LocalNpu),
                Arc::new(NullBackend),
            )
            .register(
                descriptor("cloud-vision", BackendKind::Cloud),
                Arc::new(NullBackend),
            )
            .safe_default(backend_id("cloud-vision"))
            .build()
            .unwrap();
        let all = registry.all();
        let ids: Vec<&str> = all.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["cloud-vision", "local-npu"]);
    }
}
