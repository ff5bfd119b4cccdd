//! Local model backend adapter
//!
//! Wraps a platform-injected on-device runtime (NPU delegate, GPU
//! delegate, or plain CPU interpreter) in the `InferenceBackend` contract.
//! The runtime's calls are blocking native code, so they run on the
//! blocking thread pool; cancellation is cooperative via the flag the
//! runtime checks between work units.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use domain::{AnalysisRequest, WorkType};
use tracing::{info, instrument, warn};

use crate::error::AnalysisError;
use crate::ports::{CancelToken, InferenceBackend, RawBackendOutput};

/// Port for platform on-device inference runtimes
///
/// Implementations are blocking and must check `cancel` between work units
/// (preprocessing, each inference pass, postprocessing), returning
/// `AnalysisError::Cancelled` promptly once it is set.
pub trait LocalRuntime: Send + Sync {
    /// Load model weights from disk
    fn load(&self, model_path: &Path) -> Result<(), AnalysisError>;

    /// Run detection on one image
    fn detect(
        &self,
        image: &[u8],
        width: u32,
        height: u32,
        work_type: WorkType,
        cancel: &CancelToken,
    ) -> Result<RawBackendOutput, AnalysisError>;

    /// Release loaded weights
    fn unload(&self);
}

/// `InferenceBackend` adapter over an injected local runtime
pub struct LocalModelBackend<R: LocalRuntime + 'static> {
    runtime: Arc<R>,
    model_path: PathBuf,
    loaded: AtomicBool,
}

impl<R: LocalRuntime + 'static> std::fmt::Debug for LocalModelBackend<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalModelBackend")
            .field("model_path", &self.model_path)
            .field("loaded", &self.loaded.load(Ordering::Acquire))
            .finish_non_exhaustive()
    }
}

impl<R: LocalRuntime + 'static> LocalModelBackend<R> {
    /// Create an adapter for a runtime and model file
    pub fn new(runtime: Arc<R>, model_path: impl Into<PathBuf>) -> Self {
        Self {
            runtime,
            model_path: model_path.into(),
            loaded: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl<R: LocalRuntime + 'static> InferenceBackend for LocalModelBackend<R> {
    #[instrument(skip(self), fields(model_path = %self.model_path.display()))]
    async fn initialize(&self) -> Result<(), AnalysisError> {
        let runtime = Arc::clone(&self.runtime);
        let model_path = self.model_path.clone();
        tokio::task::spawn_blocking(move || runtime.load(&model_path))
            .await
            .map_err(|e| AnalysisError::Internal(format!("model load worker failed: {e}")))??;
        self.loaded.store(true, Ordering::Release);
        info!("local model loaded");
        Ok(())
    }

    async fn infer(
        &self,
        request: &AnalysisRequest,
        cancel: CancelToken,
    ) -> Result<RawBackendOutput, AnalysisError> {
        if !self.loaded.load(Ordering::Acquire) {
            return Err(AnalysisError::ModelLoad(format!(
                "model not initialized: {}",
                self.model_path.display()
            )));
        }

        let runtime = Arc::clone(&self.runtime);
        let image = request.image_bytes.clone();
        let (width, height, work_type) = (request.width, request.height, request.work_type);

        // The native call keeps running if the engine abandons this future
        // on timeout; the cancel flag tells it to bail out at the next
        // work-unit boundary and clean up on the blocking pool.
        tokio::task::spawn_blocking(move || {
            runtime.detect(&image, width, height, work_type, &cancel)
        })
        .await
        .map_err(|e| {
            warn!(error = %e, "local inference worker failed");
            AnalysisError::Internal(format!("inference worker failed: {e}"))
        })?
    }

    async fn is_available(&self) -> bool {
        self.loaded.load(Ordering::Acquire)
    }

    async fn shutdown(&self) -> Result<(), AnalysisError> {
        self.loaded.store(false, Ordering::Release);
        let runtime = Arc::clone(&self.runtime);
        tokio::task::spawn_blocking(move || runtime.unload())
            .await
            .map_err(|e| AnalysisError::Internal(format!("unload worker failed: {e}")))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicU32;

    use domain::{Hazard, Severity};

    use super::*;

    #[derive(Default)]
    struct FakeRuntime {
        loads: AtomicU32,
        unloads: AtomicU32,
        fail_load: bool,
        oom: bool,
    }

    impl LocalRuntime for FakeRuntime {
        fn load(&self, _model_path: &Path) -> Result<(), AnalysisError> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            if self.fail_load {
                return Err(AnalysisError::ModelLoad("corrupt weights".into()));
            }
            Ok(())
        }

        fn detect(
            &self,
            _image: &[u8],
            _width: u32,
            _height: u32,
            _work_type: WorkType,
            cancel: &CancelToken,
        ) -> Result<RawBackendOutput, AnalysisError> {
            if cancel.is_cancelled() {
                return Err(AnalysisError::Cancelled);
            }
            if self.oom {
                return Err(AnalysisError::OutOfMemory("delegate arena".into()));
            }
            Ok(RawBackendOutput {
                hazards: vec![Hazard::new("no_hard_hat", Severity::Medium, 0.8)],
                confidence: 0.8,
                model: Some("yolov8n-hazard".to_string()),
            })
        }

        fn unload(&self) {
            self.unloads.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn request() -> AnalysisRequest {
        AnalysisRequest::new(vec![0u8; 64], 320, 320, WorkType::GeneralConstruction, 2000)
    }

    #[tokio::test]
    async fn infer_before_initialize_is_model_load_error() {
        let backend = LocalModelBackend::new(Arc::new(FakeRuntime::default()), "/m/model.tflite");
        let result = backend.infer(&request(), CancelToken::new()).await;
        assert!(matches!(result, Err(AnalysisError::ModelLoad(_))));
    }

    #[tokio::test]
    async fn initialize_then_infer_succeeds() {
        let runtime = Arc::new(FakeRuntime::default());
        let backend = LocalModelBackend::new(Arc::clone(&runtime), "/m/model.tflite");
        backend.initialize().await.unwrap();
        assert!(backend.is_available().await);

        let output = backend.infer(&request(), CancelToken::new()).await.unwrap();
        assert_eq!(output.hazards.len(), 1);
        assert_eq!(runtime.loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn load_failure_propagates_and_stays_unavailable() {
        let runtime = Arc::new(FakeRuntime {
            fail_load: true,
            ..Default::default()
        });
        let backend = LocalModelBackend::new(runtime, "/m/model.tflite");
        assert!(matches!(
            backend.initialize().await,
            Err(AnalysisError::ModelLoad(_))
        ));
        assert!(!backend.is_available().await);
    }

    #[tokio::test]
    async fn runtime_oom_maps_through() {
        let runtime = Arc::new(FakeRuntime {
            oom: true,
            ..Default::default()
        });
        let backend = LocalModelBackend::new(runtime, "/m/model.tflite");
        backend.initialize().await.unwrap();
        let result = backend.infer(&request(), CancelToken::new()).await;
        assert!(matches!(result, Err(AnalysisError::OutOfMemory(_))));
    }

    #[tokio::test]
    async fn cancelled_token_short_circuits() {
        let backend = LocalModelBackend::new(Arc::new(FakeRuntime::default()), "/m/model.tflite");
        backend.initialize().await.unwrap();
        let cancel = CancelToken::new();
        cancel.cancel();
        let result = backend.infer(&request(), cancel).await;
        assert!(matches!(result, Err(AnalysisError::Cancelled)));
    }

    #[tokio::test]
    async fn shutdown_unloads_runtime() {
        let runtime = Arc::new(FakeRuntime::default());
        let backend = LocalModelBackend::new(Arc::clone(&runtime), "/m/model.tflite");
        backend.initialize().await.unwrap();
        backend.shutdown().await.unwrap();
        assert!(!backend.is_available().await);
        assert_eq!(runtime.unloads.load(Ordering::SeqCst), 1);
    }
}
