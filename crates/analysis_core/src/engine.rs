//! Orchestration engine
//!
//! The single entry point for image analysis. One `analyze` call profiles
//! the device, builds a fallback chain, and walks it under the request's
//! global deadline, feeding every attempt result back into the shared
//! health board. The call never fails for operational reasons: when every
//! backend is exhausted it returns a degraded outcome instead.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use domain::{
    AnalysisOutcome, AnalysisRequest, AttemptOutcome, AttemptRecord, RequestId,
};
use tokio::sync::{Semaphore, broadcast};
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};

use crate::breaker::HealthBoard;
use crate::config::{EngineConfig, local_inference_slots};
use crate::error::AnalysisError;
use crate::merger::{MergeInput, ResultMerger};
use crate::ports::{
    BackendDescriptor, CancelToken, DeviceProbe, OutcomeSink, ProgressEvent, ProgressStage,
    RawBackendOutput,
};
use crate::profiler::DeviceCapabilityProfiler;
use crate::registry::BackendRegistry;
use crate::selector::BackendSelector;
use crate::telemetry::{RecentRequests, RequestSummary, TelemetryReport};

/// Connectivity check invoked once per analyze call
pub type ConnectivityProbe = Arc<dyn Fn() -> bool + Send + Sync>;

/// Capacity of the progress broadcast channel; slow observers lose events,
/// orchestration is never blocked by them.
const PROGRESS_CHANNEL_CAPACITY: usize = 64;

struct EngineInner {
    registry: BackendRegistry,
    profiler: DeviceCapabilityProfiler,
    selector: BackendSelector,
    merger: ResultMerger,
    health: HealthBoard,
    connectivity: ConnectivityProbe,
    sink: Option<Arc<dyn OutcomeSink>>,
    progress: broadcast::Sender<ProgressEvent>,
    local_slots: Arc<Semaphore>,
    recent: RecentRequests,
}

impl EngineInner {
    /// Run one backend attempt under a budget and record it on the board
    ///
    /// The budget is the smaller of the backend's configured timeout and
    /// the remaining global budget. On expiry the future is abandoned and
    /// the token is cancelled so the backend can stop cooperatively.
    /// Cooperative cancellations carry no health signal.
    async fn attempt(
        &self,
        request: &AnalysisRequest,
        descriptor: &BackendDescriptor,
        remaining: Duration,
        cancel: CancelToken,
    ) -> (AttemptRecord, Option<RawBackendOutput>) {
        if cancel.is_cancelled() {
            return (AttemptRecord::skipped(descriptor.id.clone()), None);
        }
        let Some(registered) = self.registry.get(&descriptor.id) else {
            // Chains come from the registry; an unknown id means the
            // descriptor was forged, not a runtime condition.
            warn!(backend = %descriptor.id, "chain references unregistered backend");
            return (AttemptRecord::skipped(descriptor.id.clone()), None);
        };

        let budget = Duration::from_millis(descriptor.per_call_timeout_ms).min(remaining);
        let backend = Arc::clone(&registered.backend);
        let slots = descriptor
            .kind
            .is_local()
            .then(|| Arc::clone(&self.local_slots));
        let backend_cancel = cancel.clone();

        let started_at = Utc::now();
        let start = Instant::now();
        let result = tokio::time::timeout(budget, async move {
            // Local inference waits for a device slot inside its own
            // budget so queueing counts against the attempt, not the
            // global loop.
            let _permit = match &slots {
                Some(slots) => slots.acquire().await.ok(),
                None => None,
            };
            backend.infer(request, backend_cancel).await
        })
        .await;
        let elapsed_ms = start.elapsed().as_millis() as u64;

        let (outcome, error_kind, output) = match result {
            Ok(Ok(output)) => (AttemptOutcome::Success, None, Some(output)),
            Ok(Err(AnalysisError::Cancelled)) => {
                debug!(backend = %descriptor.id, "attempt cancelled");
                (
                    AttemptOutcome::Skipped,
                    Some(AnalysisError::Cancelled.error_kind().to_string()),
                    None,
                )
            }
            Ok(Err(e)) => {
                warn!(backend = %descriptor.id, error = %e, "backend attempt failed");
                let outcome = if e.is_timeout() {
                    AttemptOutcome::Timeout
                } else {
                    AttemptOutcome::Error
                };
                (outcome, Some(e.error_kind().to_string()), None)
            }
            Err(_) => {
                cancel.cancel();
                warn!(
                    backend = %descriptor.id,
                    budget_ms = budget.as_millis() as u64,
                    "attempt budget exhausted"
                );
                (AttemptOutcome::Timeout, Some("timeout".to_string()), None)
            }
        };

        self.health
            .record_attempt(&descriptor.id, outcome, elapsed_ms);

        let record = AttemptRecord {
            backend_id: descriptor.id.clone(),
            started_at,
            ended_at: Utc::now(),
            elapsed_ms,
            outcome,
            error_kind,
        };
        (record, output)
    }

    fn emit(&self, request_id: RequestId, stage: ProgressStage) {
        // No receivers is fine; progress is display-only.
        let _ = self.progress.send(ProgressEvent { request_id, stage });
    }
}

impl std::fmt::Debug for EngineInner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineInner")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

/// The analysis orchestration engine
///
/// Cheap to clone; all clones share the registry, health board, and
/// telemetry surfaces.
#[derive(Debug, Clone)]
pub struct OrchestrationEngine {
    inner: Arc<EngineInner>,
}

impl OrchestrationEngine {
    /// Start building an engine
    #[must_use]
    pub fn builder() -> OrchestrationEngineBuilder {
        OrchestrationEngineBuilder::default()
    }

    /// Analyze one captured image
    ///
    /// Always returns an outcome for operationally healthy requests; the
    /// only error paths are request validation and startup configuration.
    /// The outcome is produced within the request's global deadline.
    #[instrument(skip(self, request), fields(request_id = %request.request_id, ensemble = request.ensemble))]
    pub async fn analyze(
        &self,
        request: AnalysisRequest,
    ) -> Result<AnalysisOutcome, AnalysisError> {
        request.validate()?;
        let started = Instant::now();
        let request = Arc::new(request);

        self.inner
            .emit(request.request_id, ProgressStage::Initializing);

        let profile = self.inner.profiler.profile();
        let online = (self.inner.connectivity)();
        let chain =
            self.inner
                .selector
                .select_chain(&profile, online, &self.inner.registry, &self.inner.health);
        info!(
            tier = ?profile.tier,
            online,
            chain_len = chain.len(),
            "fallback chain selected"
        );

        let outcome = if request.ensemble {
            self.run_ensemble(&request, &chain, started, local_inference_slots(profile.tier))
                .await
        } else {
            self.run_single(&request, &chain, started).await
        };

        let stage = if outcome.degraded {
            ProgressStage::Degraded
        } else {
            ProgressStage::Completed
        };
        self.inner.emit(request.request_id, stage);

        self.inner.recent.push(RequestSummary {
            request_id: request.request_id,
            degraded: outcome.degraded,
            processing_time_ms: outcome.processing_time_ms,
            attempt_count: outcome.attempts.len(),
            completed_at: Utc::now(),
        });

        if let Some(sink) = &self.inner.sink {
            let sink = Arc::clone(sink);
            let stored = outcome.clone();
            // Fire and forget; persistence failure never affects the caller.
            tokio::spawn(async move {
                if let Err(e) = sink.store(&stored).await {
                    warn!(request_id = %stored.request_id, error = %e, "failed to persist outcome");
                }
            });
        }

        Ok(outcome)
    }

    /// First-success walk of the fallback chain
    async fn run_single(
        &self,
        request: &Arc<AnalysisRequest>,
        chain: &[BackendDescriptor],
        started: Instant,
    ) -> AnalysisOutcome {
        let deadline = Duration::from_millis(request.global_deadline_ms);
        let mut attempts = Vec::with_capacity(chain.len());

        for (index, descriptor) in chain.iter().enumerate() {
            let remaining = deadline.saturating_sub(started.elapsed());
            if remaining.is_zero() {
                // Budget exhausted: remaining candidates go on record
                // without being invoked.
                for skipped in &chain[index..] {
                    attempts.push(AttemptRecord::skipped(skipped.id.clone()));
                }
                break;
            }

            self.inner.emit(
                request.request_id,
                ProgressStage::Attempting(descriptor.id.clone()),
            );
            let (record, output) = self
                .inner
                .attempt(request, descriptor, remaining, CancelToken::new())
                .await;
            attempts.push(record);

            if let Some(output) = output {
                let reliability = self.inner.health.success_rate(&descriptor.id);
                let (hazards, confidence) = self.inner.merger.merge(&[MergeInput {
                    backend_id: descriptor.id.clone(),
                    output,
                    reliability,
                }]);
                return AnalysisOutcome::from_hazards(
                    request.request_id,
                    hazards,
                    confidence,
                    vec![descriptor.id.clone()],
                    started.elapsed().as_millis() as u64,
                    attempts,
                );
            }
        }

        AnalysisOutcome::degraded(
            request.request_id,
            started.elapsed().as_millis() as u64,
            attempts,
        )
    }

    /// Ensemble walk: bounded-parallel attempts merged across backends
    ///
    /// Stops launching new attempts once `max_ensemble_successes` outputs
    /// are collected and cancels the stragglers cooperatively.
    async fn run_ensemble(
        &self,
        request: &Arc<AnalysisRequest>,
        chain: &[BackendDescriptor],
        started: Instant,
        parallelism: usize,
    ) -> AnalysisOutcome {
        let deadline = Duration::from_millis(request.global_deadline_ms);
        let parallelism = parallelism.max(1);

        let mut join_set: JoinSet<(usize, AttemptRecord, Option<RawBackendOutput>)> =
            JoinSet::new();
        let mut tokens: Vec<CancelToken> = Vec::with_capacity(chain.len());
        let mut records: Vec<Option<AttemptRecord>> = chain.iter().map(|_| None).collect();
        let mut collected: Vec<(usize, MergeInput)> = Vec::new();
        let mut next = 0usize;
        let mut quota_reached = false;

        let spawn_next = |join_set: &mut JoinSet<_>, tokens: &mut Vec<CancelToken>,
                          next: &mut usize| {
            let remaining = deadline.saturating_sub(started.elapsed());
            if remaining.is_zero() {
                return false;
            }
            let index = *next;
            let descriptor = chain[index].clone();
            let inner = Arc::clone(&self.inner);
            let request = Arc::clone(request);
            let cancel = CancelToken::new();
            tokens.push(cancel.clone());

            inner.emit(
                request.request_id,
                ProgressStage::Attempting(descriptor.id.clone()),
            );
            join_set.spawn(async move {
                let (record, output) = inner
                    .attempt(&request, &descriptor, remaining, cancel)
                    .await;
                (index, record, output)
            });
            *next += 1;
            true
        };

        while next < chain.len() && join_set.len() < parallelism {
            if !spawn_next(&mut join_set, &mut tokens, &mut next) {
                break;
            }
        }

        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((index, record, output)) => {
                    if let Some(output) = output {
                        let reliability = self.inner.health.success_rate(&chain[index].id);
                        collected.push((
                            index,
                            MergeInput {
                                backend_id: chain[index].id.clone(),
                                output,
                                reliability,
                            },
                        ));
                    }
                    records[index] = Some(record);
                }
                Err(e) => warn!(error = %e, "ensemble attempt task failed"),
            }

            if !quota_reached && collected.len() >= request.max_ensemble_successes {
                quota_reached = true;
                debug!(successes = collected.len(), "ensemble quota reached");
                for token in &tokens {
                    token.cancel();
                }
            }

            while !quota_reached && next < chain.len() && join_set.len() < parallelism {
                if !spawn_next(&mut join_set, &mut tokens, &mut next) {
                    break;
                }
            }
        }

        // Candidates never launched (budget or quota) still go on record.
        let attempts: Vec<AttemptRecord> = records
            .into_iter()
            .enumerate()
            .map(|(index, record)| {
                record.unwrap_or_else(|| AttemptRecord::skipped(chain[index].id.clone()))
            })
            .collect();

        if collected.is_empty() {
            return AnalysisOutcome::degraded(
                request.request_id,
                started.elapsed().as_millis() as u64,
                attempts,
            );
        }

        // Deterministic attribution order regardless of completion order.
        collected.sort_by_key(|(index, _)| *index);
        let contributing: Vec<_> = collected
            .iter()
            .map(|(_, input)| input.backend_id.clone())
            .collect();
        let inputs: Vec<MergeInput> = collected.into_iter().map(|(_, input)| input).collect();
        let (hazards, confidence) = self.inner.merger.merge(&inputs);

        AnalysisOutcome::from_hazards(
            request.request_id,
            hazards,
            confidence,
            contributing,
            started.elapsed().as_millis() as u64,
            attempts,
        )
    }

    /// Initialize every registered backend
    ///
    /// Failures are logged and tolerated; an uninitialized backend fails
    /// its first attempt and the breaker routes around it.
    pub async fn initialize_backends(&self) {
        for descriptor in self.inner.registry.all() {
            if let Some(registered) = self.inner.registry.get(&descriptor.id)
                && let Err(e) = registered.backend.initialize().await
            {
                warn!(backend = %descriptor.id, error = %e, "backend initialization failed");
            }
        }
    }

    /// Shut down every registered backend
    pub async fn shutdown(&self) {
        for descriptor in self.inner.registry.all() {
            if let Some(registered) = self.inner.registry.get(&descriptor.id)
                && let Err(e) = registered.backend.shutdown().await
            {
                warn!(backend = %descriptor.id, error = %e, "backend shutdown failed");
            }
        }
    }

    /// Subscribe to progress events for display purposes
    ///
    /// A lagging or dropped receiver never affects orchestration.
    #[must_use]
    pub fn subscribe_progress(&self) -> broadcast::Receiver<ProgressEvent> {
        self.inner.progress.subscribe()
    }

    /// Snapshot of backend health and recent requests
    #[must_use]
    pub fn telemetry_report(&self) -> TelemetryReport {
        TelemetryReport {
            backends: self.inner.health.snapshot(),
            recent_requests: self.inner.recent.snapshot(),
        }
    }

    /// Drop the cached device profile; wired to thermal notifications
    pub fn invalidate_device_profile(&self) {
        self.inner.profiler.invalidate();
    }
}

/// Builder wiring the engine's collaborators together
#[derive(Default)]
pub struct OrchestrationEngineBuilder {
    config: EngineConfig,
    registry: Option<BackendRegistry>,
    probe: Option<Arc<dyn DeviceProbe>>,
    connectivity: Option<ConnectivityProbe>,
    sink: Option<Arc<dyn OutcomeSink>>,
}

impl std::fmt::Debug for OrchestrationEngineBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrchestrationEngineBuilder")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

impl OrchestrationEngineBuilder {
    /// Override the default configuration
    #[must_use]
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the backend registry (required)
    #[must_use]
    pub fn registry(mut self, registry: BackendRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Set the platform device probe (required)
    #[must_use]
    pub fn device_probe(mut self, probe: Arc<dyn DeviceProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    /// Set the connectivity check; defaults to always online
    #[must_use]
    pub fn connectivity(mut self, probe: ConnectivityProbe) -> Self {
        self.connectivity = Some(probe);
        self
    }

    /// Set the optional persistence collaborator
    #[must_use]
    pub fn outcome_sink(mut self, sink: Arc<dyn OutcomeSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Validate wiring and construct the engine
    pub fn build(self) -> Result<OrchestrationEngine, AnalysisError> {
        let registry = self
            .registry
            .ok_or_else(|| AnalysisError::Configuration("no backend registry provided".into()))?;
        let probe = self
            .probe
            .ok_or_else(|| AnalysisError::Configuration("no device probe provided".into()))?;

        let profiler = DeviceCapabilityProfiler::new(probe, self.config.tiers.clone());
        // Sized once at startup from the initial profile; slot count is a
        // memory bound, not a scheduling hint.
        let slots = local_inference_slots(profiler.profile().tier);
        let (progress, _) = broadcast::channel(PROGRESS_CHANNEL_CAPACITY);

        Ok(OrchestrationEngine {
            inner: Arc::new(EngineInner {
                health: HealthBoard::new(self.config.breaker.clone()),
                selector: BackendSelector::new(self.config.selector.clone()),
                merger: ResultMerger::new(self.config.merge_iou_threshold),
                recent: RecentRequests::new(self.config.recent_requests_capacity),
                local_slots: Arc::new(Semaphore::new(slots)),
                connectivity: self.connectivity.unwrap_or_else(|| Arc::new(|| true)),
                sink: self.sink,
                registry,
                profiler,
                progress,
            }),
        })
    }
}
