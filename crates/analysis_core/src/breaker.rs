//! Per-backend circuit breaker and metrics recorder
//!
//! One `HealthBoard` is shared by every in-flight request. It is the only
//! mutator of backend health: the engine feeds attempt results in via
//! `record_attempt`, the selector reads eligibility and scores out. State
//! transitions:
//!
//! ```text
//! Closed → Open:      failure_threshold consecutive failures
//! Open → HalfOpen:    cooldown elapsed (with exponential backoff on re-opens)
//! HalfOpen → Closed:  next success
//! HalfOpen → Open:    next failure (cooldown restarts, backed off)
//! ```
//!
//! A half-open circuit admits a single recovery probe at a time: the first
//! eligibility check after cooldown takes the probe slot, and further checks
//! return false until the probe's outcome is recorded (or its admission
//! expires after one cooldown period, covering probes that never ran).

use std::collections::HashMap;
use std::collections::VecDeque;
use std::time::Instant;

use domain::{AttemptOutcome, BackendId};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::BreakerConfig;
use crate::telemetry::BackendStats;

/// Number of recent latency samples kept per backend
const LATENCY_WINDOW: usize = 32;

/// Circuit breaker state for one backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Healthy, attempts flow through
    #[default]
    Closed,
    /// Excluded from selection until cooldown elapses
    Open,
    /// Cooldown elapsed, a single recovery probe is admitted
    HalfOpen,
}

#[derive(Debug)]
struct HealthEntry {
    state: CircuitState,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
    probe_admitted_at: Option<Instant>,
    reopen_count: u32,
    success_count: u64,
    failure_count: u64,
    latencies_ms: VecDeque<u64>,
}

impl HealthEntry {
    fn new() -> Self {
        Self {
            state: CircuitState::Closed,
            consecutive_failures: 0,
            opened_at: None,
            probe_admitted_at: None,
            reopen_count: 0,
            success_count: 0,
            failure_count: 0,
            latencies_ms: VecDeque::with_capacity(LATENCY_WINDOW),
        }
    }

    fn push_latency(&mut self, latency_ms: u64) {
        if self.latencies_ms.len() == LATENCY_WINDOW {
            self.latencies_ms.pop_front();
        }
        self.latencies_ms.push_back(latency_ms);
    }

    /// Laplace-smoothed success rate so unproven backends still get tried
    fn success_rate(&self) -> f64 {
        let total = self.success_count + self.failure_count;
        (self.success_count + 1) as f64 / (total + 2) as f64
    }

    fn avg_latency_ms(&self) -> Option<f64> {
        if self.latencies_ms.is_empty() {
            return None;
        }
        let sum: u64 = self.latencies_ms.iter().sum();
        Some(sum as f64 / self.latencies_ms.len() as f64)
    }
}

/// Shared per-backend health state and rolling performance statistics
#[derive(Debug)]
pub struct HealthBoard {
    config: BreakerConfig,
    entries: RwLock<HashMap<BackendId, Mutex<HealthEntry>>>,
}

impl HealthBoard {
    /// Create an empty board with the given breaker policy
    #[must_use]
    pub fn new(config: BreakerConfig) -> Self {
        Self {
            config,
            entries: RwLock::new(HashMap::new()),
        }
    }

    fn with_entry<T>(&self, backend_id: &BackendId, f: impl FnOnce(&mut HealthEntry) -> T) -> T {
        {
            let entries = self.entries.read();
            if let Some(entry) = entries.get(backend_id) {
                return f(&mut entry.lock());
            }
        }
        let mut entries = self.entries.write();
        let entry = entries
            .entry(backend_id.clone())
            .or_insert_with(|| Mutex::new(HealthEntry::new()));
        f(&mut entry.lock())
    }

    /// Record one finished attempt; the only health mutator
    ///
    /// Safe under concurrent calls from multiple in-flight requests.
    /// Skipped attempts carry no health signal; they only release a pending
    /// half-open probe admission so the next caller can probe instead.
    pub fn record_attempt(&self, backend_id: &BackendId, outcome: AttemptOutcome, latency_ms: u64) {
        match outcome {
            AttemptOutcome::Skipped => self.with_entry(backend_id, |entry| {
                entry.probe_admitted_at = None;
            }),
            AttemptOutcome::Success => self.with_entry(backend_id, |entry| {
                entry.success_count += 1;
                entry.consecutive_failures = 0;
                entry.probe_admitted_at = None;
                entry.push_latency(latency_ms);
                if entry.state != CircuitState::Closed {
                    info!(backend = %backend_id, "circuit closed after successful probe");
                    entry.state = CircuitState::Closed;
                    entry.opened_at = None;
                    entry.reopen_count = 0;
                }
            }),
            AttemptOutcome::Timeout | AttemptOutcome::Error => {
                let threshold = self.config.failure_threshold;
                self.with_entry(backend_id, |entry| {
                    entry.failure_count += 1;
                    entry.consecutive_failures += 1;
                    entry.probe_admitted_at = None;
                    entry.push_latency(latency_ms);
                    match entry.state {
                        CircuitState::HalfOpen => {
                            entry.reopen_count += 1;
                            entry.state = CircuitState::Open;
                            entry.opened_at = Some(Instant::now());
                            warn!(
                                backend = %backend_id,
                                reopens = entry.reopen_count,
                                "probe failed, circuit re-opened"
                            );
                        }
                        CircuitState::Closed if entry.consecutive_failures >= threshold => {
                            entry.state = CircuitState::Open;
                            entry.opened_at = Some(Instant::now());
                            warn!(
                                backend = %backend_id,
                                failures = entry.consecutive_failures,
                                "failure threshold reached, circuit opened"
                            );
                        }
                        _ => {}
                    }
                });
            }
        }
    }

    /// Whether the backend may be selected right now
    ///
    /// Non-blocking; an open circuit whose cooldown has elapsed flips to
    /// half-open here and the caller is admitted as the single recovery
    /// probe. While that probe is outstanding, further checks return false.
    /// An admission not resolved within one cooldown period is treated as
    /// abandoned and the slot is handed to the next caller.
    #[must_use]
    pub fn is_eligible(&self, backend_id: &BackendId) -> bool {
        let cooldown_for = |reopens: u32| self.config.cooldown_after_reopens(reopens);
        self.with_entry(backend_id, |entry| match entry.state {
            CircuitState::Closed => true,
            CircuitState::HalfOpen => {
                let lease_ms = cooldown_for(entry.reopen_count);
                let outstanding = entry
                    .probe_admitted_at
                    .is_some_and(|t| (t.elapsed().as_millis() as u64) < lease_ms);
                if outstanding {
                    false
                } else {
                    entry.probe_admitted_at = Some(Instant::now());
                    true
                }
            }
            CircuitState::Open => {
                let cooldown_ms = cooldown_for(entry.reopen_count);
                let elapsed_ms = entry
                    .opened_at
                    .map_or(u64::MAX, |t| t.elapsed().as_millis() as u64);
                if elapsed_ms >= cooldown_ms {
                    debug!(backend = %backend_id, "cooldown elapsed, circuit half-open");
                    entry.state = CircuitState::HalfOpen;
                    entry.probe_admitted_at = Some(Instant::now());
                    true
                } else {
                    false
                }
            }
        })
    }

    /// Current circuit state
    #[must_use]
    pub fn state(&self, backend_id: &BackendId) -> CircuitState {
        self.with_entry(backend_id, |entry| entry.state)
    }

    /// Smoothed historical success rate in `[0, 1]`
    #[must_use]
    pub fn success_rate(&self, backend_id: &BackendId) -> f64 {
        self.with_entry(backend_id, |entry| entry.success_rate())
    }

    /// Average latency over the recent window
    #[must_use]
    pub fn avg_latency_ms(&self, backend_id: &BackendId) -> Option<f64> {
        self.with_entry(backend_id, |entry| entry.avg_latency_ms())
    }

    /// Per-backend aggregates for the telemetry surface, sorted by id
    #[must_use]
    pub fn snapshot(&self) -> Vec<BackendStats> {
        let entries = self.entries.read();
        let mut stats: Vec<BackendStats> = entries
            .iter()
            .map(|(id, entry)| {
                let entry = entry.lock();
                BackendStats {
                    backend_id: id.clone(),
                    state: entry.state,
                    success_count: entry.success_count,
                    failure_count: entry.failure_count,
                    consecutive_failures: entry.consecutive_failures,
                    success_rate: entry.success_rate(),
                    avg_latency_ms: entry.avg_latency_ms(),
                }
            })
            .collect();
        stats.sort_by(|a, b| a.backend_id.cmp(&b.backend_id));
        stats
    }
}
