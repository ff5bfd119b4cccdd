//! Telemetry and reporting surface
//!
//! Read-only snapshots of backend health plus a bounded ring of recent
//! request summaries. Observers never influence orchestration.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use domain::{BackendId, RequestId};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::breaker::CircuitState;

/// Aggregate statistics for one backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendStats {
    /// Backend these stats describe
    pub backend_id: BackendId,
    /// Current circuit state
    pub state: CircuitState,
    /// Total successful attempts
    pub success_count: u64,
    /// Total failed attempts (errors and timeouts)
    pub failure_count: u64,
    /// Current consecutive-failure streak
    pub consecutive_failures: u32,
    /// Smoothed success rate in `[0, 1]`
    pub success_rate: f64,
    /// Average latency over the recent window, when any samples exist
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_latency_ms: Option<f64>,
}

/// Summary of one finished analyze call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestSummary {
    /// Request id
    pub request_id: RequestId,
    /// Whether the outcome was degraded
    pub degraded: bool,
    /// End-to-end processing time in milliseconds
    pub processing_time_ms: u64,
    /// How many backends were attempted (including skips)
    pub attempt_count: usize,
    /// When the request finished
    pub completed_at: DateTime<Utc>,
}

/// Snapshot handed to external observers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryReport {
    /// Per-backend aggregates, sorted by backend id
    pub backends: Vec<BackendStats>,
    /// Most recent requests, oldest first
    pub recent_requests: Vec<RequestSummary>,
}

/// Bounded ring buffer of recent request summaries
#[derive(Debug)]
pub(crate) struct RecentRequests {
    ring: Mutex<VecDeque<RequestSummary>>,
    capacity: usize,
}

impl RecentRequests {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            ring: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity: capacity.max(1),
        }
    }

    pub(crate) fn push(&self, summary: RequestSummary) {
        let mut ring = self.ring.lock();
        if ring.len() == self.capacity {
            ring.pop_front();
        }
        ring.push_back(summary);
    }

    pub(crate) fn snapshot(&self) -> Vec<RequestSummary> {
        self.ring.lock().iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(degraded: bool) -> RequestSummary {
        RequestSummary {
            request_id: RequestId::new(),
            degraded,
            processing_time_ms: 100,
            attempt_count: 1,
            completed_at: Utc::now(),
        }
    }

    #[test]
    fn ring_evicts_oldest_at_capacity() {
        let ring = RecentRequests::new(2);
        let first = summary(false);
        ring.push(first.clone());
        ring.push(summary(false));
        ring.push(summary(true));

        let snapshot = ring.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert!(!snapshot.contains(&first));
        assert!(snapshot[1].degraded);
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let ring = RecentRequests::new(0);
        ring.push(summary(false));
        assert_eq!(ring.snapshot().len(), 1);
    }
}
