//! Dispatch counters for observability

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters shared by every clone of a dispatcher
#[derive(Debug, Default)]
pub struct DispatchMetrics {
    /// Calls received by `distribute`
    calls: AtomicU64,
    /// Calls that returned a result
    completed: AtomicU64,
    /// Calls that ended in a call-level error
    failed: AtomicU64,
    /// Failures caused by the timeout bound
    timeouts: AtomicU64,
    /// Calls scheduled in the background
    accepted: AtomicU64,
}

impl DispatchMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    pub fn inc_calls(&self) {
        self.calls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
    }

    pub fn inc_completed(&self) {
        self.completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    pub fn inc_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn timeouts(&self) -> u64 {
        self.timeouts.load(Ordering::Relaxed)
    }

    /// Counts as a failure too
    pub fn inc_timeouts(&self) {
        self.timeouts.fetch_add(1, Ordering::Relaxed);
        self.inc_failed();
    }

    pub fn accepted(&self) -> u64 {
        self.accepted.load(Ordering::Relaxed)
    }

    pub fn inc_accepted(&self) {
        self.accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            calls: self.calls(),
            completed: self.completed(),
            failed: self.failed(),
            timeouts: self.timeouts(),
            accepted: self.accepted(),
        }
    }
}

/// Snapshot of dispatch metrics (for reporting)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub calls: u64,
    pub completed: u64,
    pub failed: u64,
    pub timeouts: u64,
    pub accepted: u64,
}
