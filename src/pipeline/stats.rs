use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Running counters shared by every pipeline task.
#[derive(Debug, Default)]
pub struct PipelineStats {
    snapshots: AtomicU64,
    failed_polls: AtomicU64,
    measurements: AtomicU64,
    crash_alerts: AtomicU64,
    raw_lines: AtomicU64,
    crash_lines: AtomicU64,
    collision_lines: AtomicU64,
    write_failures: AtomicU64,
}

/// Point-in-time copy of [`PipelineStats`], serialized as the run summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub snapshots: u64,
    pub failed_polls: u64,
    pub measurements: u64,
    pub crash_alerts: u64,
    pub raw_lines: u64,
    pub crash_lines: u64,
    pub collision_lines: u64,
    pub write_failures: u64,
}

impl PipelineStats {
    pub fn record_snapshot(&self) {
        self.snapshots.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failed_poll(&self) {
        self.failed_polls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_measurement(&self) {
        self.measurements.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_crash_alert(&self) {
        self.crash_alerts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_raw_line(&self) {
        self.raw_lines.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_crash_line(&self) {
        self.crash_lines.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_collision_lines(&self, count: u64) {
        self.collision_lines.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_write_failures(&self, count: u64) {
        self.write_failures.fetch_add(count, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            snapshots: self.snapshots.load(Ordering::Relaxed),
            failed_polls: self.failed_polls.load(Ordering::Relaxed),
            measurements: self.measurements.load(Ordering::Relaxed),
            crash_alerts: self.crash_alerts.load(Ordering::Relaxed),
            raw_lines: self.raw_lines.load(Ordering::Relaxed),
            crash_lines: self.crash_lines.load(Ordering::Relaxed),
            collision_lines: self.collision_lines.load(Ordering::Relaxed),
            write_failures: self.write_failures.load(Ordering::Relaxed),
        }
    }
}
