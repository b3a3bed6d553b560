// Update metrics
//
// Lightweight counters for what the plugin did during this process lifetime

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Plugin-wide counters
///
/// Uses atomic operations so the worklist manager, the batch applier and the
/// command handlers can record without sharing a lock.
#[derive(Debug)]
pub struct Metrics {
    /// Update runs that reached the copy phase
    pub update_runs: AtomicUsize,

    /// Regions whose files all copied
    pub regions_copied: AtomicUsize,

    /// Regions with at least one failed or unmapped file
    pub regions_failed: AtomicUsize,

    /// Total time spent copying, in milliseconds
    pub total_copy_time_ms: AtomicU64,

    /// Successful writes of the protected-region file
    pub protected_writes: AtomicU64,

    /// Failed writes of the protected-region file
    pub protected_write_errors: AtomicU64,

    start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            update_runs: AtomicUsize::new(0),
            regions_copied: AtomicUsize::new(0),
            regions_failed: AtomicUsize::new(0),
            total_copy_time_ms: AtomicU64::new(0),
            protected_writes: AtomicU64::new(0),
            protected_write_errors: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn record_update_run(&self, duration: Duration) {
        self.update_runs.fetch_add(1, Ordering::Relaxed);
        self.total_copy_time_ms
            .fetch_add(duration.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn record_region_copied(&self) {
        self.regions_copied.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_region_failed(&self) {
        self.regions_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_protected_write(&self) {
        self.protected_writes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_protected_write_error(&self) {
        self.protected_write_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn update_runs(&self) -> usize {
        self.update_runs.load(Ordering::Relaxed)
    }

    pub fn regions_copied(&self) -> usize {
        self.regions_copied.load(Ordering::Relaxed)
    }

    pub fn regions_failed(&self) -> usize {
        self.regions_failed.load(Ordering::Relaxed)
    }

    pub fn protected_writes(&self) -> u64 {
        self.protected_writes.load(Ordering::Relaxed)
    }

    pub fn protected_write_errors(&self) -> u64 {
        self.protected_write_errors.load(Ordering::Relaxed)
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Average copy phase duration per update run in milliseconds
    pub fn avg_update_time_ms(&self) -> f64 {
        let total = self.total_copy_time_ms.load(Ordering::Relaxed);
        let runs = self.update_runs();
        if runs > 0 {
            total as f64 / runs as f64
        } else {
            0.0
        }
    }

    pub fn log_summary(&self) {
        tracing::info!("=== Region File Updater Metrics ===");
        tracing::info!("Uptime: {:.2}s", self.uptime().as_secs_f64());
        tracing::info!(
            "Updates: {} runs, {} regions copied, {} failed (avg {:.2}ms per run)",
            self.update_runs(),
            self.regions_copied(),
            self.regions_failed(),
            self.avg_update_time_ms()
        );
        tracing::info!(
            "Protected region file: {} writes, {} errors",
            self.protected_writes(),
            self.protected_write_errors()
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
