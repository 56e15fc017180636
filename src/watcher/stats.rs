use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Counters shared between the event loop and the spawned plugin tasks.
#[derive(Debug, Default)]
pub struct DispatchStats {
    detected: AtomicUsize,
    dispatched: AtomicUsize,
    skipped: AtomicUsize,
    ignored: AtomicUsize,
    plugin_errors: AtomicUsize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchCounts {
    pub detected: usize,
    pub dispatched: usize,
    pub skipped: usize,
    pub ignored: usize,
    pub plugin_errors: usize,
}

impl DispatchStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_detected(&self) {
        self.detected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dispatched(&self) {
        self.dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_skipped(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_ignored(&self) {
        self.ignored.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_plugin_error(&self) {
        self.plugin_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> DispatchCounts {
        DispatchCounts {
            detected: self.detected.load(Ordering::Relaxed),
            dispatched: self.dispatched.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            ignored: self.ignored.load(Ordering::Relaxed),
            plugin_errors: self.plugin_errors.load(Ordering::Relaxed),
        }
    }
}

/// What a watch session did, printed when the watcher stops.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub folders: Vec<PathBuf>,
    pub plugins: Vec<String>,
    pub counts: DispatchCounts,
}

impl SessionReport {
    pub fn duration(&self) -> Duration {
        (self.finished_at - self.started_at)
            .to_std()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let stats = DispatchStats::new();
        stats.record_detected();
        stats.record_detected();
        stats.record_dispatched();
        stats.record_skipped();
        stats.record_plugin_error();

        let counts = stats.snapshot();
        assert_eq!(counts.detected, 2);
        assert_eq!(counts.dispatched, 1);
        assert_eq!(counts.skipped, 1);
        assert_eq!(counts.ignored, 0);
        assert_eq!(counts.plugin_errors, 1);
    }

    #[test]
    fn test_report_duration() {
        let started_at = Utc::now();
        let report = SessionReport {
            started_at,
            finished_at: started_at + chrono::Duration::seconds(90),
            folders: vec![],
            plugins: vec![],
            counts: DispatchCounts::default(),
        };
        assert_eq!(report.duration(), Duration::from_secs(90));
    }
}
