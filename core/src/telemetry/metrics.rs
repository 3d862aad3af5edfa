use serde::Serialize;
use std::sync::Mutex;

/// Per-process pipeline counters.
pub struct MetricsRecorder {
    inner: Mutex<MetricsSnapshot>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub cycles: usize,
    pub failed_cycles: usize,
    pub records_sent: usize,
    pub send_failures: usize,
    pub non_finite_solutions: usize,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MetricsSnapshot::default()),
        }
    }

    fn update(&self, apply: impl FnOnce(&mut MetricsSnapshot)) {
        if let Ok(mut metrics) = self.inner.lock() {
            apply(&mut metrics);
        }
    }

    pub fn record_cycle(&self) {
        self.update(|m| m.cycles += 1);
    }

    pub fn record_failed_cycle(&self) {
        self.update(|m| m.failed_cycles += 1);
    }

    pub fn record_sent(&self) {
        self.update(|m| m.records_sent += 1);
    }

    pub fn record_send_failure(&self) {
        self.update(|m| m.send_failures += 1);
    }

    pub fn record_non_finite(&self) {
        self.update(|m| m.non_finite_solutions += 1);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        self.inner.lock().map(|m| *m).unwrap_or_default()
    }
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}
