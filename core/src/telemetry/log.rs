use log::{debug, error, info, log_enabled, warn, Level};

/// Thin wrapper over the `log` facade that tags every line with its component.
#[derive(Debug, Clone, Copy)]
pub struct LogManager {
    component: &'static str,
}

impl LogManager {
    pub fn new(component: &'static str) -> Self {
        Self { component }
    }

    /// Whether `trace` lines would be emitted; lets callers skip building them.
    pub fn trace_enabled(&self) -> bool {
        log_enabled!(Level::Debug)
    }

    pub fn record(&self, message: &str) {
        info!("[{}] {}", self.component, message);
    }

    pub fn trace(&self, message: &str) {
        debug!("[{}] {}", self.component, message);
    }

    pub fn warn(&self, message: &str) {
        warn!("[{}] {}", self.component, message);
    }

    pub fn error(&self, message: &str) {
        error!("[{}] {}", self.component, message);
    }
}

impl Default for LogManager {
    fn default() -> Self {
        Self::new("harmloc")
    }
}
