use crate::processing::tdoa::PositionSolution;
use crate::telemetry::log::LogManager;
use crate::telemetry::metrics::MetricsRecorder;
use crate::transport::{Delivery, RecordChannel};
use std::sync::Arc;

/// Serializes each solution into a position record and pushes it out best-effort.
pub struct Reporter {
    channel: Arc<dyn RecordChannel>,
    group_id: i32,
    metrics: Arc<MetricsRecorder>,
    logger: LogManager,
}

impl Reporter {
    pub fn new(
        channel: Arc<dyn RecordChannel>,
        group_id: i32,
        metrics: Arc<MetricsRecorder>,
    ) -> Self {
        Self {
            channel,
            group_id,
            metrics,
            logger: LogManager::new("reporter"),
        }
    }

    pub fn channel(&self) -> &Arc<dyn RecordChannel> {
        &self.channel
    }

    /// Sends the record. A failed send is logged and swallowed; `None` means it failed.
    pub fn emit(&self, solution: &PositionSolution) -> Option<Delivery> {
        let record = solution.to_record(self.group_id);
        match self.channel.send(&record.to_bytes()) {
            Ok(delivery) => {
                if let Delivery::Sent(_) = delivery {
                    self.metrics.record_sent();
                }
                Some(delivery)
            }
            Err(err) => {
                self.metrics.record_send_failure();
                self.logger.error(&format!("send error: {}", err));
                None
            }
        }
    }
}
