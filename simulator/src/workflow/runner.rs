use crate::generator::scenario::SyntheticSource;
use crate::workflow::config::WorkflowConfig;
use anyhow::Context;
use harmloccore::telemetry::metrics::MetricsSnapshot;
use harmloccore::transport::RecordChannel;
use harmloccore::{CycleReport, HarmonicLocalizer, LocalizerError};
use serde::Serialize;
use std::sync::Arc;

/// One simulated cycle: ground truth next to what the localizer reported.
#[derive(Debug, Clone, Serialize)]
pub struct CycleSummary {
    pub cycle: usize,
    pub truth: [f64; 3],
    pub report: CycleReport,
    /// Distance from the truth to the closer of the two candidates.
    pub error_m: f64,
}

/// Whether a cycle error will recur on every following cycle.
pub fn is_fatal(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause
            .downcast_ref::<LocalizerError>()
            .map_or(false, LocalizerError::is_fatal)
    })
}

pub struct Runner {
    source: SyntheticSource,
    localizer: HarmonicLocalizer,
}

impl Runner {
    pub fn new(config: &WorkflowConfig, channel: Arc<dyn RecordChannel>) -> anyhow::Result<Self> {
        let localizer = HarmonicLocalizer::from_config(config.localizer.clone(), channel)
            .context("building localizer")?;
        let source = SyntheticSource::new(
            config.localizer.clone(),
            config.scenario.clone(),
            Arc::new(localizer.profile().clone()),
        );
        Ok(Self { source, localizer })
    }

    pub fn step(&mut self) -> anyhow::Result<CycleSummary> {
        let cycle = self.source.cycle();
        let (tags, truth) = self.source.next_deliveries();
        let report = self
            .localizer
            .handle_tags(tags)
            .with_context(|| format!("processing cycle {}", cycle))?;
        let error_m = report
            .solution
            .candidates()
            .iter()
            .map(|candidate| candidate.distance_to(truth))
            .fold(f64::INFINITY, f64::min);
        Ok(CycleSummary {
            cycle,
            truth,
            report,
            error_m,
        })
    }

    /// Runs `cycles` cycles back to back.
    pub fn run(&mut self, cycles: usize) -> anyhow::Result<Vec<CycleSummary>> {
        (0..cycles).map(|_| self.step()).collect()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.localizer.metrics()
    }

    pub fn shutdown(&self) {
        self.localizer.disconnect();
    }
}
