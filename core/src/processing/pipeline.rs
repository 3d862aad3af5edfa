use crate::calibration::CalibrationProfile;
use crate::prelude::{
    LocalizerConfig, LocalizerError, LocalizerResult, ProcessingStage, NUM_ANCHORS,
};
use crate::processing::compensation::{CompensationInput, FilterCompensator};
use crate::processing::report::Reporter;
use crate::processing::tdoa::{PositionSolution, TdoaSolver};
use crate::processing::toa::{ToaExtractor, ToaInput, ToaVector};
use crate::tag_interface::{DatasetAssembler, HarmonicDataset, Tag};
use crate::telemetry::log::LogManager;
use crate::telemetry::metrics::{MetricsRecorder, MetricsSnapshot};
use crate::transport::{Delivery, RecordChannel};
use serde::Serialize;
use std::sync::Arc;

/// Everything one cycle produced.
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub toas: ToaVector,
    pub distances: [f64; NUM_ANCHORS],
    pub solution: PositionSolution,
    /// `None` when the send failed.
    pub delivery: Option<Delivery>,
}

/// Compensation → ToA extraction → TDOA solve → report, run once per dataset.
pub struct HarmonicLocalizer {
    config: LocalizerConfig,
    profile: Arc<CalibrationProfile>,
    assembler: DatasetAssembler,
    compensator: FilterCompensator,
    extractor: ToaExtractor,
    solver: TdoaSolver,
    reporter: Reporter,
    metrics: Arc<MetricsRecorder>,
    logger: LogManager,
}

impl HarmonicLocalizer {
    /// Builds the pipeline around an already-loaded calibration profile.
    pub fn new(
        config: LocalizerConfig,
        profile: Arc<CalibrationProfile>,
        channel: Arc<dyn RecordChannel>,
    ) -> LocalizerResult<Self> {
        config.validate()?;
        let layout = &config.layout;
        let checks = [
            ("calibration reference", layout.base_len(), profile.reference().len()),
            ("calibration window", layout.band_len(), profile.window().len()),
            ("step delay table", layout.phasor_count(), profile.step_delays().len()),
        ];
        for (what, expected, actual) in checks {
            if expected != actual {
                return Err(LocalizerError::DimensionMismatch {
                    what,
                    expected,
                    actual,
                });
            }
        }

        let metrics = Arc::new(MetricsRecorder::new());
        Ok(Self {
            assembler: DatasetAssembler::new(config.channels.clone()),
            compensator: FilterCompensator::new(config.filters.clone(), config.timing.clone()),
            extractor: ToaExtractor::new(layout.clone(), config.thresholds, config.fft_threads),
            solver: TdoaSolver::new(config.anchors),
            reporter: Reporter::new(channel, config.group_id, metrics.clone()),
            metrics,
            logger: LogManager::new("localizer"),
            profile,
            config,
        })
    }

    /// Loads the calibration file named in the configuration and connects the channel.
    pub fn from_config(
        config: LocalizerConfig,
        channel: Arc<dyn RecordChannel>,
    ) -> LocalizerResult<Self> {
        config.validate()?;
        let profile =
            CalibrationProfile::load(&config.calibration_path, &config.layout, &config.timing)?;
        let destination = config.destination.clone();
        let localizer = Self::new(config, Arc::new(profile), channel)?;
        localizer.reconnect(&destination.host, destination.port)?;
        Ok(localizer)
    }

    pub fn config(&self) -> &LocalizerConfig {
        &self.config
    }

    pub fn profile(&self) -> &CalibrationProfile {
        &self.profile
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Points the outbound channel at a new destination.
    pub fn reconnect(&self, host: &str, port: u16) -> LocalizerResult<()> {
        self.reporter.channel().connect(host, port)
    }

    pub fn disconnect(&self) {
        self.reporter.channel().disconnect();
    }

    /// Applies a delivery of tags and runs one cycle on the latest values.
    pub fn handle_tags<I: IntoIterator<Item = Tag>>(
        &mut self,
        tags: I,
    ) -> LocalizerResult<CycleReport> {
        self.assembler.apply_all(tags)?;
        let dataset = self.assembler.dataset()?;
        self.process(&dataset)
    }

    pub fn process(&mut self, dataset: &HarmonicDataset) -> LocalizerResult<CycleReport> {
        match self.run_cycle(dataset) {
            Ok(report) => {
                self.metrics.record_cycle();
                Ok(report)
            }
            Err(err) => {
                self.metrics.record_failed_cycle();
                self.logger.error(&format!("cycle aborted: {}", err));
                Err(err)
            }
        }
    }

    fn run_cycle(&mut self, dataset: &HarmonicDataset) -> LocalizerResult<CycleReport> {
        dataset.validate(&self.config.layout)?;

        let mut phasors = dataset.phasors.clone();
        self.compensator.execute(CompensationInput {
            phasors: &mut phasors,
            harmonic_freqs: &dataset.harmonic_freqs,
            step_delays: self.profile.step_delays(),
        })?;

        let toas = self.extractor.execute(ToaInput {
            phasors: &phasors,
            profile: &self.profile,
        })?;
        let distances = toas.distances(
            dataset.prf_estimate,
            &self.config.layout,
            self.config.propagation_speed,
        );

        let solution = self.solver.execute(&distances)?;
        if !solution.is_finite() {
            self.metrics.record_non_finite();
            self.logger.warn(&format!(
                "non-finite solution for distances {:?} (discriminant {})",
                distances, solution.discriminant
            ));
        }
        if self.logger.trace_enabled() {
            self.logger.trace(&format!(
                "toas {:?} -> {:?} / {:?}",
                toas.samples, solution.first, solution.second
            ));
        }

        let delivery = self.reporter.emit(&solution);
        Ok(CycleReport {
            toas,
            distances,
            solution,
            delivery,
        })
    }
}
