//! Construction-time configuration for the localizer.
//!
//! Everything here is fixed once the pipeline is built. Only the network
//! channel can be reconnected afterwards.

use crate::prelude::{LocalizerError, LocalizerResult, NUM_ANCHORS};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Tag keys under which the streaming framework delivers each input channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelNames {
    pub phasors: String,
    pub harmonic_freqs: String,
    pub harmonic_abs_freqs: String,
    pub prf: String,
}

impl Default for ChannelNames {
    fn default() -> Self {
        Self {
            phasors: "harmonic_phasors".into(),
            harmonic_freqs: "harmonic_freqs".into(),
            harmonic_abs_freqs: "harmonic_abs_freqs".into(),
            prf: "prf_est".into(),
        }
    }
}

/// Destination of the outbound position record. An empty host leaves the channel closed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Destination {
    pub host: String,
    pub port: u16,
}

impl Default for Destination {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 4001,
        }
    }
}

/// Shape of one dataset: steps, harmonics per step and the non-overlapping sub-band.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetLayout {
    pub steps: usize,
    pub harmonics_per_step: usize,
    /// First harmonic (inclusive) of the non-overlapping sub-band.
    pub band_start: usize,
    /// Last harmonic (inclusive) of the non-overlapping sub-band.
    pub band_end: usize,
    /// Zero-padding factor of the super-resolution transform.
    pub interp: usize,
}

impl Default for DatasetLayout {
    fn default() -> Self {
        Self {
            steps: 33,
            harmonics_per_step: 16,
            band_start: 4,
            band_end: 11,
            interp: 64,
        }
    }
}

impl DatasetLayout {
    pub fn band_len(&self) -> usize {
        self.band_end + 1 - self.band_start
    }

    /// Number of phasors in one dataset across all anchors.
    pub fn phasor_count(&self) -> usize {
        NUM_ANCHORS * self.steps * self.harmonics_per_step
    }

    /// Frequency bins per anchor after restricting to the sub-band.
    pub fn base_len(&self) -> usize {
        self.steps * self.band_len()
    }

    /// Length of the super-resolved impulse response.
    pub fn response_len(&self) -> usize {
        self.base_len() * self.interp
    }
}

/// Receiver timing constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub sample_rate: f64,
    pub decim_factor: f64,
    pub samples_per_freq: f64,
    pub if_freq: f64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            sample_rate: 50e6,
            decim_factor: 8.0,
            samples_per_freq: 4096.0,
            if_freq: 2.5e6,
        }
    }
}

/// Numerator/denominator coefficients of a rational transfer function, highest degree first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferFunction {
    pub b: Vec<f64>,
    pub a: Vec<f64>,
}

/// Modelled receive-chain filters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterModels {
    /// Digital comb filter, evaluated on the unit circle. Applied twice (two cascaded stages).
    pub comb: TransferFunction,
    /// Analog RC low-pass.
    pub low_pass: TransferFunction,
    /// Analog RC high-pass, evaluated at the harmonic frequency plus the IF offset.
    pub high_pass: TransferFunction,
}

impl Default for FilterModels {
    fn default() -> Self {
        let mut comb_a = vec![0.0; 17];
        comb_a[0] = 1.0;
        comb_a[16] = 0.875;
        Self {
            comb: TransferFunction {
                b: vec![1.0],
                a: comb_a,
            },
            low_pass: TransferFunction {
                b: vec![80e6],
                a: vec![1.0, 80e6],
            },
            high_pass: TransferFunction {
                b: vec![19e-12, 0.0],
                a: vec![2.99e-11, 3.03e-2],
            },
        }
    }
}

/// Fixed deployment coordinates of the four anchors, in meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnchorGeometry {
    pub positions: [[f64; 3]; NUM_ANCHORS],
}

impl Default for AnchorGeometry {
    fn default() -> Self {
        Self {
            positions: [
                [2.405, 3.815, 2.992],
                [2.105, 0.034, 2.494],
                [4.108, 0.347, 1.543],
                [0.273, 0.343, 1.560],
            ],
        }
    }
}

impl AnchorGeometry {
    pub fn new(positions: [[f64; 3]; NUM_ANCHORS]) -> Self {
        Self { positions }
    }

    pub fn x(&self, anchor: usize) -> f64 {
        self.positions[anchor][0]
    }

    pub fn y(&self, anchor: usize) -> f64 {
        self.positions[anchor][1]
    }

    pub fn z(&self, anchor: usize) -> f64 {
        self.positions[anchor][2]
    }

    /// Squared distance of the anchor from the origin.
    pub fn norm_sq(&self, anchor: usize) -> f64 {
        let [x, y, z] = self.positions[anchor];
        x * x + y * y + z * z
    }

    /// Euclidean distance from `point` to the anchor.
    pub fn distance_to(&self, anchor: usize, point: [f64; 3]) -> f64 {
        let [x, y, z] = self.positions[anchor];
        ((point[0] - x).powi(2) + (point[1] - y).powi(2) + (point[2] - z).powi(2)).sqrt()
    }
}

/// Full configuration surface of the localizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalizerConfig {
    pub channels: ChannelNames,
    pub calibration_path: PathBuf,
    pub destination: Destination,
    pub group_id: i32,
    /// Transform workers; anything above one per anchor is not used.
    pub fft_threads: usize,
    pub layout: DatasetLayout,
    pub timing: TimingConfig,
    pub filters: FilterModels,
    pub thresholds: [f64; NUM_ANCHORS],
    pub anchors: AnchorGeometry,
    pub propagation_speed: f64,
}

impl Default for LocalizerConfig {
    fn default() -> Self {
        Self {
            channels: ChannelNames::default(),
            calibration_path: PathBuf::from("tx_phasors.txt"),
            destination: Destination::default(),
            group_id: 0,
            fft_threads: 1,
            layout: DatasetLayout::default(),
            timing: TimingConfig::default(),
            filters: FilterModels::default(),
            thresholds: [0.2; NUM_ANCHORS],
            anchors: AnchorGeometry::default(),
            propagation_speed: 3e8,
        }
    }
}

impl LocalizerConfig {
    pub fn validate(&self) -> LocalizerResult<()> {
        let layout = &self.layout;
        if layout.steps == 0 || layout.harmonics_per_step == 0 {
            return Err(LocalizerError::InvalidConfig(
                "steps and harmonics per step must be non-zero".into(),
            ));
        }
        if layout.band_start > layout.band_end || layout.band_end >= layout.harmonics_per_step {
            return Err(LocalizerError::InvalidConfig(format!(
                "sub-band {}..={} does not fit {} harmonics per step",
                layout.band_start, layout.band_end, layout.harmonics_per_step
            )));
        }
        if layout.base_len() % 2 != 0 {
            return Err(LocalizerError::InvalidConfig(format!(
                "base length {} must be even",
                layout.base_len()
            )));
        }
        if layout.interp == 0 {
            return Err(LocalizerError::InvalidConfig("interp must be non-zero".into()));
        }
        if self.fft_threads == 0 {
            return Err(LocalizerError::InvalidConfig(
                "fft_threads must be at least 1".into(),
            ));
        }
        if self.timing.sample_rate <= 0.0 || self.timing.decim_factor <= 0.0 {
            return Err(LocalizerError::InvalidConfig(
                "sample rate and decimation factor must be positive".into(),
            ));
        }
        let filters = [
            ("comb", &self.filters.comb),
            ("low_pass", &self.filters.low_pass),
            ("high_pass", &self.filters.high_pass),
        ];
        for (name, filter) in filters {
            if filter.a.is_empty() || filter.b.is_empty() {
                return Err(LocalizerError::InvalidConfig(format!(
                    "{} filter needs numerator and denominator coefficients",
                    name
                )));
            }
        }
        Ok(())
    }
}
