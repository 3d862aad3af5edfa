use crate::math::window::super_resolution_window;
use crate::prelude::{
    DatasetLayout, LocalizerError, LocalizerResult, Phasor, TimingConfig, NUM_ANCHORS,
};
use crate::telemetry::log::LogManager;
use std::fs;
use std::io::Read;
use std::path::Path;

/// Immutable calibration tables shared by every cycle.
///
/// `reference` holds the expected hardware response over the non-overlapping
/// sub-band of every step (`steps × band_len` phasors, shared by all anchors).
/// `window` is the fftshift-rotated Hamming taper over one step's sub-band.
/// `step_delays` holds, per (anchor, step, harmonic) triple, the sample delay
/// at which that step was observed.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationProfile {
    reference: Vec<Phasor>,
    window: Vec<f64>,
    step_delays: Vec<f64>,
}

impl CalibrationProfile {
    /// Builds the profile from already-parsed reference phasors.
    pub fn from_reference(
        reference: Vec<Phasor>,
        layout: &DatasetLayout,
        timing: &TimingConfig,
    ) -> LocalizerResult<Self> {
        let expected = layout.base_len();
        if reference.len() != expected {
            return Err(LocalizerError::DimensionMismatch {
                what: "calibration reference",
                expected,
                actual: reference.len(),
            });
        }
        if reference.iter().any(|p| p.norm_sqr() == 0.0 || !p.is_finite()) {
            return Err(LocalizerError::Calibration(
                "reference phasors must be finite and non-zero".into(),
            ));
        }

        Ok(Self {
            reference,
            window: super_resolution_window(layout.band_len()),
            step_delays: step_time_delays(layout, timing.samples_per_freq),
        })
    }

    /// Parses whitespace-separated `real imag` pairs. A short or malformed source is fatal.
    pub fn from_reader<R: Read>(
        mut reader: R,
        layout: &DatasetLayout,
        timing: &TimingConfig,
    ) -> LocalizerResult<Self> {
        let mut contents = String::new();
        reader.read_to_string(&mut contents)?;

        let expected = layout.base_len();
        let mut tokens = contents.split_whitespace();
        let mut reference = Vec::with_capacity(expected);
        for index in 0..expected {
            let re = next_value(&mut tokens, index)?;
            let im = next_value(&mut tokens, index)?;
            reference.push(Phasor::new(re, im));
        }
        if tokens.next().is_some() {
            LogManager::new("calibration").warn(&format!(
                "calibration source holds more than {} phasors; ignoring the remainder",
                expected
            ));
        }

        Self::from_reference(reference, layout, timing)
    }

    pub fn load<P: AsRef<Path>>(
        path: P,
        layout: &DatasetLayout,
        timing: &TimingConfig,
    ) -> LocalizerResult<Self> {
        let path = path.as_ref();
        let file = fs::File::open(path).map_err(|err| {
            LocalizerError::Calibration(format!("opening {}: {}", path.display(), err))
        })?;
        let profile = Self::from_reader(file, layout, timing)?;
        LogManager::new("calibration").record(&format!(
            "loaded {} reference phasors from {}",
            profile.reference.len(),
            path.display()
        ));
        Ok(profile)
    }

    pub fn reference(&self) -> &[Phasor] {
        &self.reference
    }

    pub fn window(&self) -> &[f64] {
        &self.window
    }

    pub fn step_delays(&self) -> &[f64] {
        &self.step_delays
    }
}

fn next_value<'a>(
    tokens: &mut impl Iterator<Item = &'a str>,
    index: usize,
) -> LocalizerResult<f64> {
    let token = tokens.next().ok_or_else(|| {
        LocalizerError::Calibration(format!("source ended after {} phasors", index))
    })?;
    token.parse::<f64>().map_err(|err| {
        LocalizerError::Calibration(format!(
            "phasor {}: cannot parse {:?}: {}",
            index, token, err
        ))
    })
}

/// Sample delay of each (anchor, step, harmonic) triple: `step × samples_per_freq`.
pub fn step_time_delays(layout: &DatasetLayout, samples_per_freq: f64) -> Vec<f64> {
    (0..NUM_ANCHORS * layout.steps * layout.harmonics_per_step)
        .map(|index| ((index / layout.harmonics_per_step) % layout.steps) as f64 * samples_per_freq)
        .collect()
}
