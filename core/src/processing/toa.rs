//! Super-resolution time-of-arrival extraction.
//!
//! Per anchor, the compensated sub-band phasors of all steps form one
//! frequency-ordered vector. It is tapered, deconvolved against the
//! calibration reference, zero-padded `interp` times and transformed into an
//! impulse response whose leading edge gives the ToA.

use crate::calibration::CalibrationProfile;
use crate::math::fft::FftHelper;
use crate::math::stats::StatsHelper;
use crate::prelude::{
    DatasetLayout, LocalizerError, LocalizerResult, Phasor, ProcessingStage, NUM_ANCHORS,
};
use crate::telemetry::log::LogManager;
use ndarray::{s, ArrayView3};
use serde::{Deserialize, Serialize};

/// Magnitude of one anchor's reconstructed impulse response.
#[derive(Debug, Clone, PartialEq)]
pub struct ImpulseResponse {
    pub magnitudes: Vec<f64>,
    pub peak_index: usize,
    pub peak_magnitude: f64,
}

impl ImpulseResponse {
    /// Records the first index holding the maximum magnitude.
    pub fn from_magnitudes(magnitudes: Vec<f64>) -> Self {
        let mut peak_index = 0;
        let mut peak_magnitude = 0.0;
        for (idx, &value) in magnitudes.iter().enumerate() {
            if value > peak_magnitude {
                peak_magnitude = value;
                peak_index = idx;
            }
        }
        Self {
            magnitudes,
            peak_index,
            peak_magnitude,
        }
    }

    pub fn len(&self) -> usize {
        self.magnitudes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.magnitudes.is_empty()
    }

    /// Walks backwards (circularly) from the peak and returns the earliest
    /// index at or above `threshold` before a below-threshold run of a quarter
    /// of the response length.
    pub fn leading_edge(&self, threshold: f64) -> usize {
        let len = self.magnitudes.len();
        if len == 0 {
            return 0;
        }
        let stop_run = (len / 4).max(1);
        let mut cursor = self.peak_index;
        let mut candidate = self.peak_index;
        let mut below = 0;
        for _ in 0..len {
            cursor = if cursor == 0 { len - 1 } else { cursor - 1 };
            if self.magnitudes[cursor] < threshold {
                below += 1;
                if below >= stop_run {
                    break;
                }
            } else {
                candidate = cursor;
                below = 0;
            }
        }
        candidate
    }
}

/// Per-anchor ToA in interpolated samples of a response of `response_len`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToaVector {
    pub samples: [usize; NUM_ANCHORS],
    pub response_len: usize,
}

impl ToaVector {
    /// Rotates all ToAs by a common offset so anchor 0 lands at the response
    /// midpoint, wrapping back into `[0, response_len)`.
    pub fn centred(raw: [usize; NUM_ANCHORS], response_len: usize) -> Self {
        let len = response_len as i64;
        let offset = len / 2 - raw[0] as i64;
        let samples = raw.map(|toa| (toa as i64 + offset).rem_euclid(len.max(1)) as usize);
        Self {
            samples,
            response_len,
        }
    }

    /// Range-equivalent distance per anchor: `toa / (2·prf·base_len·interp) × speed`.
    pub fn distances(
        &self,
        prf_estimate: f64,
        layout: &DatasetLayout,
        propagation_speed: f64,
    ) -> [f64; NUM_ANCHORS] {
        let scale = 2.0 * prf_estimate * layout.base_len() as f64 * layout.interp as f64;
        self.samples
            .map(|toa| toa as f64 / scale * propagation_speed)
    }
}

/// Borrowed inputs of one extraction pass.
pub struct ToaInput<'a> {
    pub phasors: &'a [Phasor],
    pub profile: &'a CalibrationProfile,
}

pub struct ToaExtractor {
    layout: DatasetLayout,
    thresholds: [f64; NUM_ANCHORS],
    fft: FftHelper,
    logger: LogManager,
}

impl ToaExtractor {
    /// Transforms are split per anchor, so at most `NUM_ANCHORS` workers are used.
    pub fn new(layout: DatasetLayout, thresholds: [f64; NUM_ANCHORS], fft_threads: usize) -> Self {
        let fft = FftHelper::new(layout.response_len(), fft_threads.min(NUM_ANCHORS));
        Self {
            layout,
            thresholds,
            fft,
            logger: LogManager::new("toa"),
        }
    }

    /// Restricts each anchor to the non-overlapping sub-band and concatenates its steps.
    pub fn rearrange(&self, phasors: &[Phasor]) -> LocalizerResult<Vec<Vec<Phasor>>> {
        let layout = &self.layout;
        let cube = ArrayView3::from_shape(
            (NUM_ANCHORS, layout.steps, layout.harmonics_per_step),
            phasors,
        )
        .map_err(|_| LocalizerError::DimensionMismatch {
            what: "phasor vector",
            expected: layout.phasor_count(),
            actual: phasors.len(),
        })?;

        Ok((0..NUM_ANCHORS)
            .map(|anchor| {
                cube.slice(s![anchor, .., layout.band_start..=layout.band_end])
                    .iter()
                    .copied()
                    .collect()
            })
            .collect())
    }

    /// Tapers one anchor's vector with the per-step window and divides by the reference.
    pub fn deconvolve(&self, band: &mut [Phasor], profile: &CalibrationProfile) {
        let window = profile.window();
        let reference = profile.reference();
        for (idx, value) in band.iter_mut().enumerate() {
            *value *= window[idx % window.len()];
            *value /= reference[idx % reference.len()];
        }
    }

    /// Builds the super-resolved impulse response of every anchor.
    pub fn impulse_responses(
        &self,
        phasors: &[Phasor],
        profile: &CalibrationProfile,
    ) -> LocalizerResult<Vec<ImpulseResponse>> {
        let mut spectra = self.rearrange(phasors)?;
        for band in spectra.iter_mut() {
            self.deconvolve(band, profile);
        }

        let mut padded: Vec<Vec<Phasor>> = spectra
            .iter()
            .map(|band| FftHelper::zero_pad(band, self.layout.interp))
            .collect();
        let magnitudes = self.fft.impulse_magnitudes(&mut padded)?;

        Ok(magnitudes
            .into_iter()
            .map(ImpulseResponse::from_magnitudes)
            .collect())
    }

    /// ToA of every anchor, rotated so anchor 0 sits at the response midpoint.
    pub fn extract(
        &self,
        phasors: &[Phasor],
        profile: &CalibrationProfile,
    ) -> LocalizerResult<ToaVector> {
        let responses = self.impulse_responses(phasors, profile)?;
        let mut raw = [0usize; NUM_ANCHORS];
        for (anchor, response) in responses.iter().enumerate() {
            let threshold = self.thresholds[anchor] * response.peak_magnitude;
            raw[anchor] = response.leading_edge(threshold);
            if self.logger.trace_enabled() {
                self.logger.trace(&format!(
                    "anchor {} peak {} at {} (peak/rms {:.2}), leading edge {}",
                    anchor,
                    response.peak_magnitude,
                    response.peak_index,
                    StatsHelper::peak_to_rms(response.peak_magnitude, &response.magnitudes),
                    raw[anchor]
                ));
            }
        }
        Ok(ToaVector::centred(raw, self.layout.response_len()))
    }
}

impl ProcessingStage for ToaExtractor {
    type Input<'a> = ToaInput<'a>;
    type Output = ToaVector;

    fn name(&self) -> &'static str {
        "toa-extraction"
    }

    fn execute(&mut self, input: Self::Input<'_>) -> LocalizerResult<ToaVector> {
        self.extract(input.phasors, input.profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prelude::TimingConfig;
    use std::f64::consts::PI;

    fn small_layout() -> DatasetLayout {
        DatasetLayout {
            steps: 4,
            harmonics_per_step: 12,
            band_start: 2,
            band_end: 9,
            interp: 8,
        }
    }

    fn unit_profile(layout: &DatasetLayout) -> CalibrationProfile {
        CalibrationProfile::from_reference(
            vec![Phasor::new(1.0, 0.0); layout.base_len()],
            layout,
            &TimingConfig::default(),
        )
        .unwrap()
    }

    /// Full phasor vector whose sub-band carries, per anchor, a pure delay of
    /// `delays[anchor]` interpolated samples in FFT bin order.
    fn delayed_phasors(layout: &DatasetLayout, delays: [f64; NUM_ANCHORS]) -> Vec<Phasor> {
        let base = layout.base_len();
        let response = layout.response_len() as f64;
        let mut phasors = vec![Phasor::new(1.0, 0.0); layout.phasor_count()];
        for (anchor, delay) in delays.iter().enumerate() {
            for step in 0..layout.steps {
                for k in 0..layout.band_len() {
                    let m = step * layout.band_len() + k;
                    let signed = if m < base / 2 {
                        m as f64
                    } else {
                        m as f64 - base as f64
                    };
                    let harmonic = layout.band_start + k;
                    let idx = (anchor * layout.steps + step) * layout.harmonics_per_step + harmonic;
                    phasors[idx] = Phasor::new(0.0, -2.0 * PI * signed * delay / response).exp();
                }
            }
        }
        phasors
    }

    #[test]
    fn leading_edge_walks_back_over_the_main_lobe() {
        let mut magnitudes = vec![0.0; 40];
        magnitudes[20] = 1.0;
        magnitudes[19] = 0.8;
        magnitudes[18] = 0.5;
        magnitudes[17] = 0.1;
        let response = ImpulseResponse::from_magnitudes(magnitudes);
        assert_eq!(response.peak_index, 20);
        assert_eq!(response.leading_edge(0.2), 18);
    }

    #[test]
    fn leading_edge_bridges_short_gaps_and_wraps() {
        let mut magnitudes = vec![0.0; 40];
        magnitudes[2] = 1.0;
        magnitudes[1] = 0.9;
        // gap of 3 (< 40 / 4) then an earlier arrival across the wrap
        magnitudes[37] = 0.5;
        magnitudes[36] = 0.6;
        let response = ImpulseResponse::from_magnitudes(magnitudes);
        assert_eq!(response.leading_edge(0.2), 36);
    }

    #[test]
    fn workers_are_capped_at_one_per_anchor() {
        let extractor = ToaExtractor::new(small_layout(), [0.2; NUM_ANCHORS], 16);
        assert_eq!(extractor.fft.threads(), NUM_ANCHORS);
        let single = ToaExtractor::new(small_layout(), [0.2; NUM_ANCHORS], 1);
        assert_eq!(single.fft.threads(), 1);
    }

    #[test]
    fn rotation_puts_anchor_zero_at_midpoint() {
        let toas = ToaVector::centred([10, 90, 0, 50], 100);
        assert_eq!(toas.samples, [50, 30, 40, 90]);

        let toas = ToaVector::centred([60, 5, 99, 61], 100);
        assert_eq!(toas.samples[0], 50);
        assert!(toas.samples.iter().all(|&t| t < 100));
        assert_eq!(toas.samples, [50, 95, 89, 51]);
    }

    #[test]
    fn distances_use_prf_and_response_scale() {
        let layout = small_layout();
        let response_len = layout.response_len();
        let toas = ToaVector {
            samples: [0, response_len / 2, 0, 0],
            response_len,
        };
        let distances = toas.distances(1e6, &layout, 3e8);
        // half the response spans 1 / (4·prf) seconds
        assert!((distances[1] - 75.0).abs() < 1e-9);
        assert_eq!(distances[0], 0.0);
    }

    #[test]
    fn rearrange_keeps_only_the_sub_band() {
        let layout = small_layout();
        let extractor = ToaExtractor::new(layout.clone(), [0.2; NUM_ANCHORS], 1);
        let phasors: Vec<Phasor> = (0..layout.phasor_count())
            .map(|i| Phasor::new(i as f64, 0.0))
            .collect();
        let bands = extractor.rearrange(&phasors).unwrap();
        assert_eq!(bands.len(), NUM_ANCHORS);
        assert_eq!(bands[0].len(), layout.base_len());
        assert_eq!(bands[0][0].re, 2.0);
        assert_eq!(bands[0][7].re, 9.0);
        assert_eq!(bands[0][8].re, 14.0);
        assert_eq!(bands[1][0].re, (layout.steps * 12 + 2) as f64);
    }

    #[test]
    fn rearrange_rejects_wrong_length() {
        let extractor = ToaExtractor::new(small_layout(), [0.2; NUM_ANCHORS], 1);
        assert!(matches!(
            extractor.rearrange(&[Phasor::new(0.0, 0.0); 5]),
            Err(LocalizerError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn impulse_peak_tracks_injected_delay() {
        let layout = small_layout();
        let extractor = ToaExtractor::new(layout.clone(), [0.2; NUM_ANCHORS], 2);
        let profile = unit_profile(&layout);
        let delays = [40.0, 55.0, 47.0, 70.0];
        let responses = extractor
            .impulse_responses(&delayed_phasors(&layout, delays), &profile)
            .unwrap();
        for (response, delay) in responses.iter().zip(delays) {
            assert_eq!(response.len(), layout.response_len());
            assert_eq!(response.peak_index, delay as usize);
        }
    }

    #[test]
    fn toa_differences_follow_delay_differences() {
        let layout = small_layout();
        let extractor = ToaExtractor::new(layout.clone(), [0.2; NUM_ANCHORS], 1);
        let profile = unit_profile(&layout);
        let delays = [40.0, 55.0, 47.0, 70.0];
        let toas = extractor
            .extract(&delayed_phasors(&layout, delays), &profile)
            .unwrap();

        let mid = layout.response_len() / 2;
        assert_eq!(toas.samples[0], mid);
        for anchor in 1..NUM_ANCHORS {
            let expected = mid as f64 + delays[anchor] - delays[0];
            assert!(
                (toas.samples[anchor] as f64 - expected).abs() <= 1.0,
                "anchor {}: {} vs {}",
                anchor,
                toas.samples[anchor],
                expected
            );
        }
    }

    #[test]
    fn matching_reference_yields_midpoint_for_every_anchor() {
        let layout = small_layout();
        let extractor = ToaExtractor::new(layout.clone(), [0.2; NUM_ANCHORS], 1);
        let reference: Vec<Phasor> = (0..layout.base_len())
            .map(|i| Phasor::from_polar(1.0 + (i % 3) as f64, i as f64 * 0.7))
            .collect();
        let profile =
            CalibrationProfile::from_reference(reference.clone(), &layout, &TimingConfig::default())
                .unwrap();

        let mut phasors = vec![Phasor::new(0.0, 0.0); layout.phasor_count()];
        for anchor in 0..NUM_ANCHORS {
            for step in 0..layout.steps {
                for k in 0..layout.band_len() {
                    let idx = (anchor * layout.steps + step) * layout.harmonics_per_step
                        + layout.band_start
                        + k;
                    phasors[idx] = reference[step * layout.band_len() + k];
                }
            }
        }

        let toas = extractor.extract(&phasors, &profile).unwrap();
        let mid = layout.response_len() / 2;
        assert_eq!(toas.samples, [mid; NUM_ANCHORS]);
        let distances = toas.distances(1e6, &layout, 3e8);
        assert!(distances.iter().all(|d| *d == distances[0]));
    }
}
