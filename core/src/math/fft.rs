use crate::prelude::{LocalizerError, LocalizerResult};
use num_complex::Complex64;
use rustfft::{num_traits::Zero, Fft, FftPlanner};
use std::sync::Arc;

/// Wraps a planned `rustfft` transform shared by a fixed number of worker threads.
///
/// The plan is a forward transform; [`FftHelper::impulse_magnitudes`] reverses
/// bins `k` and `N - k` afterwards, which yields the magnitude of the
/// (unnormalised) inverse transform.
pub struct FftHelper {
    fft: Arc<dyn Fft<f64>>,
    threads: usize,
}

impl FftHelper {
    pub fn new(size: usize, threads: usize) -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(size);
        Self {
            fft,
            threads: threads.max(1),
        }
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    pub fn len(&self) -> usize {
        self.fft.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fft.len() == 0
    }

    /// Inserts zeros at Nyquist: the first half of `spectrum` stays at the
    /// start, the second half moves to the end of a buffer `interp` times longer.
    pub fn zero_pad(spectrum: &[Complex64], interp: usize) -> Vec<Complex64> {
        let len = spectrum.len();
        let half = len / 2;
        let mut padded = vec![Complex64::zero(); len * interp];
        let padded_len = padded.len();
        padded[..half].copy_from_slice(&spectrum[..half]);
        padded[padded_len - (len - half)..].copy_from_slice(&spectrum[half..]);
        padded
    }

    /// Transforms every buffer and returns the inverse-transform magnitudes.
    ///
    /// Buffers are split across the worker threads; the call blocks until all are done.
    pub fn impulse_magnitudes(
        &self,
        buffers: &mut [Vec<Complex64>],
    ) -> LocalizerResult<Vec<Vec<f64>>> {
        let size = self.fft.len();
        if let Some(bad) = buffers.iter().find(|buffer| buffer.len() != size) {
            return Err(LocalizerError::DimensionMismatch {
                what: "transform buffer",
                expected: size,
                actual: bad.len(),
            });
        }

        if self.threads == 1 || buffers.len() <= 1 {
            let mut scratch = vec![Complex64::zero(); self.fft.get_inplace_scratch_len()];
            for buffer in buffers.iter_mut() {
                self.fft.process_with_scratch(buffer, &mut scratch);
            }
        } else {
            let per_thread = buffers.len().div_ceil(self.threads);
            std::thread::scope(|scope| {
                for group in buffers.chunks_mut(per_thread) {
                    let fft = &self.fft;
                    scope.spawn(move || {
                        let mut scratch = vec![Complex64::zero(); fft.get_inplace_scratch_len()];
                        for buffer in group.iter_mut() {
                            fft.process_with_scratch(buffer, &mut scratch);
                        }
                    });
                }
            });
        }

        Ok(buffers
            .iter()
            .map(|buffer| {
                let mut magnitudes: Vec<f64> = buffer.iter().map(|c| c.norm()).collect();
                if magnitudes.len() > 1 {
                    magnitudes[1..].reverse();
                }
                magnitudes
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    /// Spectrum of a pure delay of `delay` base samples, laid out in FFT order.
    fn delayed_spectrum(len: usize, delay: f64) -> Vec<Complex64> {
        (0..len)
            .map(|m| {
                let signed = if m < len / 2 {
                    m as f64
                } else {
                    m as f64 - len as f64
                };
                Complex64::new(0.0, -2.0 * PI * signed * delay / len as f64).exp()
            })
            .collect()
    }

    fn argmax(values: &[f64]) -> usize {
        let mut best = 0;
        for (idx, &value) in values.iter().enumerate() {
            if value > values[best] {
                best = idx;
            }
        }
        best
    }

    #[test]
    fn zero_pad_splits_halves_around_the_gap() {
        let spectrum: Vec<Complex64> = (1..=4).map(|v| Complex64::new(v as f64, 0.0)).collect();
        let padded = FftHelper::zero_pad(&spectrum, 3);
        let real: Vec<f64> = padded.iter().map(|c| c.re).collect();
        assert_eq!(
            real,
            vec![1.0, 2.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 3.0, 4.0]
        );
    }

    #[test]
    fn impulse_peak_scales_with_interpolation_factor() {
        let base = 16;
        for &(delay, interp) in &[(3.0, 4), (3.0, 8), (2.5, 4), (5.25, 8)] {
            let helper = FftHelper::new(base * interp, 1);
            let mut buffers = vec![FftHelper::zero_pad(&delayed_spectrum(base, delay), interp)];
            let magnitudes = helper.impulse_magnitudes(&mut buffers).unwrap();
            let expected = (delay * interp as f64).round() as usize;
            assert_eq!(argmax(&magnitudes[0]), expected, "delay {} interp {}", delay, interp);
            assert!((magnitudes[0][expected] - base as f64).abs() < 1e-9);
        }
    }

    #[test]
    fn threaded_transform_matches_single_thread() {
        let base = 8;
        let interp = 4;
        let build = || -> Vec<Vec<Complex64>> {
            (0..4)
                .map(|anchor| FftHelper::zero_pad(&delayed_spectrum(base, anchor as f64), interp))
                .collect()
        };
        let single = FftHelper::new(base * interp, 1)
            .impulse_magnitudes(&mut build())
            .unwrap();
        let pooled = FftHelper::new(base * interp, 3)
            .impulse_magnitudes(&mut build())
            .unwrap();
        for (lhs, rhs) in single.iter().zip(&pooled) {
            for (a, b) in lhs.iter().zip(rhs) {
                assert!((a - b).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn wrong_buffer_length_is_rejected() {
        let helper = FftHelper::new(8, 1);
        let mut buffers = vec![vec![Complex64::zero(); 4]];
        assert!(matches!(
            helper.impulse_magnitudes(&mut buffers),
            Err(LocalizerError::DimensionMismatch { .. })
        ));
    }
}
