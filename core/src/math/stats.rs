pub struct StatsHelper;

impl StatsHelper {
    pub fn rms(samples: &[f64]) -> f64 {
        if samples.is_empty() {
            return 0.0;
        }
        let sum_sq: f64 = samples.iter().map(|&v| v * v).sum();
        (sum_sq / samples.len() as f64).sqrt()
    }

    /// Ratio of `peak` to the RMS of `samples`; zero when the sequence carries no energy.
    pub fn peak_to_rms(peak: f64, samples: &[f64]) -> f64 {
        let rms = Self::rms(samples);
        if rms > 0.0 {
            peak / rms
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rms_zero_sequence_yields_zero() {
        assert_eq!(StatsHelper::rms(&[]), 0.0);
        assert_eq!(StatsHelper::rms(&[0.0, 0.0]), 0.0);
    }

    #[test]
    fn peak_to_rms_of_flat_sequence_is_one() {
        assert!((StatsHelper::peak_to_rms(2.0, &[2.0, 2.0, 2.0]) - 1.0).abs() < 1e-12);
        assert_eq!(StatsHelper::peak_to_rms(1.0, &[0.0; 4]), 0.0);
    }
}
