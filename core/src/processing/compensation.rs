//! Removal of the receive chain's analytic transfer functions.
//!
//! Every correction indexes its per-frequency response with `index mod len`,
//! so a response computed over one anchor's (step, harmonic) grid is
//! broadcast across all anchors.

use crate::math::polynomial::{freqs, freqz};
use crate::prelude::{
    FilterModels, LocalizerResult, Phasor, ProcessingStage, TimingConfig,
};
use std::f64::consts::PI;

/// Borrowed inputs of one compensation pass.
pub struct CompensationInput<'a> {
    pub phasors: &'a mut [Phasor],
    pub harmonic_freqs: &'a [f64],
    pub step_delays: &'a [f64],
}

pub struct FilterCompensator {
    filters: FilterModels,
    timing: TimingConfig,
}

impl FilterCompensator {
    pub fn new(filters: FilterModels, timing: TimingConfig) -> Self {
        Self { filters, timing }
    }

    /// Response of one comb stage at each harmonic frequency (normalised by the sample rate).
    pub fn comb_response(&self, harmonic_freqs: &[f64]) -> Vec<Phasor> {
        let w: Vec<f64> = harmonic_freqs
            .iter()
            .map(|f| 2.0 * PI * f / self.timing.sample_rate)
            .collect();
        freqz(&self.filters.comb.b, &self.filters.comb.a, &w)
    }

    pub fn low_pass_response(&self, harmonic_freqs: &[f64]) -> Vec<Phasor> {
        let w: Vec<f64> = harmonic_freqs.iter().map(|f| 2.0 * PI * f).collect();
        freqs(&self.filters.low_pass.b, &self.filters.low_pass.a, &w)
    }

    /// The high-pass sits before the mixer, so it sees the harmonic plus the IF offset.
    pub fn high_pass_response(&self, harmonic_freqs: &[f64]) -> Vec<Phasor> {
        let w: Vec<f64> = harmonic_freqs
            .iter()
            .map(|f| 2.0 * PI * (f + self.timing.if_freq))
            .collect();
        freqs(&self.filters.high_pass.b, &self.filters.high_pass.a, &w)
    }

    /// Phase ramp imparted on a phasor observed `delay` decimated samples after the first step.
    pub fn step_time_rotation(&self, freq: f64, delay: f64) -> Phasor {
        let decimated_rate = self.timing.sample_rate / self.timing.decim_factor;
        Phasor::new(0.0, -2.0 * PI * freq * delay / decimated_rate).exp()
    }

    /// Divides out two cascaded comb stages.
    pub fn correct_comb_phase(&self, phasors: &mut [Phasor], harmonic_freqs: &[f64]) {
        let response: Vec<Phasor> = self
            .comb_response(harmonic_freqs)
            .into_iter()
            .map(|h| h * h)
            .collect();
        divide_broadcast(phasors, &response);
    }

    pub fn compensate_low_pass(&self, phasors: &mut [Phasor], harmonic_freqs: &[f64]) {
        divide_broadcast(phasors, &self.low_pass_response(harmonic_freqs));
    }

    pub fn compensate_high_pass(&self, phasors: &mut [Phasor], harmonic_freqs: &[f64]) {
        divide_broadcast(phasors, &self.high_pass_response(harmonic_freqs));
    }

    /// Moves every phasor back onto the first step's time base.
    pub fn compensate_step_time(
        &self,
        phasors: &mut [Phasor],
        harmonic_freqs: &[f64],
        step_delays: &[f64],
    ) {
        if harmonic_freqs.is_empty() || step_delays.is_empty() {
            return;
        }
        for (index, phasor) in phasors.iter_mut().enumerate() {
            let freq = harmonic_freqs[index % harmonic_freqs.len()];
            let delay = step_delays[index % step_delays.len()];
            *phasor *= self.step_time_rotation(freq, delay);
        }
    }
}

fn divide_broadcast(phasors: &mut [Phasor], response: &[Phasor]) {
    if response.is_empty() {
        return;
    }
    for (index, phasor) in phasors.iter_mut().enumerate() {
        *phasor /= response[index % response.len()];
    }
}

impl ProcessingStage for FilterCompensator {
    type Input<'a> = CompensationInput<'a>;
    type Output = ();

    fn name(&self) -> &'static str {
        "filter-compensation"
    }

    fn execute(&mut self, input: Self::Input<'_>) -> LocalizerResult<()> {
        let CompensationInput {
            phasors,
            harmonic_freqs,
            step_delays,
        } = input;
        self.correct_comb_phase(phasors, harmonic_freqs);
        self.compensate_low_pass(phasors, harmonic_freqs);
        self.compensate_high_pass(phasors, harmonic_freqs);
        self.compensate_step_time(phasors, harmonic_freqs, step_delays);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compensator() -> FilterCompensator {
        FilterCompensator::new(FilterModels::default(), TimingConfig::default())
    }

    fn sample_phasors(len: usize) -> Vec<Phasor> {
        (0..len)
            .map(|i| Phasor::from_polar(1.0 + i as f64 * 0.1, i as f64 * 0.37))
            .collect()
    }

    fn assert_close(lhs: &[Phasor], rhs: &[Phasor]) {
        for (a, b) in lhs.iter().zip(rhs) {
            assert!((a - b).norm() < 1e-9 * (1.0 + b.norm()), "{} vs {}", a, b);
        }
    }

    #[test]
    fn low_pass_round_trip_recovers_input() {
        let stage = compensator();
        let freqs = [-15e6, -3e6, 1e3, 2e6, 40e6];
        let original = sample_phasors(10);
        let mut phasors = original.clone();

        stage.compensate_low_pass(&mut phasors, &freqs);
        let response = stage.low_pass_response(&freqs);
        for (i, p) in phasors.iter_mut().enumerate() {
            *p *= response[i % response.len()];
        }
        assert_close(&phasors, &original);
    }

    #[test]
    fn low_pass_changes_phase_above_dc() {
        let stage = compensator();
        let response = stage.low_pass_response(&[80e6 / (2.0 * PI)]);
        assert!((response[0].arg() + PI / 4.0).abs() < 1e-12);
    }

    #[test]
    fn comb_correction_divides_by_squared_response() {
        let stage = compensator();
        let freqs = [1e6, 2.5e6];
        let h = stage.comb_response(&freqs);
        let mut phasors = vec![Phasor::new(1.0, 0.0); 4];
        stage.correct_comb_phase(&mut phasors, &freqs);
        let expected: Vec<Phasor> = (0..4)
            .map(|i| Phasor::new(1.0, 0.0) / (h[i % 2] * h[i % 2]))
            .collect();
        assert_close(&phasors, &expected);
    }

    #[test]
    fn comb_at_dc_has_known_gain() {
        // 1 / (1 + 0.875) on the unit circle at w = 0
        let h = compensator().comb_response(&[0.0]);
        assert!((h[0] - Phasor::new(1.0 / 1.875, 0.0)).norm() < 1e-12);
    }

    #[test]
    fn high_pass_uses_if_offset() {
        let stage = compensator();
        let if_freq = TimingConfig::default().if_freq;
        let shifted = stage.high_pass_response(&[-if_freq]);
        assert!(shifted[0].norm() < 1e-15);
        let regular = stage.high_pass_response(&[1e6]);
        assert!(regular[0].norm() > 0.0);
    }

    #[test]
    fn step_time_removes_delay_ramp() {
        let stage = compensator();
        let freqs = [1e6, 3e6];
        let delays = [0.0, 0.0, 4096.0, 4096.0];
        let original = sample_phasors(8);
        let mut phasors: Vec<Phasor> = original
            .iter()
            .enumerate()
            .map(|(i, p)| p * stage.step_time_rotation(freqs[i % 2], delays[i % 4]).conj())
            .collect();
        stage.compensate_step_time(&mut phasors, &freqs, &delays);
        assert_close(&phasors, &original);
        // first step is untouched
        assert_eq!(stage.step_time_rotation(5e6, 0.0), Phasor::new(1.0, 0.0));
    }

    #[test]
    fn execute_applies_all_corrections_in_place() {
        let mut stage = compensator();
        let freqs = vec![1e6, 2e6];
        let delays = vec![0.0, 100.0];
        let mut phasors = sample_phasors(4);
        let before = phasors.clone();
        stage
            .execute(CompensationInput {
                phasors: &mut phasors,
                harmonic_freqs: &freqs,
                step_delays: &delays,
            })
            .unwrap();
        assert!(phasors.iter().zip(&before).any(|(a, b)| (a - b).norm() > 1e-6));
        assert!(phasors.iter().all(|p| p.is_finite()));
    }
}
