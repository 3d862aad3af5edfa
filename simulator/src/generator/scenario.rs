use harmloccore::calibration::CalibrationProfile;
use harmloccore::prelude::{LocalizerConfig, Phasor, NUM_ANCHORS};
use harmloccore::processing::FilterCompensator;
use harmloccore::tag_interface::{Tag, TagValue};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::sync::Arc;

/// Describes the synthetic tag and interrogation signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    /// Tag position at cycle 0, in meters.
    pub tag_position: [f64; 3],
    /// Tag displacement per cycle, in meters.
    pub drift: [f64; 3],
    pub prf: f64,
    /// Half-width of the uniform noise added to each phasor component.
    pub noise: f64,
    pub seed: u64,
    pub cycles: usize,
    pub interval_ms: u64,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            tag_position: [2.0, 1.5, 1.0],
            drift: [0.0; 3],
            prf: 1e6,
            noise: 0.0,
            seed: 0,
            cycles: 1,
            interval_ms: 500,
        }
    }
}

impl ScenarioConfig {
    pub fn position_at(&self, cycle: usize) -> [f64; 3] {
        let t = cycle as f64;
        [
            self.tag_position[0] + self.drift[0] * t,
            self.tag_position[1] + self.drift[1] * t,
            self.tag_position[2] + self.drift[2] * t,
        ]
    }
}

/// Plays the streaming framework: turns a tag position into tagged deliveries.
///
/// Phasors follow the receive-chain model the localizer compensates:
/// reference × propagation delay × comb² × low-pass × high-pass × step-time ramp.
pub struct SyntheticSource {
    config: LocalizerConfig,
    scenario: ScenarioConfig,
    profile: Arc<CalibrationProfile>,
    harmonic_freqs: Vec<f64>,
    harmonic_abs_freqs: Vec<f64>,
    chain: Vec<Phasor>,
    rng: StdRng,
    cycle: usize,
}

impl SyntheticSource {
    pub fn new(
        config: LocalizerConfig,
        scenario: ScenarioConfig,
        profile: Arc<CalibrationProfile>,
    ) -> Self {
        let layout = &config.layout;
        let per_anchor = layout.steps * layout.harmonics_per_step;
        let spacing = 2.0 * scenario.prf;
        let centre = (layout.harmonics_per_step as f64 - 1.0) / 2.0;

        // Baseband frequency of each harmonic relative to its step's LO.
        let harmonic_freqs: Vec<f64> = (0..per_anchor)
            .map(|idx| ((idx % layout.harmonics_per_step) as f64 - centre) * spacing)
            .collect();
        let harmonic_abs_freqs: Vec<f64> = (0..per_anchor)
            .map(|idx| {
                let step = idx / layout.harmonics_per_step;
                let harmonic = idx % layout.harmonics_per_step;
                (step * layout.band_len() + harmonic) as f64 * spacing
            })
            .collect();

        let compensator = FilterCompensator::new(config.filters.clone(), config.timing.clone());
        let comb = compensator.comb_response(&harmonic_freqs);
        let low = compensator.low_pass_response(&harmonic_freqs);
        let high = compensator.high_pass_response(&harmonic_freqs);
        let delays = profile.step_delays();
        let chain = (0..layout.phasor_count())
            .map(|idx| {
                let fi = idx % per_anchor;
                let rotation = compensator
                    .step_time_rotation(harmonic_freqs[fi], delays[idx])
                    .conj();
                comb[fi] * comb[fi] * low[fi] * high[fi] * rotation
            })
            .collect();

        let rng = StdRng::seed_from_u64(scenario.seed);
        Self {
            config,
            scenario,
            profile,
            harmonic_freqs,
            harmonic_abs_freqs,
            chain,
            rng,
            cycle: 0,
        }
    }

    pub fn cycle(&self) -> usize {
        self.cycle
    }

    /// Phasors observed for a tag at `position`.
    pub fn phasors_for(&mut self, position: [f64; 3]) -> Vec<Phasor> {
        let layout = &self.config.layout;
        let base = layout.base_len();
        let spacing = 2.0 * self.scenario.prf;
        let reference = self.profile.reference();

        let mut phasors = Vec::with_capacity(layout.phasor_count());
        for anchor in 0..NUM_ANCHORS {
            let tau = self.config.anchors.distance_to(anchor, position)
                / self.config.propagation_speed;
            for step in 0..layout.steps {
                for harmonic in 0..layout.harmonics_per_step {
                    // Overlapping edge harmonics reuse the nearest in-band bin.
                    let k = harmonic.clamp(layout.band_start, layout.band_end) - layout.band_start;
                    let m = step * layout.band_len() + k;
                    let signed = if m < base / 2 {
                        m as f64
                    } else {
                        m as f64 - base as f64
                    };
                    let delay = Phasor::new(0.0, -2.0 * PI * signed * spacing * tau).exp();
                    phasors.push(reference[m] * delay * self.chain[phasors.len()]);
                }
            }
        }

        if self.scenario.noise > 0.0 {
            let noise = self.scenario.noise;
            for phasor in phasors.iter_mut() {
                *phasor += Phasor::new(
                    self.rng.gen_range(-noise..noise),
                    self.rng.gen_range(-noise..noise),
                );
            }
        }
        phasors
    }

    /// Tags of the next cycle, together with the true tag position.
    pub fn next_deliveries(&mut self) -> (Vec<Tag>, [f64; 3]) {
        let position = self.scenario.position_at(self.cycle);
        let phasors = self.phasors_for(position);
        self.cycle += 1;

        let names = &self.config.channels;
        let tags = vec![
            Tag::new(names.phasors.clone(), TagValue::ComplexVector(phasors)),
            Tag::new(
                names.harmonic_freqs.clone(),
                TagValue::RealVector(self.harmonic_freqs.clone()),
            ),
            Tag::new(
                names.harmonic_abs_freqs.clone(),
                TagValue::RealVector(self.harmonic_abs_freqs.clone()),
            ),
            Tag::new(names.prf.clone(), TagValue::Scalar(self.scenario.prf)),
        ];
        (tags, position)
    }
}
