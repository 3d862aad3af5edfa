use crate::prelude::{
    ChannelNames, DatasetLayout, LocalizerError, LocalizerResult, Phasor,
};
use crate::telemetry::log::LogManager;
use serde::{Deserialize, Serialize};

/// One observation cycle as delivered by the streaming framework.
///
/// `phasors` is ordered anchor-major, then step, then harmonic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HarmonicDataset {
    pub phasors: Vec<Phasor>,
    pub harmonic_freqs: Vec<f64>,
    #[serde(default)]
    pub harmonic_abs_freqs: Vec<f64>,
    pub prf_estimate: f64,
}

impl HarmonicDataset {
    /// Checks the dataset against the configured layout.
    ///
    /// A phasor count that does not match the layout is a configuration defect.
    pub fn validate(&self, layout: &DatasetLayout) -> LocalizerResult<()> {
        let expected = layout.phasor_count();
        if self.phasors.len() != expected {
            return Err(LocalizerError::DimensionMismatch {
                what: "phasor vector",
                expected,
                actual: self.phasors.len(),
            });
        }
        if self.harmonic_freqs.is_empty() {
            return Err(LocalizerError::InvalidDataset(
                "harmonic frequency vector is empty".into(),
            ));
        }
        if !self.prf_estimate.is_finite() || self.prf_estimate <= 0.0 {
            return Err(LocalizerError::InvalidDataset(format!(
                "PRF estimate {} is not a positive rate",
                self.prf_estimate
            )));
        }
        Ok(())
    }
}

/// Payload attached to a tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TagValue {
    ComplexVector(Vec<Phasor>),
    RealVector(Vec<f64>),
    Scalar(f64),
}

impl TagValue {
    fn kind(&self) -> &'static str {
        match self {
            TagValue::ComplexVector(_) => "complex vector",
            TagValue::RealVector(_) => "real vector",
            TagValue::Scalar(_) => "scalar",
        }
    }
}

/// A keyed value delivered alongside the sample stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub key: String,
    pub value: TagValue,
}

impl Tag {
    pub fn new(key: impl Into<String>, value: TagValue) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }
}

/// Retains the most recent value of each of the four input channels.
///
/// Channels not refreshed by a delivery keep their previous value.
#[derive(Debug, Clone, Default)]
pub struct DatasetAssembler {
    names: ChannelNames,
    phasors: Option<Vec<Phasor>>,
    harmonic_freqs: Option<Vec<f64>>,
    harmonic_abs_freqs: Option<Vec<f64>>,
    prf_estimate: Option<f64>,
    logger: LogManager,
}

impl DatasetAssembler {
    pub fn new(names: ChannelNames) -> Self {
        Self {
            names,
            logger: LogManager::new("assembler"),
            ..Default::default()
        }
    }

    /// Applies one tag. Unknown keys are ignored; a known key carrying the wrong kind of value is rejected.
    pub fn apply(&mut self, tag: Tag) -> LocalizerResult<()> {
        let Tag { key, value } = tag;
        let mismatch = |expected: &str, value: &TagValue| {
            LocalizerError::InvalidDataset(format!(
                "tag {:?} expects a {}, got a {}",
                key,
                expected,
                value.kind()
            ))
        };

        if key == self.names.phasors {
            match value {
                TagValue::ComplexVector(values) => self.phasors = Some(values),
                other => return Err(mismatch("complex vector", &other)),
            }
        } else if key == self.names.harmonic_freqs {
            match value {
                TagValue::RealVector(values) => self.harmonic_freqs = Some(values),
                other => return Err(mismatch("real vector", &other)),
            }
        } else if key == self.names.harmonic_abs_freqs {
            match value {
                TagValue::RealVector(values) => self.harmonic_abs_freqs = Some(values),
                other => return Err(mismatch("real vector", &other)),
            }
        } else if key == self.names.prf {
            match value {
                TagValue::Scalar(prf) => self.prf_estimate = Some(prf),
                other => return Err(mismatch("scalar", &other)),
            }
        } else {
            self.logger.trace(&format!("ignoring tag {:?}", key));
        }
        Ok(())
    }

    pub fn apply_all<I: IntoIterator<Item = Tag>>(&mut self, tags: I) -> LocalizerResult<()> {
        tags.into_iter().try_for_each(|tag| self.apply(tag))
    }

    /// Builds a dataset from the latest value of every channel.
    pub fn dataset(&self) -> LocalizerResult<HarmonicDataset> {
        let missing = |name: &str| {
            LocalizerError::InvalidDataset(format!("no value delivered yet for {:?}", name))
        };
        Ok(HarmonicDataset {
            phasors: self
                .phasors
                .clone()
                .ok_or_else(|| missing(&self.names.phasors))?,
            harmonic_freqs: self
                .harmonic_freqs
                .clone()
                .ok_or_else(|| missing(&self.names.harmonic_freqs))?,
            harmonic_abs_freqs: self.harmonic_abs_freqs.clone().unwrap_or_default(),
            prf_estimate: self
                .prf_estimate
                .ok_or_else(|| missing(&self.names.prf))?,
        })
    }
}
