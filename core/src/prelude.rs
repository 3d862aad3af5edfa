use num_complex::Complex64;

pub use crate::config::{
    AnchorGeometry, ChannelNames, DatasetLayout, Destination, FilterModels, LocalizerConfig,
    TimingConfig, TransferFunction,
};

/// Number of anchors observed per dataset. The closed-form solver is written for exactly four.
pub const NUM_ANCHORS: usize = 4;

/// Complex sample type used throughout the pipeline.
pub type Phasor = Complex64;

/// Common error type for the localization pipeline.
#[derive(thiserror::Error, Debug)]
pub enum LocalizerError {
    #[error("calibration error: {0}")]
    Calibration(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("dimension mismatch for {what}: expected {expected}, got {actual}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("invalid dataset: {0}")]
    InvalidDataset(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("transport failure: {0}")]
    Transport(String),
}

impl LocalizerError {
    /// Errors that will repeat on every cycle until the process is reconfigured.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            LocalizerError::Calibration(_)
                | LocalizerError::DimensionMismatch { .. }
                | LocalizerError::InvalidConfig(_)
        )
    }
}

pub type LocalizerResult<T> = Result<T, LocalizerError>;

/// A single processing step of the per-cycle pipeline.
pub trait ProcessingStage {
    type Input<'a>;
    type Output;

    fn name(&self) -> &'static str;
    fn execute(&mut self, input: Self::Input<'_>) -> LocalizerResult<Self::Output>;
}
