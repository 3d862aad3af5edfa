//! Core of the harmonic tag localizer.
//!
//! One dataset per cycle flows through filter compensation, super-resolution
//! ToA extraction and a closed-form TDOA solve; both candidate positions are
//! then reported over a best-effort datagram channel.

pub mod calibration;
pub mod config;
pub mod math;
pub mod prelude;
pub mod processing;
pub mod tag_interface;
pub mod telemetry;
pub mod transport;

pub use prelude::{LocalizerConfig, LocalizerError, LocalizerResult, ProcessingStage, NUM_ANCHORS};
pub use processing::{CycleReport, HarmonicLocalizer};
