pub mod compensation;
pub mod pipeline;
pub mod report;
pub mod tdoa;
pub mod toa;

pub use compensation::{CompensationInput, FilterCompensator};
pub use pipeline::{CycleReport, HarmonicLocalizer};
pub use report::Reporter;
pub use tdoa::{Position, PositionSolution, RangeDifferences, TdoaSolver};
pub use toa::{ImpulseResponse, ToaExtractor, ToaInput, ToaVector};
