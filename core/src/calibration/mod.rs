pub mod profile;

pub use profile::{step_time_delays, CalibrationProfile};
