pub mod calibration;
pub mod scenario;
