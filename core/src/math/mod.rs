pub mod fft;
pub mod polynomial;
pub mod stats;
pub mod window;

pub use fft::FftHelper;
pub use polynomial::{freqs, freqz, polyval};
pub use stats::StatsHelper;
pub use window::{fftshift, hamming, super_resolution_window};
