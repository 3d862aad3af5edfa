use std::f64::consts::PI;

/// Symmetric Hamming window of `len` points.
pub fn hamming(len: usize) -> Vec<f64> {
    if len <= 1 {
        return vec![1.0; len];
    }
    let denom = (len - 1) as f64;
    (0..len)
        .map(|n| 0.54 - 0.46 * (2.0 * PI * n as f64 / denom).cos())
        .collect()
}

/// Rotates the sequence left by `len / 2` so its centre lands at index 0.
pub fn fftshift<T: Clone>(values: &[T]) -> Vec<T> {
    let mut shifted = values.to_vec();
    shifted.rotate_left(values.len() / 2);
    shifted
}

/// Super-resolution taper: an fftshift-rotated Hamming window.
pub fn super_resolution_window(len: usize) -> Vec<f64> {
    fftshift(&hamming(len))
}
