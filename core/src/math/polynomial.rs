use num_complex::Complex64;

/// Evaluates a polynomial with real coefficients (highest degree first) at `x` using Horner's method.
pub fn polyval(coeffs: &[f64], x: Complex64) -> Complex64 {
    coeffs
        .iter()
        .fold(Complex64::new(0.0, 0.0), |acc, &c| acc * x + c)
}

/// Digital frequency response `polyval(b, e^{iw}) / polyval(a, e^{iw})` at each normalized frequency.
pub fn freqz(b: &[f64], a: &[f64], w: &[f64]) -> Vec<Complex64> {
    w.iter()
        .map(|&omega| {
            let z = Complex64::new(0.0, omega).exp();
            polyval(b, z) / polyval(a, z)
        })
        .collect()
}

/// Analog frequency response `polyval(b, iw) / polyval(a, iw)` at each angular frequency.
pub fn freqs(b: &[f64], a: &[f64], w: &[f64]) -> Vec<Complex64> {
    w.iter()
        .map(|&omega| {
            let s = Complex64::new(0.0, omega);
            polyval(b, s) / polyval(a, s)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Complex64, b: Complex64) -> bool {
        (a - b).norm() < 1e-9 * (1.0 + b.norm())
    }

    #[test]
    fn polyval_uses_highest_degree_first() {
        // 2x^2 + 3x + 4 at x = 2
        let value = polyval(&[2.0, 3.0, 4.0], Complex64::new(2.0, 0.0));
        assert!(close(value, Complex64::new(18.0, 0.0)));
    }

    #[test]
    fn polyval_of_empty_coefficients_is_zero() {
        assert_eq!(polyval(&[], Complex64::new(3.0, 1.0)), Complex64::new(0.0, 0.0));
    }

    #[test]
    fn polyval_handles_complex_argument() {
        // x^2 + 1 at x = i
        let value = polyval(&[1.0, 0.0, 1.0], Complex64::new(0.0, 1.0));
        assert!(close(value, Complex64::new(0.0, 0.0)));
    }

    #[test]
    fn freqs_of_first_order_low_pass_matches_closed_form() {
        let cutoff = 1e3;
        let w = [0.0, cutoff, 10.0 * cutoff];
        let response = freqs(&[cutoff], &[1.0, cutoff], &w);
        for (omega, h) in w.iter().zip(&response) {
            let expected = Complex64::new(cutoff, 0.0) / Complex64::new(cutoff, *omega);
            assert!(close(*h, expected));
        }
        assert!((response[1].norm() - std::f64::consts::FRAC_1_SQRT_2).abs() < 1e-12);
    }

    #[test]
    fn freqz_evaluates_on_unit_circle() {
        // 1 / (z + 0.5) at w = 0 and w = pi
        let response = freqz(&[1.0], &[1.0, 0.5], &[0.0, std::f64::consts::PI]);
        assert!(close(response[0], Complex64::new(1.0 / 1.5, 0.0)));
        assert!(close(response[1], Complex64::new(1.0 / -0.5, 0.0)));
    }
}
