use crate::core::pulse::error::{PulseError, Result};
use rustfft::{num_complex::Complex, FftPlanner};

/// Frequency of the strongest Fourier component of `series`.
///
/// Only the non-negative half of the spectrum (bins `0..=L/2`, spacing
/// `sampling_rate / L`) is searched, so the result is never negative. Ties
/// resolve to the lowest frequency.
pub fn dominant_frequency(series: &[f64], sampling_rate: f64) -> Result<f64> {
    if series.is_empty() {
        return Err(PulseError::input("dominant frequency", "empty series"));
    }
    if !(sampling_rate.is_finite() && sampling_rate > 0.0) {
        return Err(PulseError::input(
            "dominant frequency",
            format!("sampling rate must be positive, got {sampling_rate}"),
        ));
    }

    let magnitudes = magnitude_spectrum(series);
    let mut best_bin = 0;
    let mut best_magnitude = f64::NEG_INFINITY;
    for (bin, &magnitude) in magnitudes.iter().enumerate().take(series.len() / 2 + 1) {
        if magnitude.is_nan() {
            return Err(PulseError::numeric(
                "dominant frequency",
                "spectrum contains NaN",
            ));
        }
        if magnitude > best_magnitude {
            best_magnitude = magnitude;
            best_bin = bin;
        }
    }

    Ok(best_bin as f64 * sampling_rate / series.len() as f64)
}

/// `|X[k]|` for every DFT bin of a real series.
pub fn magnitude_spectrum(series: &[f64]) -> Vec<f64> {
    let mut planner = FftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(series.len());

    let mut buffer: Vec<Complex<f64>> = series.iter().map(|&v| Complex::new(v, 0.0)).collect();
    fft.process(&mut buffer);
    buffer.iter().map(|c| c.norm()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn sine(freq: f64, fs: f64, len: usize) -> Vec<f64> {
        (0..len)
            .map(|n| (2.0 * PI * freq * n as f64 / fs).sin())
            .collect()
    }

    #[test]
    fn test_pure_sine_within_one_bin() {
        for (freq, fs, len) in [(1.2, 30.0, 900), (2.37, 30.0, 301), (0.9, 25.0, 250), (7.5, 60.0, 128)] {
            let found = dominant_frequency(&sine(freq, fs, len), fs).unwrap();
            let bin_width = fs / len as f64;
            assert!(
                (found - freq).abs() <= bin_width,
                "expected {freq}, found {found} (bin {bin_width})"
            );
        }
    }

    #[test]
    fn test_never_negative() {
        let series = sine(4.0, 10.0, 20);
        assert!(dominant_frequency(&series, 10.0).unwrap() >= 0.0);
    }

    #[test]
    fn test_constant_series_is_dc() {
        assert_eq!(dominant_frequency(&[3.0; 16], 30.0).unwrap(), 0.0);
    }

    #[test]
    fn test_rejects_empty_and_bad_rate() {
        assert!(dominant_frequency(&[], 30.0).unwrap_err().is_input());
        assert!(dominant_frequency(&[1.0, 2.0], 0.0).unwrap_err().is_input());
    }

    #[test]
    fn test_magnitude_spectrum_of_impulse_is_flat() {
        let mut impulse = vec![0.0; 8];
        impulse[0] = 1.0;
        assert!(magnitude_spectrum(&impulse).iter().all(|m| (m - 1.0).abs() < 1e-12));
    }
}
