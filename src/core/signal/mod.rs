//! Numeric building blocks shared by both pulse pipelines.

pub mod filter;
pub mod spectrum;
pub mod ssa;
pub mod window;

pub use filter::BandPass;
pub use spectrum::{dominant_frequency, magnitude_spectrum};
pub use ssa::{decompose, diagonal_average, hankel};
pub use window::{hann_overlap_add, hann_window, window_starts};

/// Population standard deviation (`ddof = 0`).
pub fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt()
}
