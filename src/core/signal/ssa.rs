//! Singular Spectrum Analysis: Hankel embedding, SVD and diagonal averaging.

use crate::core::pulse::error::{PulseError, Result};
use log::debug;
use nalgebra::DMatrix;

const SVD_MAX_ITERATIONS: usize = 10_000;

/// Mean of every anti-diagonal (`r + c == k`), `R + C - 1` values.
///
/// ```text
/// a11 a12 a13    a11
/// a21 a22 a23    (a21 + a12) / 2
/// a31 a32 a33    (a31 + a22 + a13) / 3
///                (a32 + a23) / 2
///                a33
/// ```
pub fn diagonal_average(matrix: &DMatrix<f64>) -> Vec<f64> {
    let (rows, cols) = matrix.shape();
    if rows == 0 || cols == 0 {
        return Vec::new();
    }

    let mut sums = vec![0.0; rows + cols - 1];
    let mut counts = vec![0usize; rows + cols - 1];
    for c in 0..cols {
        for r in 0..rows {
            sums[r + c] += matrix[(r, c)];
            counts[r + c] += 1;
        }
    }
    sums.iter()
        .zip(&counts)
        .map(|(&sum, &count)| sum / count as f64)
        .collect()
}

/// Trajectory matrix of shape `[window_size, N - window_size + 1]`, `Y[i][j] = x[i + j]`.
pub fn hankel(trace: &[f64], window_size: usize) -> Result<DMatrix<f64>> {
    if window_size == 0 {
        return Err(PulseError::config("ssa_window", "window size must be positive"));
    }
    if trace.len() < window_size {
        return Err(PulseError::input(
            "SSA embedding",
            format!(
                "trace has {} samples, window needs {}",
                trace.len(),
                window_size
            ),
        ));
    }

    let k = trace.len() - window_size + 1;
    Ok(DMatrix::from_fn(window_size, k, |i, j| trace[i + j]))
}

/// Reconstructed components of `trace`, strongest singular value first.
///
/// Each component has the trace's length; at most `max_components` are kept.
pub fn decompose(trace: &[f64], window_size: usize, max_components: usize) -> Result<Vec<Vec<f64>>> {
    if max_components == 0 {
        return Err(PulseError::config("max_components", "must keep at least one component"));
    }
    let trajectory = hankel(trace, window_size)?;
    let (rows, cols) = trajectory.shape();

    let svd = trajectory
        .try_svd(true, true, f64::EPSILON, SVD_MAX_ITERATIONS)
        .ok_or_else(|| {
            PulseError::numeric(
                "SSA decomposition",
                format!("SVD of {rows}x{cols} trajectory matrix did not converge"),
            )
        })?;
    let (Some(u), Some(v_t)) = (svd.u.as_ref(), svd.v_t.as_ref()) else {
        return Err(PulseError::numeric("SSA decomposition", "SVD returned no singular vectors"));
    };

    let sigma = &svd.singular_values;
    if sigma.iter().any(|s| !s.is_finite()) {
        return Err(PulseError::numeric("SSA decomposition", "non-finite singular value"));
    }

    let mut order: Vec<usize> = (0..sigma.len()).collect();
    order.sort_by(|&a, &b| sigma[b].total_cmp(&sigma[a]));
    order.truncate(max_components);

    debug!(
        "SSA: {}x{} trajectory, keeping {} of {} components (σ₁ = {:.4})",
        rows,
        cols,
        order.len(),
        sigma.len(),
        order.first().map(|&i| sigma[i]).unwrap_or(0.0)
    );

    Ok(order
        .into_iter()
        .map(|idx| {
            let elementary = (u.column(idx) * v_t.row(idx)) * sigma[idx];
            diagonal_average(&elementary)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_diagonal_average_square() {
        let m = DMatrix::from_row_slice(3, 3, &[0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]);
        // (0), (1+3)/2, (2+4+6)/3, (5+7)/2, (8)
        assert_eq!(diagonal_average(&m), vec![0.0, 2.0, 4.0, 6.0, 8.0]);
    }

    #[test]
    fn test_diagonal_average_rectangular() {
        let m = DMatrix::from_row_slice(2, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(diagonal_average(&m), vec![1.0, 3.0, 4.0, 6.0]);

        let tall = DMatrix::from_row_slice(3, 1, &[1.0, 2.0, 3.0]);
        assert_eq!(diagonal_average(&tall), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_diagonal_average_inverts_hankel() {
        let trace: Vec<f64> = (0..12).map(|i| (i * i) as f64).collect();
        let y = hankel(&trace, 5).unwrap();
        assert_eq!(y.shape(), (5, 8));
        assert_eq!(diagonal_average(&y), trace);
    }

    #[test]
    fn test_hankel_window_longer_than_trace() {
        assert!(hankel(&[1.0, 2.0], 3).unwrap_err().is_input());
        assert!(hankel(&[1.0, 2.0], 0).unwrap_err().is_config());
    }

    #[test]
    fn test_components_reconstruct_trace() {
        let trace: Vec<f64> = (0..40)
            .map(|n| {
                let t = n as f64 / 30.0;
                (2.0 * PI * 1.3 * t).sin() + 0.3 * (2.0 * PI * 4.1 * t).cos() + 0.05 * n as f64
            })
            .collect();

        let components = decompose(&trace, 6, 10).unwrap();
        assert_eq!(components.len(), 6);

        for i in 0..trace.len() {
            let sum: f64 = components.iter().map(|c| c[i]).sum();
            assert!((sum - trace[i]).abs() < 1e-9, "sample {i}: {sum} vs {}", trace[i]);
        }
    }

    #[test]
    fn test_components_are_capped_and_ordered() {
        let trace: Vec<f64> = (0..200)
            .map(|n| 3.0 * (n as f64 * 0.25).sin() + 0.2 * (n as f64 * 1.1).sin())
            .collect();

        let components = decompose(&trace, 30, 10).unwrap();
        assert_eq!(components.len(), 10);
        assert!(components.iter().all(|c| c.len() == trace.len()));

        let energy = |c: &Vec<f64>| c.iter().map(|v| v * v).sum::<f64>();
        assert!(energy(&components[0]) > energy(&components[9]));
    }
}
