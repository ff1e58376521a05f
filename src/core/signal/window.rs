use crate::core::pulse::error::{PulseError, Result};
use std::f64::consts::PI;

/// Symmetric Hann taper: `0.5 - 0.5 * cos(2πn / (len - 1))`.
pub fn hann_window(len: usize) -> Vec<f64> {
    match len {
        0 => Vec::new(),
        1 => vec![1.0],
        _ => {
            let denom = (len - 1) as f64;
            (0..len)
                .map(|n| 0.5 - 0.5 * (2.0 * PI * n as f64 / denom).cos())
                .collect()
        }
    }
}

/// Start offsets of every full window; a trailing partial window is dropped.
///
/// `step_size` must be positive; callers validate it with `check_window`.
pub fn window_starts(len: usize, window_size: usize, step_size: usize) -> impl Iterator<Item = usize> {
    let last = if window_size == 0 || window_size > len {
        None
    } else {
        Some(len - window_size)
    };
    debug_assert!(step_size > 0, "window step must be positive");
    last.into_iter().flat_map(move |last| (0..=last).step_by(step_size))
}

pub(crate) fn check_window(
    stage: &'static str,
    window_size: usize,
    step_size: usize,
) -> Result<()> {
    if window_size == 0 {
        return Err(PulseError::config(
            "window_size",
            format!("{stage}: window size must be positive"),
        ));
    }
    if step_size == 0 {
        return Err(PulseError::config(
            "step_size",
            format!("{stage}: step size must be positive"),
        ));
    }
    Ok(())
}

/// Hann-tapers every full window of `series` and sums it back in place.
///
/// Output has the length of `series`; samples no window covers stay zero.
pub fn hann_overlap_add(series: &[f64], window_size: usize, step_size: usize) -> Result<Vec<f64>> {
    check_window("overlap-add", window_size, step_size)?;

    let hann = hann_window(window_size);
    let mut output = vec![0.0; series.len()];
    for start in window_starts(series.len(), window_size, step_size) {
        let segment = &series[start..start + window_size];
        for ((out, &value), &taper) in output[start..start + window_size]
            .iter_mut()
            .zip(segment)
            .zip(&hann)
        {
            *out += value * taper;
        }
    }
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hann_window_shape() {
        let w = hann_window(5);
        let expected = [0.0, 0.5, 1.0, 0.5, 0.0];
        for (a, b) in w.iter().zip(expected) {
            assert!((a - b).abs() < 1e-12);
        }
        assert_eq!(hann_window(1), vec![1.0]);
        assert!(hann_window(0).is_empty());
    }

    #[test]
    fn test_window_starts() {
        assert_eq!(window_starts(10, 4, 3).collect::<Vec<_>>(), vec![0, 3, 6]);
        assert_eq!(window_starts(10, 10, 10).collect::<Vec<_>>(), vec![0]);
        assert_eq!(window_starts(3, 4, 1).count(), 0);
    }

    #[test]
    #[should_panic]
    fn test_window_starts_zero_step_panics() {
        let _ = window_starts(10, 4, 0).count();
    }

    #[test]
    fn test_single_window_is_hann_product() {
        let series: Vec<f64> = (0..16).map(|i| (i as f64 * 0.7).sin() + 2.0).collect();
        let out = hann_overlap_add(&series, series.len(), series.len()).unwrap();
        let hann = hann_window(series.len());

        for i in 0..series.len() {
            assert!((out[i] - series[i] * hann[i]).abs() < 1e-12);
        }
    }

    #[test]
    fn test_overlapping_windows_accumulate() {
        let series = vec![1.0; 7];
        // windows at 0 and 2, hann(5) = [0, .5, 1, .5, 0]
        let out = hann_overlap_add(&series, 5, 2).unwrap();
        let expected = [0.0, 0.5, 1.0, 1.0, 1.0, 0.5, 0.0];
        for (a, b) in out.iter().zip(expected) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn test_trailing_partial_window_dropped() {
        let series = vec![1.0; 6];
        let out = hann_overlap_add(&series, 4, 4).unwrap();
        assert_eq!(out.len(), 6);
        assert_eq!(&out[4..], &[0.0, 0.0]);
    }

    #[test]
    fn test_zero_window_or_step_is_config_error() {
        assert!(hann_overlap_add(&[1.0; 4], 0, 1).unwrap_err().is_config());
        assert!(hann_overlap_add(&[1.0; 4], 2, 0).unwrap_err().is_config());
    }
}
