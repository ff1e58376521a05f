//! C-method: chrominance-based pulse extraction, CHROM (de Haan & Jeanne,
//! IEEE TBME 2013).

use super::config::CMethodConfig;
use super::error::{PulseError, Result};
use super::MIN_SIGNAL_STD;
use crate::core::signal::{hann_window, std_dev, BandPass};
use crate::core::video::FrameSequence;
use log::{debug, info};

/// Sliding-window layout of one CHROM run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChromLayout {
    pub window_len: usize,
    pub num_windows: usize,
}

impl ChromLayout {
    pub fn new(num_frames: usize, window_len: usize) -> Result<Self> {
        let half = window_len / 2;
        if half == 0 || num_frames < window_len {
            return Err(PulseError::input(
                "CHROM windowing",
                format!(
                    "{num_frames} frames cannot fill one {window_len} sample window"
                ),
            ));
        }
        Ok(Self {
            window_len,
            num_windows: (num_frames - half) / half,
        })
    }

    pub fn half(&self) -> usize {
        self.window_len / 2
    }

    /// `(window_len / 2) * (num_windows + 1)`
    pub fn output_len(&self) -> usize {
        self.half() * (self.num_windows + 1)
    }
}

pub fn compute_signal(frames: &FrameSequence, config: &CMethodConfig) -> Result<Vec<f64>> {
    config.validate()?;
    let fps = frames.fps();
    info!("💓 C-method: {} frames @ {} fps", frames.len(), fps);

    let rgb = frames.mean_rgb_trace();
    let filter = BandPass::butterworth(config.filter_order, config.low_cut_hz, config.high_cut_hz, fps)?;
    let layout = ChromLayout::new(rgb.len(), config.window_len(fps))?;
    debug!(
        "C-method: window {} samples, {} windows",
        layout.window_len, layout.num_windows
    );

    let pulse = chrom(&rgb, &filter, layout)?;
    info!("✓ C-method: pulse signal of {} samples", pulse.len());
    Ok(pulse)
}

/// Runs the CHROM windows over a mean-RGB trace and overlap-adds them.
pub fn chrom(rgb: &[[f64; 3]], filter: &BandPass, layout: ChromLayout) -> Result<Vec<f64>> {
    let half = layout.half();
    let hann = hann_window(layout.window_len);
    let mut signal = vec![0.0; layout.output_len()];

    for k in 0..layout.num_windows {
        let start = k * half;
        let mid = start + half;
        let end = start + layout.window_len;

        let window = chrom_window(&rgb[start..end], filter)?;
        for (i, (s, taper)) in window.iter().zip(&hann).enumerate() {
            let idx = start + i;
            if idx < mid {
                signal[idx] += s * taper;
            } else {
                signal[idx] = s * taper;
            }
        }
    }
    Ok(signal)
}

/// One CHROM window, before tapering: `Xf - alpha * Yf`.
pub fn chrom_window(rgb: &[[f64; 3]], filter: &BandPass) -> Result<Vec<f64>> {
    let n = rgb.len() as f64;
    let mut base = [0.0; 3];
    for px in rgb {
        for c in 0..3 {
            base[c] += px[c] / n;
        }
    }
    if base.iter().any(|&b| !(b.is_finite() && b > 0.0)) {
        return Err(PulseError::numeric(
            "CHROM normalisation",
            format!("window channel means {base:?} cannot normalise the trace"),
        ));
    }

    let (xs, ys): (Vec<f64>, Vec<f64>) = rgb
        .iter()
        .map(|px| {
            let r = px[0] / base[0];
            let g = px[1] / base[1];
            let b = px[2] / base[2];
            (3.0 * r - 2.0 * g, 1.5 * r + g - 1.5 * b)
        })
        .unzip();

    let xf = filter.filtfilt(&xs)?;
    let yf = filter.filtfilt(&ys)?;

    let y_std = std_dev(&yf);
    if y_std < MIN_SIGNAL_STD {
        return Err(PulseError::numeric(
            "CHROM alpha",
            format!("std of filtered Ys is {y_std:e}, alpha is undefined"),
        ));
    }
    let alpha = std_dev(&xf) / y_std;

    Ok(xf.iter().zip(&yf).map(|(x, y)| x - alpha * y).collect())
}
