//! G-method: green-channel SSA pulse extraction with harmonic RC selection
//! and spectral masking (Zhao et al., CVPR Workshops 2018).

use super::config::GMethodConfig;
use super::error::{PulseError, Result};
use super::MIN_SIGNAL_STD;
use crate::core::signal::{
    decompose, dominant_frequency, hann_overlap_add, hann_window, std_dev, window_starts, BandPass,
};
use crate::core::video::FrameSequence;
use log::{debug, info};

/// Outcome of harmonic RC selection.
#[derive(Debug, Clone)]
pub struct ComponentSelection {
    /// Dominant frequency of every input component, in input order.
    pub frequencies: Vec<f64>,
    /// Indices of the components that take part in a `2×` relationship.
    pub selected: Vec<usize>,
    /// Element-wise sum of the selected components.
    pub trace: Vec<f64>,
}

pub fn compute_signal(frames: &FrameSequence, config: &GMethodConfig) -> Result<Vec<f64>> {
    config.validate()?;
    let fps = frames.fps();
    info!("💓 G-method: {} frames @ {} fps", frames.len(), fps);

    let required = config.min_samples(fps);
    if frames.len() < required {
        return Err(PulseError::input(
            "G-method",
            format!("{} frames supplied, at least {} required", frames.len(), required),
        ));
    }

    let raw = frames.green_trace();
    let filtered = bandpass(&raw, fps, config)?;

    let components = decompose(&filtered, config.ssa_window, config.max_components)?;
    let selection = select_components(&components, fps, config.harmonic_tolerance_hz)?;
    debug!(
        "G-method: kept RCs {:?} of {} (frequencies {:?})",
        selection.selected,
        components.len(),
        selection.frequencies
    );

    let preliminary =
        hann_overlap_add(&selection.trace, config.overlap_window, config.overlap_step)?;
    let reference_hz = instantaneous_heart_rate(&preliminary, fps, config)?;
    let half_width = mask_half_width_hz(config.overlap_window, fps, filtered.len());
    debug!(
        "G-method: reference {:.3} Hz, mask ±{:.3} Hz",
        reference_hz, half_width
    );

    let pulse = spectral_mask(
        &components,
        &selection.frequencies,
        reference_hz,
        half_width,
        config.overlap_window,
        config.overlap_step,
    )?;
    info!("✓ G-method: pulse signal of {} samples", pulse.len());
    Ok(pulse)
}

/// Zero-phase Butterworth band-pass of the raw green trace.
pub fn bandpass(trace: &[f64], fps: f64, config: &GMethodConfig) -> Result<Vec<f64>> {
    let filter = BandPass::butterworth(
        config.filter_order,
        config.low_cut_hz,
        config.high_cut_hz,
        fps,
    )?;
    let filtered = filter.filtfilt(trace)?;

    if std_dev(&filtered) < MIN_SIGNAL_STD {
        return Err(PulseError::numeric(
            "G-method band-pass",
            "filtered green trace has no variance",
        ));
    }
    Ok(filtered)
}

/// Keeps every component whose dominant frequency is about twice, or half,
/// that of another component, and sums them.
pub fn select_components(
    components: &[Vec<f64>],
    fps: f64,
    tolerance_hz: f64,
) -> Result<ComponentSelection> {
    if components.len() < 2 {
        return Err(PulseError::input(
            "RC selection",
            format!("{} component(s), harmonic pairing needs at least 2", components.len()),
        ));
    }

    let frequencies = components
        .iter()
        .map(|c| dominant_frequency(c, fps))
        .collect::<Result<Vec<_>>>()?;

    let mut keep = vec![false; components.len()];
    for i in 0..frequencies.len() {
        for j in i + 1..frequencies.len() {
            let (fi, fj) = (frequencies[i], frequencies[j]);
            if is_close(fi, 2.0 * fj, tolerance_hz) || is_close(fj, 2.0 * fi, tolerance_hz) {
                keep[i] = true;
                keep[j] = true;
            }
        }
    }

    let selected: Vec<usize> = (0..keep.len()).filter(|&i| keep[i]).collect();
    if selected.is_empty() {
        return Err(PulseError::input(
            "RC selection",
            format!("no harmonic pair among component frequencies {frequencies:?}"),
        ));
    }

    let mut trace = vec![0.0; components[0].len()];
    for &idx in &selected {
        for (acc, v) in trace.iter_mut().zip(&components[idx]) {
            *acc += v;
        }
    }

    Ok(ComponentSelection {
        frequencies,
        selected,
        trace,
    })
}

/// `|a - b| <= atol + rtol * |b|`, so pairs sitting exactly on the tolerance
/// edge of the FFT bin grid still match.
fn is_close(a: f64, b: f64, atol: f64) -> bool {
    const RTOL: f64 = 1e-5;
    (a - b).abs() <= atol + RTOL * b.abs()
}

/// Mean dominant frequency over sliding windows of the preliminary signal.
pub fn instantaneous_heart_rate(
    preliminary: &[f64],
    fps: f64,
    config: &GMethodConfig,
) -> Result<f64> {
    let window = (config.hr_window_secs * fps).round() as usize;
    let step = ((config.hr_step_secs * fps).round() as usize).max(1);
    if window == 0 {
        return Err(PulseError::config(
            "hr_window_secs",
            format!("{} s is shorter than one frame at {fps} fps", config.hr_window_secs),
        ));
    }

    let freqs = window_starts(preliminary.len(), window, step)
        .map(|start| dominant_frequency(&preliminary[start..start + window], fps))
        .collect::<Result<Vec<_>>>()?;

    if freqs.is_empty() {
        return Err(PulseError::input(
            "instantaneous heart rate",
            format!(
                "signal of {} samples is shorter than one {} sample window",
                preliminary.len(),
                window
            ),
        ));
    }
    Ok(freqs.iter().sum::<f64>() / freqs.len() as f64)
}

/// Half-width of the masking band in Hz: `window_size / 2` bins of the
/// component spectrum, each `fps / trace_len` Hz wide.
pub fn mask_half_width_hz(window_size: usize, fps: f64, trace_len: usize) -> f64 {
    (window_size as f64 / 2.0) * fps / trace_len.max(1) as f64
}

/// Per window, sums the components within `reference_hz ± half_width_hz`,
/// tapers the sum with a Hann window and overlap-adds it.
pub fn spectral_mask(
    components: &[Vec<f64>],
    frequencies: &[f64],
    reference_hz: f64,
    half_width_hz: f64,
    window_size: usize,
    step_size: usize,
) -> Result<Vec<f64>> {
    crate::core::signal::window::check_window("spectral mask", window_size, step_size)?;
    let Some(first) = components.first() else {
        return Err(PulseError::input("spectral mask", "no components to mask"));
    };

    let lower = reference_hz - half_width_hz;
    let upper = reference_hz + half_width_hz;
    let passing: Vec<&Vec<f64>> = components
        .iter()
        .zip(frequencies)
        .filter(|(_, &f)| lower <= f && f <= upper)
        .map(|(c, _)| c)
        .collect();

    let hann = hann_window(window_size);
    let mut pulse = vec![0.0; first.len()];
    for start in window_starts(first.len(), window_size, step_size) {
        let mut sum = vec![0.0; window_size];
        for component in &passing {
            for (acc, v) in sum.iter_mut().zip(&component[start..start + window_size]) {
                *acc += v;
            }
        }
        for (i, (v, taper)) in sum.iter().zip(&hann).enumerate() {
            pulse[start + i] += v * taper;
        }
    }

    if passing.is_empty() || pulse.iter().all(|&v| v == 0.0) {
        return Err(PulseError::input(
            "spectral mask",
            format!(
                "no component within {lower:.3}-{upper:.3} Hz of the {reference_hz:.3} Hz reference"
            ),
        ));
    }
    Ok(pulse)
}
