//! Butterworth band-pass design and zero-phase filtering.
//!
//! Design path: analog Butterworth prototype → low-pass to band-pass
//! transform → bilinear transform with pre-warped cutoffs, expanded into a
//! `(b, a)` transfer function of order `2 * order`.

use crate::core::pulse::error::{PulseError, Result};
use log::debug;
use nalgebra::{DMatrix, DVector};
use rustfft::num_complex::Complex;
use std::f64::consts::PI;

type C64 = Complex<f64>;

/// A stable Butterworth band-pass never amplifies; anything past this is divergence.
const MAX_GAIN: f64 = 1e6;

/// IIR band-pass filter in transfer-function form, `a[0] == 1`.
#[derive(Debug, Clone)]
pub struct BandPass {
    b: Vec<f64>,
    a: Vec<f64>,
}

impl BandPass {
    /// Digital Butterworth band-pass with cutoffs in Hz, normalised by Nyquist (`fs / 2`).
    pub fn butterworth(order: usize, low_hz: f64, high_hz: f64, fs: f64) -> Result<Self> {
        if order == 0 {
            return Err(PulseError::config("filter_order", "order must be positive"));
        }
        if !(fs.is_finite() && fs > 0.0) {
            return Err(PulseError::input(
                "band-pass design",
                format!("frame rate must be positive, got {fs}"),
            ));
        }
        if !(low_hz < high_hz) {
            return Err(PulseError::config(
                "cutoff",
                format!("low cutoff {low_hz} Hz must be below high cutoff {high_hz} Hz"),
            ));
        }

        let nyquist = 0.5 * fs;
        let low = low_hz / nyquist;
        let high = high_hz / nyquist;
        if !(low > 0.0 && high < 1.0) {
            return Err(PulseError::config(
                "cutoff",
                format!(
                    "cutoffs {low_hz}-{high_hz} Hz must lie strictly inside (0, {nyquist}) Hz at {fs} fps"
                ),
            ));
        }

        let (b, a) = design_bandpass(order, low, high);
        if b.iter().chain(&a).any(|c| !c.is_finite()) {
            return Err(PulseError::numeric(
                "band-pass design",
                format!("non-finite coefficients for {low_hz}-{high_hz} Hz at {fs} fps"),
            ));
        }
        if !is_stable(&a) {
            return Err(PulseError::numeric(
                "band-pass design",
                format!(
                    "order {order} design for {low_hz}-{high_hz} Hz at {fs} fps has a pole on or outside the unit circle"
                ),
            ));
        }

        debug!(
            "Butterworth band-pass: order {}, {:.3}-{:.3} (normalised), {} taps",
            order,
            low,
            high,
            b.len()
        );
        Ok(Self { b, a })
    }

    pub fn numerator(&self) -> &[f64] {
        &self.b
    }

    pub fn denominator(&self) -> &[f64] {
        &self.a
    }

    /// Edge padding used by [`BandPass::filtfilt`].
    pub fn pad_len(&self) -> usize {
        3 * self.a.len().max(self.b.len())
    }

    /// Single causal pass (direct form II transposed), zero initial state.
    pub fn filter(&self, x: &[f64]) -> Vec<f64> {
        let state = vec![0.0; self.a.len() - 1];
        self.filter_with_state(x, state)
    }

    /// Forward-backward filtering: zero phase, squared magnitude response.
    ///
    /// Both ends are extended by an odd reflection of [`BandPass::pad_len`]
    /// samples and each pass starts from the steady-state response to its
    /// first sample.
    pub fn filtfilt(&self, x: &[f64]) -> Result<Vec<f64>> {
        let pad = self.pad_len();
        if x.len() <= pad {
            return Err(PulseError::input(
                "band-pass filtering",
                format!(
                    "series of {} samples must be longer than the {} sample edge padding",
                    x.len(),
                    pad
                ),
            ));
        }

        let zi = self.steady_state()?;
        let extended = odd_extend(x, pad);

        let forward_state = zi.iter().map(|z| z * extended[0]).collect();
        let mut y = self.filter_with_state(&extended, forward_state);
        y.reverse();

        let backward_state = zi.iter().map(|z| z * y[0]).collect();
        let mut y = self.filter_with_state(&y, backward_state);
        y.reverse();

        let out = y[pad..y.len() - pad].to_vec();
        if out.iter().any(|v| !v.is_finite()) {
            return Err(PulseError::numeric(
                "band-pass filtering",
                "filter output is not finite (ill-conditioned coefficients)",
            ));
        }
        let input_peak = peak(&extended);
        let output_peak = peak(&out);
        if output_peak > MAX_GAIN * input_peak {
            return Err(PulseError::numeric(
                "band-pass filtering",
                format!("output peak {output_peak:e} diverged from input peak {input_peak:e}"),
            ));
        }
        Ok(out)
    }

    fn filter_with_state(&self, x: &[f64], mut z: Vec<f64>) -> Vec<f64> {
        let n = z.len();
        let mut y = Vec::with_capacity(x.len());
        for &xv in x {
            let yv = self.b[0] * xv + z[0];
            for i in 0..n - 1 {
                z[i] = self.b[i + 1] * xv + z[i + 1] - self.a[i + 1] * yv;
            }
            z[n - 1] = self.b[n] * xv - self.a[n] * yv;
            y.push(yv);
        }
        y
    }

    /// Initial state for a unit step: solves `(I - Aᵀ) zi = b[1..] - a[1..] * b[0]`.
    fn steady_state(&self) -> Result<Vec<f64>> {
        let n = self.a.len() - 1;
        let system = DMatrix::from_fn(n, n, |i, j| {
            let identity = if i == j { 1.0 } else { 0.0 };
            let first_column = if j == 0 { self.a[i + 1] } else { 0.0 };
            let shift = if j == i + 1 { 1.0 } else { 0.0 };
            identity + first_column - shift
        });
        let rhs = DVector::from_fn(n, |i, _| self.b[i + 1] - self.a[i + 1] * self.b[0]);

        system
            .lu()
            .solve(&rhs)
            .map(|zi| zi.iter().copied().collect())
            .ok_or_else(|| {
                PulseError::numeric("band-pass filtering", "singular system for initial filter state")
            })
    }
}

/// Schur-Cohn step-down on the denominator: every reflection coefficient
/// must satisfy `|k| < 1`, i.e. all poles lie strictly inside the unit circle.
fn is_stable(a: &[f64]) -> bool {
    let Some(&lead) = a.first() else {
        return false;
    };
    let mut poly: Vec<f64> = a.iter().map(|c| c / lead).collect();
    while poly.len() > 1 {
        let n = poly.len() - 1;
        let k = poly[n];
        if !(k.abs() < 1.0) {
            return false;
        }
        let scale = 1.0 - k * k;
        poly = (0..n).map(|i| (poly[i] - k * poly[n - i]) / scale).collect();
    }
    true
}

fn peak(x: &[f64]) -> f64 {
    x.iter().fold(0.0, |m, v| m.max(v.abs()))
}

/// `[2x₀ - x[pad..1], x, 2x_last - x[last-1..last-pad]]`
fn odd_extend(x: &[f64], pad: usize) -> Vec<f64> {
    let first = x[0];
    let last = x[x.len() - 1];
    let mut out = Vec::with_capacity(x.len() + 2 * pad);
    out.extend((1..=pad).rev().map(|i| 2.0 * first - x[i]));
    out.extend_from_slice(x);
    out.extend((1..=pad).map(|i| 2.0 * last - x[x.len() - 1 - i]));
    out
}

fn design_bandpass(order: usize, low: f64, high: f64) -> (Vec<f64>, Vec<f64>) {
    // analog prototype poles, unit cutoff
    let prototype: Vec<C64> = (0..order)
        .map(|k| {
            let m = 2.0 * k as f64 - order as f64 + 1.0;
            -C64::new(0.0, PI * m / (2.0 * order as f64)).exp()
        })
        .collect();

    // bilinear transform runs at fs = 2, pre-warp the edges accordingly
    let fs = 2.0;
    let warped_low = 2.0 * fs * (PI * low / fs).tan();
    let warped_high = 2.0 * fs * (PI * high / fs).tan();
    let bandwidth = warped_high - warped_low;
    let center = (warped_low * warped_high).sqrt();

    let mut poles = Vec::with_capacity(2 * order);
    for &p in &prototype {
        let scaled = p * (bandwidth / 2.0);
        let offset = (scaled * scaled - C64::new(center * center, 0.0)).sqrt();
        poles.push(scaled + offset);
    }
    for &p in &prototype {
        let scaled = p * (bandwidth / 2.0);
        let offset = (scaled * scaled - C64::new(center * center, 0.0)).sqrt();
        poles.push(scaled - offset);
    }
    // band-pass leaves `order` zeros at s = 0
    let gain = bandwidth.powi(order as i32);

    let fs2 = C64::new(2.0 * fs, 0.0);
    let digital_poles: Vec<C64> = poles.iter().map(|&p| (fs2 + p) / (fs2 - p)).collect();
    // s = 0 maps to z = 1, the `order` zeros at infinity map to z = -1
    let mut digital_zeros = vec![C64::new(1.0, 0.0); order];
    digital_zeros.extend(std::iter::repeat(C64::new(-1.0, 0.0)).take(order));

    let zero_product = fs2.powu(order as u32);
    let pole_product = poles.iter().fold(C64::new(1.0, 0.0), |acc, &p| acc * (fs2 - p));
    let digital_gain = gain * (zero_product / pole_product).re;

    let b = poly(&digital_zeros)
        .into_iter()
        .map(|c| digital_gain * c.re)
        .collect();
    let a = poly(&digital_poles).into_iter().map(|c| c.re).collect();
    (b, a)
}

/// Monic polynomial coefficients (highest power first) with the given roots.
fn poly(roots: &[C64]) -> Vec<C64> {
    let mut coeffs = vec![C64::new(1.0, 0.0)];
    for &root in roots {
        let mut next = vec![C64::new(0.0, 0.0); coeffs.len() + 1];
        for (i, &c) in coeffs.iter().enumerate() {
            next[i] += c;
            next[i + 1] -= c * root;
        }
        coeffs = next;
    }
    coeffs
}
