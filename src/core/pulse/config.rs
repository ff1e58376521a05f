use super::error::{PulseError, Result};
use log::info;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Green-channel SSA pipeline parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GMethodConfig {
    pub low_cut_hz: f64,
    pub high_cut_hz: f64,
    pub filter_order: usize,
    /// Hankel embedding rows, in samples.
    pub ssa_window: usize,
    pub max_components: usize,
    /// Absolute tolerance of the `f ≈ 2f'` harmonic test, on top of a `1e-5` relative slack.
    pub harmonic_tolerance_hz: f64,
    pub overlap_window: usize,
    pub overlap_step: usize,
    pub hr_window_secs: f64,
    pub hr_step_secs: f64,
}

impl Default for GMethodConfig {
    fn default() -> Self {
        Self {
            low_cut_hz: 0.8,
            high_cut_hz: 5.0,
            filter_order: 4,
            ssa_window: 120,
            max_components: 10,
            harmonic_tolerance_hz: 0.2,
            overlap_window: 120,
            overlap_step: 30,
            hr_window_secs: 10.0,
            hr_step_secs: 1.0,
        }
    }
}

impl GMethodConfig {
    /// Clips of a few seconds: the heart-rate reference uses 4 s windows.
    pub fn for_short_clips() -> Self {
        Self {
            hr_window_secs: 4.0,
            hr_step_secs: 0.5,
            ..Self::default()
        }
    }

    /// Smallest trace every stage can work with.
    pub fn min_samples(&self, fps: f64) -> usize {
        let hr_window = (self.hr_window_secs * fps).round() as usize;
        self.ssa_window.max(self.overlap_window).max(hr_window)
    }

    pub fn validate(&self) -> Result<()> {
        check_cutoffs(self.low_cut_hz, self.high_cut_hz)?;
        check_positive("filter_order", self.filter_order)?;
        check_positive("ssa_window", self.ssa_window)?;
        check_positive("max_components", self.max_components)?;
        check_positive("overlap_window", self.overlap_window)?;
        check_positive("overlap_step", self.overlap_step)?;
        if !(self.harmonic_tolerance_hz.is_finite() && self.harmonic_tolerance_hz >= 0.0) {
            return Err(PulseError::config(
                "harmonic_tolerance_hz",
                format!("must be a non-negative number, got {}", self.harmonic_tolerance_hz),
            ));
        }
        check_seconds("hr_window_secs", self.hr_window_secs)?;
        check_seconds("hr_step_secs", self.hr_step_secs)?;
        Ok(())
    }
}

/// Chrominance (CHROM) pipeline parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CMethodConfig {
    pub low_cut_hz: f64,
    pub high_cut_hz: f64,
    pub filter_order: usize,
    pub window_secs: f64,
}

impl Default for CMethodConfig {
    fn default() -> Self {
        Self {
            low_cut_hz: 0.7,
            high_cut_hz: 2.5,
            filter_order: 3,
            window_secs: 1.6,
        }
    }
}

impl CMethodConfig {
    /// Window length in samples: `ceil(window_secs * fps)`, rounded up to even.
    pub fn window_len(&self, fps: f64) -> usize {
        let len = (self.window_secs * fps).ceil() as usize;
        if len % 2 == 1 {
            len + 1
        } else {
            len
        }
    }

    pub fn validate(&self) -> Result<()> {
        check_cutoffs(self.low_cut_hz, self.high_cut_hz)?;
        check_positive("filter_order", self.filter_order)?;
        check_seconds("window_secs", self.window_secs)?;
        Ok(())
    }
}

/// Both pipelines' parameters, passed explicitly to every call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PulseConfig {
    pub g_method: GMethodConfig,
    pub c_method: CMethodConfig,
}

impl PulseConfig {
    pub fn for_short_clips() -> Self {
        Self {
            g_method: GMethodConfig::for_short_clips(),
            c_method: CMethodConfig::default(),
        }
    }

    /// Parses a JSON5 document; missing fields keep their defaults.
    pub fn from_json5_str(source: &str) -> Result<Self> {
        let config: Self = json5::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("📖 Loading pulse config from {:?}", path);
        let source = std::fs::read_to_string(path)?;
        Self::from_json5_str(&source)
    }

    pub fn validate(&self) -> Result<()> {
        self.g_method.validate()?;
        self.c_method.validate()
    }
}

fn check_cutoffs(low: f64, high: f64) -> Result<()> {
    if !(low.is_finite() && high.is_finite() && low > 0.0) {
        return Err(PulseError::config(
            "cutoff",
            format!("cutoffs must be positive and finite, got {low}-{high} Hz"),
        ));
    }
    if low >= high {
        return Err(PulseError::config(
            "cutoff",
            format!("low cutoff {low} Hz must be below high cutoff {high} Hz"),
        ));
    }
    Ok(())
}

fn check_positive(parameter: &'static str, value: usize) -> Result<()> {
    if value == 0 {
        return Err(PulseError::config(parameter, "must be positive"));
    }
    Ok(())
}

fn check_seconds(parameter: &'static str, value: f64) -> Result<()> {
    if !(value.is_finite() && value > 0.0) {
        return Err(PulseError::config(
            parameter,
            format!("must be a positive duration, got {value}"),
        ));
    }
    Ok(())
}
