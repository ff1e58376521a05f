//! rPPG pulse extraction
//!
//! Two independent pipelines over the same ROI frame sequence:
//! 1. G-method - green trace → band-pass → SSA → harmonic RC selection → spectral masking
//! 2. C-method - mean RGB → CHROM chrominance windows → Hann overlap-add

pub mod c_method;
pub mod config;
pub mod error;
pub mod g_method;

pub use config::{CMethodConfig, GMethodConfig, PulseConfig};
pub use error::PulseError;

use crate::core::video::FrameSequence;
use self::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Below this standard deviation a filtered trace is treated as constant.
pub(crate) const MIN_SIGNAL_STD: f64 = 1e-10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PulseMethod {
    /// Green-channel SSA.
    Green,
    /// Chrominance (CHROM).
    Chrom,
}

impl PulseMethod {
    pub fn compute(self, frames: &FrameSequence, config: &PulseConfig) -> Result<Vec<f64>> {
        match self {
            Self::Green => g_method::compute_signal(frames, &config.g_method),
            Self::Chrom => c_method::compute_signal(frames, &config.c_method),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Green => "green",
            Self::Chrom => "chrom",
        }
    }
}

impl fmt::Display for PulseMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PulseMethod {
    type Err = PulseError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "g" | "green" | "ssa" => Ok(Self::Green),
            "c" | "chrom" => Ok(Self::Chrom),
            other => Err(PulseError::config(
                "method",
                format!("unknown pulse method `{other}`"),
            )),
        }
    }
}
