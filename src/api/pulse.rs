//! Pulse signal extraction facade.

use crate::core::batch::{BatchItem, BatchOutcome, BatchProcessor, BatchStats};
use crate::core::pulse::{PulseConfig, PulseError, PulseMethod};
use crate::core::video::FrameSequence;
use log::info;
use std::path::Path;

/// Pulse extractor - one configured method for single clips and batches.
///
/// ```no_run
/// use pulse_lib::api::pulse::PulseExtractor;
/// use pulse_lib::{FrameSequence, PulseMethod};
///
/// let extractor = PulseExtractor::create(PulseMethod::Chrom)?;
/// let frames = FrameSequence::from_path("roi_frames/", 30.0)?;
/// let signal = extractor.compute_signal(&frames)?;
/// # Ok::<(), pulse_lib::PulseError>(())
/// ```
pub struct PulseExtractor {
    processor: BatchProcessor,
}

impl PulseExtractor {
    /// Default configuration for `method`.
    pub fn create(method: PulseMethod) -> Result<Self, PulseError> {
        Self::with_config(method, PulseConfig::default())
    }

    pub fn with_config(method: PulseMethod, config: PulseConfig) -> Result<Self, PulseError> {
        crate::init_logging();
        info!("🎬 PulseExtractor: created ({})", method);
        Ok(Self {
            processor: BatchProcessor::new(method, config)?,
        })
    }

    /// Config file in JSON5; see [`PulseConfig::load`].
    pub fn from_config_file(method: PulseMethod, path: impl AsRef<Path>) -> Result<Self, PulseError> {
        Self::with_config(method, PulseConfig::load(path)?)
    }

    pub fn method(&self) -> PulseMethod {
        self.processor.method()
    }

    /// Pulse signal of a single clip.
    pub fn compute_signal(&self, frames: &FrameSequence) -> Result<Vec<f64>, PulseError> {
        self.processor.method().compute(frames, self.processor.config())
    }

    /// Parallel batch, see [`BatchProcessor::process_batch`].
    pub fn process_batch(&self, items: &[BatchItem]) -> BatchOutcome {
        self.processor.process_batch(items)
    }

    pub fn stats(&self) -> BatchStats {
        self.processor.get_stats()
    }

    pub fn reset(&self) {
        self.processor.reset()
    }
}

impl Drop for PulseExtractor {
    fn drop(&mut self) {
        info!("🗑️ PulseExtractor: released");
    }
}
