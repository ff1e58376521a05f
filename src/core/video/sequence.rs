//! ROI frame sequences, the sole input of both pulse pipelines.

use super::frame::{Frame, RawFrame};
use crate::core::pulse::error::{PulseError, Result};
use log::{debug, info};
use std::path::{Path, PathBuf};

const IMAGE_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "bmp"];

/// Ordered ROI frames plus the frame rate they were sampled at.
///
/// Every constructor validates the same invariants: at least one frame, a
/// finite positive frame rate and one shared resolution across all frames.
#[derive(Debug, Clone)]
pub struct FrameSequence {
    frames: Vec<Frame>,
    fps: f64,
}

impl FrameSequence {
    pub fn from_frames(frames: Vec<Frame>, fps: f64) -> Result<Self> {
        if !(fps.is_finite() && fps > 0.0) {
            return Err(PulseError::input(
                "frame sequence",
                format!("frame rate must be finite and positive, got {fps}"),
            ));
        }

        let Some(first) = frames.first() else {
            return Err(PulseError::input("frame sequence", "no frames supplied"));
        };
        let (width, height) = (first.width, first.height);

        for frame in &frames {
            if !frame.is_consistent() {
                return Err(PulseError::input(
                    "frame sequence",
                    format!(
                        "frame {} holds {} bytes for {}x{} RGB pixels",
                        frame.frame_number,
                        frame.data.len(),
                        frame.width,
                        frame.height
                    ),
                ));
            }
            if frame.width != width || frame.height != height {
                return Err(PulseError::input(
                    "frame sequence",
                    format!(
                        "frame {} is {}x{}, expected {}x{}",
                        frame.frame_number, frame.width, frame.height, width, height
                    ),
                ));
            }
        }

        debug!("🎞️ FrameSequence: {} frames {}x{} @ {} fps", frames.len(), width, height, fps);
        Ok(Self { frames, fps })
    }

    /// Frames handed over by a native decoder as YUV420 planes.
    pub fn from_raw_frames(raw_frames: &[RawFrame], fps: f64) -> Result<Self> {
        let mut frames = Vec::with_capacity(raw_frames.len());
        for raw in raw_frames {
            if !raw.has_complete_planes() {
                return Err(PulseError::input(
                    "frame sequence",
                    format!("raw frame {} has truncated YUV planes", raw.frame_number),
                ));
            }
            frames.push(raw.to_rgb());
        }
        Self::from_frames(frames, fps)
    }

    /// Loads an ROI frame dump: every png/jpg/bmp file in `dir`, ordered by file name.
    pub fn from_path(dir: impl AsRef<Path>, fps: f64) -> Result<Self> {
        let dir = dir.as_ref();
        info!("📖 Reading ROI frames from {:?}", dir);

        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| is_frame_image(path))
            .collect();
        paths.sort();

        let mut frames = Vec::with_capacity(paths.len());
        for (idx, path) in paths.iter().enumerate() {
            let image = image::open(path)?.to_rgb8();
            frames.push(Frame::from_rgb_image(&image, idx as u64));
        }

        info!("✓ Loaded {} frames from {:?}", frames.len(), dir);
        Self::from_frames(frames, fps)
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn fps(&self) -> f64 {
        self.fps
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn duration_secs(&self) -> f64 {
        self.frames.len() as f64 / self.fps
    }

    /// Per-frame mean of the green channel.
    pub fn green_trace(&self) -> Vec<f64> {
        self.frames.iter().map(|f| f.channel_mean(1)).collect()
    }

    /// Per-frame mean of each RGB channel.
    pub fn mean_rgb_trace(&self) -> Vec<[f64; 3]> {
        self.frames.iter().map(Frame::mean_rgb).collect()
    }
}

fn is_frame_image(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
            .unwrap_or(false)
}
