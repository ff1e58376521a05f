//! Boundary to the external deepfake inference process.
//!
//! The pulse pipelines never call this; it covers the deployment shape their
//! output feeds into: accept a video upload, persist it, run the inference
//! script on it and read back the cropped clip path and prediction score.

pub mod error;

pub use error::InferenceError;

use log::{debug, error, info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::Command;

pub const SUPPORTED_MIME_TYPES: [&str; 4] = ["video/mp4", "video/avi", "video/mov", "video/mkv"];

static CROPPED_PATH_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^.*cropped_mouth_video_path.*:([^:\r\n]*)\r?$").unwrap());

static PREDICTION_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^.*Final Prediction.*:\s*(\S+)[^:\r\n]*\r?$").unwrap());

/// Parsed result of one inference run.
#[derive(Debug, Clone, PartialEq)]
pub struct InferenceOutcome {
    pub cropped_video_path: PathBuf,
    pub score: f64,
}

pub fn validate_mime(content_type: &str) -> Result<(), InferenceError> {
    if SUPPORTED_MIME_TYPES.contains(&content_type) {
        Ok(())
    } else {
        Err(InferenceError::UnsupportedMime(content_type.to_string()))
    }
}

/// Copies an uploaded video into `dir`, keeping only the final file name component.
pub fn store_upload(
    dir: impl AsRef<Path>,
    file_name: &str,
    mut reader: impl Read,
) -> Result<PathBuf, InferenceError> {
    let name = Path::new(file_name)
        .file_name()
        .filter(|n| !n.is_empty())
        .ok_or_else(|| InferenceError::InvalidFileName(file_name.to_string()))?;

    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;
    let path = dir.join(name);
    let mut file = File::create(&path)?;
    let bytes = match io::copy(&mut reader, &mut file) {
        Ok(bytes) => bytes,
        Err(e) => {
            drop(file);
            error!("❌ Upload {:?} failed, removing partial file: {}", path, e);
            if let Err(remove_err) = fs::remove_file(&path) {
                warn!("⚠️ Could not remove partial upload {:?}: {}", path, remove_err);
            }
            return Err(e.into());
        }
    };

    info!("💾 Stored upload {:?} ({} bytes)", path, bytes);
    Ok(path)
}

/// External inference command, invoked as
/// `<program> <args..> --video_path <video> --config_path <config>`.
#[derive(Debug, Clone)]
pub struct InferenceCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub config_path: PathBuf,
}

impl InferenceCommand {
    pub fn new(program: impl Into<PathBuf>, config_path: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            config_path: config_path.into(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn run(&self, video_path: &Path) -> Result<InferenceOutcome, InferenceError> {
        info!("🚀 Running inference on {:?}", video_path);
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg("--video_path")
            .arg(video_path)
            .arg("--config_path")
            .arg(&self.config_path)
            .output()?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        debug!("inference stdout: {}", stdout);

        if !output.status.success() {
            error!("❌ Inference failed with {}: {}", output.status, stderr);
            return Err(InferenceError::ProcessFailed {
                status: output.status.to_string(),
                stderr,
            });
        }

        parse_inference_output(&stdout)
    }
}

/// Reads `cropped_mouth_video_path` and `Final Prediction` from the process output.
///
/// Both values are taken after the last `:` on their line; the score is the
/// first token there. The last matching line wins.
pub fn parse_inference_output(stdout: &str) -> Result<InferenceOutcome, InferenceError> {
    let unparsable = || InferenceError::UnparsableOutput {
        stdout: stdout.to_string(),
    };

    let path = CROPPED_PATH_LINE
        .captures_iter(stdout)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().trim())
        .last()
        .filter(|p| !p.is_empty())
        .ok_or_else(unparsable)?;

    let score = PREDICTION_LINE
        .captures_iter(stdout)
        .filter_map(|c| c.get(1))
        .last()
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .ok_or_else(unparsable)?;

    Ok(InferenceOutcome {
        cropped_video_path: PathBuf::from(path),
        score,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mime_validation() {
        for mime in SUPPORTED_MIME_TYPES {
            assert!(validate_mime(mime).is_ok());
        }
        assert!(matches!(
            validate_mime("image/png"),
            Err(InferenceError::UnsupportedMime(m)) if m == "image/png"
        ));
    }

    struct FailingReader {
        sent: bool,
    }

    impl Read for FailingReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.sent {
                return Err(io::Error::new(io::ErrorKind::ConnectionReset, "upload aborted"));
            }
            self.sent = true;
            buf[..4].copy_from_slice(b"mp4!");
            Ok(4)
        }
    }

    #[test]
    fn test_failed_upload_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = store_upload(dir.path(), "clip.mp4", FailingReader { sent: false }).unwrap_err();

        assert!(matches!(err, InferenceError::Io(ref e) if e.kind() == io::ErrorKind::ConnectionReset));
        assert!(!dir.path().join("clip.mp4").exists());
    }

    #[test]
    fn test_parse_output() {
        let stdout = "loading model\n\
                      cropped_mouth_video_path: /data/out/clip_mouth.mp4\n\
                      frames: 120\n\
                      Final Prediction: 0.8731 (fake)\n";

        let outcome = parse_inference_output(stdout).unwrap();
        assert_eq!(outcome.cropped_video_path, PathBuf::from("/data/out/clip_mouth.mp4"));
        assert!((outcome.score - 0.8731).abs() < 1e-12);
    }

    #[test]
    fn test_parse_uses_last_colon_field() {
        let stdout = "[info] cropped_mouth_video_path: result: mouth.mp4\r\n\
                      [info] Final Prediction: score: 0.12\r\n";
        let outcome = parse_inference_output(stdout).unwrap();
        assert_eq!(outcome.cropped_video_path, PathBuf::from("mouth.mp4"));
        assert!((outcome.score - 0.12).abs() < 1e-12);
    }

    #[test]
    fn test_parse_missing_fields() {
        assert!(matches!(
            parse_inference_output("Final Prediction: 0.5\n"),
            Err(InferenceError::UnparsableOutput { .. })
        ));
        assert!(matches!(
            parse_inference_output("cropped_mouth_video_path: a.mp4\nFinal Prediction: n/a\n"),
            Err(InferenceError::UnparsableOutput { .. })
        ));
    }
}
