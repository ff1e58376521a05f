use thiserror::Error;

#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("Unsupported file format `{0}`, expected an mp4/avi/mov/mkv video")]
    UnsupportedMime(String),
    #[error("Invalid upload file name `{0}`")]
    InvalidFileName(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Inference process exited with {status}: {stderr}")]
    ProcessFailed { status: String, stderr: String },
    #[error("Failed to parse inference output")]
    UnparsableOutput { stdout: String },
}
