use thiserror::Error;

#[derive(Debug, Error)]
pub enum PulseError {
    #[error("insufficient data in {stage}: {detail}")]
    Input { stage: &'static str, detail: String },
    #[error("numeric failure in {stage}: {detail}")]
    Numeric { stage: &'static str, detail: String },
    #[error("invalid configuration `{parameter}`: {detail}")]
    Config {
        parameter: &'static str,
        detail: String,
    },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image decode error: {0}")]
    Image(#[from] image::ImageError),
    #[error("Config parse error: {0}")]
    ConfigParse(#[from] json5::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PulseError {
    pub(crate) fn input(stage: &'static str, detail: impl Into<String>) -> Self {
        Self::Input {
            stage,
            detail: detail.into(),
        }
    }

    pub(crate) fn numeric(stage: &'static str, detail: impl Into<String>) -> Self {
        Self::Numeric {
            stage,
            detail: detail.into(),
        }
    }

    pub(crate) fn config(parameter: &'static str, detail: impl Into<String>) -> Self {
        Self::Config {
            parameter,
            detail: detail.into(),
        }
    }

    pub fn is_input(&self) -> bool {
        matches!(self, Self::Input { .. })
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Numeric { .. })
    }

    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config { .. })
    }
}

pub type Result<T> = std::result::Result<T, PulseError>;
