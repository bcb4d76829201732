use thiserror::Error;

/// Hard failures of the coding pipeline.
///
/// Parameter rejections never end up here, see [`crate::params::RejectedFields`].
#[derive(Debug, Error)]
pub enum FringesError {
    #[error("frame count {frames} is not a multiple of the configured frame count {expected}")]
    FrameCount { frames: usize, expected: usize },

    #[error("shape mismatch: {0}")]
    Shape(String),

    #[error("invalid coordinates: {0}")]
    Coordinates(String),

    #[error("config file has no '{0}' object")]
    MissingSection(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, FringesError>;
