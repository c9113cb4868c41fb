use std::path::PathBuf;

use crate::gpu::GpuError;

/// Errors that can occur while loading, creating or using cached assets.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("asset not found: {0}")]
    NotFound(String),

    #[error("malformed asset '{path}': {reason}")]
    Format { path: String, reason: String },

    #[error("no decoder for extension '{extension}' (asset '{path}')")]
    UnsupportedFormat { path: String, extension: String },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("asset already exists: {0}")]
    AlreadyExists(String),

    #[error("handle used after release")]
    UseAfterRelease,

    #[error("I/O error loading '{0}': {1}")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("GPU error: {0}")]
    Gpu(#[from] GpuError),
}

impl AssetError {
    pub(crate) fn format(path: impl ToString, reason: impl ToString) -> Self {
        AssetError::Format {
            path: path.to_string(),
            reason: reason.to_string(),
        }
    }
}
