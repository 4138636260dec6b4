use std::path::{Path, PathBuf};

/// Fatal outcome of one import or cache call.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("failed to import model '{}': {message}", path.display())]
    Import { path: PathBuf, message: String },

    #[error("model cache '{}' is corrupt: {message}", path.display())]
    CacheCorruption { path: PathBuf, message: String },

    #[error("failed to read model cache '{}': {message}", path.display())]
    CacheRead { path: PathBuf, message: String },

    #[error("failed to write model cache '{}': {message}", path.display())]
    CacheWrite { path: PathBuf, message: String },
}

impl ModelError {
    pub fn path(&self) -> &Path {
        match self {
            Self::Import { path, .. }
            | Self::CacheCorruption { path, .. }
            | Self::CacheRead { path, .. }
            | Self::CacheWrite { path, .. } => path,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Import { message, .. }
            | Self::CacheCorruption { message, .. }
            | Self::CacheRead { message, .. }
            | Self::CacheWrite { message, .. } => message,
        }
    }
}
