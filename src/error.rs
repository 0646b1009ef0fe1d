use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, TerrainError>;

#[derive(Debug, Error)]
pub enum TerrainError {
    #[error("cell ({x}, {z}) is outside the {width}x{depth} grid")]
    OutOfBounds {
        x: i64,
        z: i64,
        width: usize,
        depth: usize,
    },
    #[error("voxel ({x}, {y}, {z}) is outside the {width}x{height}x{depth} volume")]
    VolumeOutOfBounds {
        x: usize,
        y: usize,
        z: usize,
        width: usize,
        height: usize,
        depth: usize,
    },
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: String, actual: String },
    #[error("cache file {path:?} was written for different parameters")]
    CacheStale { path: PathBuf },
    #[error("cache file {path:?} is corrupt: {reason}")]
    CacheCorrupt { path: PathBuf, reason: String },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("mesh export failed: {0}")]
    Mesh(String),
}

impl TerrainError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        TerrainError::InvalidParameter(message.into())
    }

    pub(crate) fn mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        TerrainError::DimensionMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }
}
