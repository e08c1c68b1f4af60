//! Error types for terrain construction

use glam::Vec3;
use thiserror::Error;

/// Main error type for the crate
#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid terrain size {size}: page sizes must be 2^N + 1 and at least 3")]
    InvalidSize { size: u32 },

    #[error("Invalid block size {0}: must be greater than zero")]
    InvalidBlockSize(u32),

    #[error("Height map has {actual} samples, expected {expected}")]
    HeightMapLength { expected: usize, actual: usize },

    #[error("Invalid step scale {0}: x and z must be finite and positive, y finite")]
    InvalidStepScale(Vec3),

    #[error("Terrain depth {depth} exceeds the limit of {max} levels")]
    DepthExceeded { depth: u32, max: u32 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(String),
}
