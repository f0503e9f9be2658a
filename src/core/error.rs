//! Error taxonomy for the memory grid.
//!
//! Only configuration and persistence problems surface as errors. Degenerate grid states
//! (no live cells, isolated cells, zero-norm vectors) resolve to neutral values inside the
//! components and never reach this type, and cancellation is reported through the driver's
//! `StopReason`.

use thiserror::Error;

/// Errors raised while configuring, feeding, or restoring a grid.
#[derive(Debug, Error)]
pub enum CortexError {
    #[error("grid dimensions must be positive, got {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("neighborhood radius must be positive and finite, got {0}")]
    InvalidRadius(f32),

    #[error("weight curve `{0}` must hold at least the self weight")]
    EmptyWeightCurve(&'static str),

    #[error("memory vector has length {found}, grid expects {expected}")]
    VectorLengthMismatch { expected: usize, found: usize },

    #[error("retuned constants change the grid shape; rebuild the grid instead")]
    ShapeChanged,

    #[error("coordinates ({x}, {y}) do not name a live cell")]
    CellOutOfRange { x: usize, y: usize },

    #[error("snapshot does not start with the expected magic bytes")]
    BadMagic,

    #[error("snapshot version {0} is newer than this reader supports")]
    UnsupportedVersion(u32),

    #[error("snapshot is missing the `{}` chunk", String::from_utf8_lossy(.0))]
    MissingChunk([u8; 4]),

    #[error("snapshot i/o failed")]
    Io(#[from] std::io::Error),

    #[error("snapshot chunk could not be decoded")]
    Codec(#[from] bincode::Error),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, CortexError>;
