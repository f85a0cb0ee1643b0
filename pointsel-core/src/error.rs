//! Error types for pointsel

use thiserror::Error;

/// Main error type for selection operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("no point cloud is bound to the spatial index")]
    NotBound,

    /// Selection operations treat empty clouds as a no-op instead
    #[error("point cloud is empty")]
    EmptyCloud,

    #[error("cannot fit a plane through {points} point(s): need at least 3 non-collinear points")]
    DegeneratePlaneFit { points: usize },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("point index {index} is out of range for a cloud of {len} points")]
    InvalidIndex { index: usize, len: usize },
}

/// Result type alias for pointsel operations
pub type Result<T> = std::result::Result<T, Error>;
