//! Error types of the renderer.

use thiserror::Error;

use crate::volumetric::ScalarType;

/// Fatal configuration errors, reported before any ray is cast.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// Scalar type the kernel has no sampler for.
    #[error("unsupported scalar type: {0:?}")]
    UnsupportedScalarType(ScalarType),

    /// Four dependent components stored as anything other than `u8`.
    #[error("four component dependent data must be unsigned char, got {0:?}")]
    FourComponentDependentType(ScalarType),

    /// Three dependent components have no defined mapping.
    #[error("three component dependent data is not supported")]
    ThreeComponentDependent,

    /// More components than the kernel can combine.
    #[error("volume has {0} components, at most 4 are supported")]
    TooManyComponents(usize),

    /// Rejected render options.
    #[error("invalid render options: {0}")]
    InvalidOptions(&'static str),

    /// A render worker panicked, image content is undefined.
    #[error("render worker thread panicked")]
    WorkerPanicked,
}

/// Errors raised while assembling a volume.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VolumeError {
    #[error("volume dimensions must be at least 1 in every axis")]
    DegenerateDimensions,

    #[error("voxel spacing must be positive")]
    InvalidSpacing,

    #[error("volumes have 1 to 4 components, got {0}")]
    ComponentCount(usize),

    #[error("data size mismatch: expected {expected}, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("no scalar data provided")]
    MissingData,
}

pub type Result<T> = std::result::Result<T, RenderError>;
