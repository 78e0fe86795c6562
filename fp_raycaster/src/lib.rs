//! Fixed-point ray-cast volume rendering.
//!
//! [`render::FixedPointRayCastMapper`] renders scalar volumes of up to four components
//! in 15-bit fixed point, [`picking::PickingManager`] arbitrates between pickers of
//! interactive scenes.

pub mod camera;
pub mod color;
pub mod common;
pub mod error;
pub mod fixed_point;
pub mod picking;
pub mod render;
pub mod shading;
pub mod space_leap;
pub mod test_helpers;
pub mod transfer_function;
pub mod volumetric;

pub use error::{RenderError, Result, VolumeError};
