mod direction_encoder;
pub mod gradients;
mod scalar;
mod volume;

pub use direction_encoder::{DirectionEncoder, ENCODER_GRID};
pub use gradients::{GradientField, GRADIENT_TABLE_SIZE};
pub(crate) use scalar::dispatch_scalars;
pub use scalar::{Scalar, ScalarData, ScalarType};
pub use volume::{Volume, VolumeBuilder, MAX_COMPONENTS};
