mod cropping;
mod image;
pub(crate) mod kernel;
mod mapper;
mod options;
pub(crate) mod ray_info;

pub use cropping::{Cropping, CroppingPreset, ALL_REGIONS};
pub use image::RayCastImage;
pub use mapper::{ComponentLayout, FixedPointRayCastMapper};
pub use options::{BlendMode, RenderOptions, RenderOptionsBuilder};
