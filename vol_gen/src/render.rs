//! Preview render of a generated volume

use fp_raycaster::{
    camera::PerspectiveCamera,
    render::{FixedPointRayCastMapper, RayCastImage, RenderOptions},
    transfer_function::{ColorTransferFunction, PiecewiseFunction, VolumeProperty},
    volumetric::Volume,
    Result,
};
use log::info;
use nalgebra::vector;

use crate::config::RenderConfig;

/// Warm ramp, transparent up to the threshold
pub fn preview_property(cfg: &RenderConfig) -> VolumeProperty {
    let mut property = VolumeProperty::new();
    property.set_interpolation(cfg.interpolation);
    property.set_shade(cfg.shade);

    let threshold = cfg.threshold as f64;
    let component = property.component_mut(0);

    let mut color = ColorTransferFunction::new();
    color.add_rgb_point(threshold, 0.5, 0.1, 0.0);
    color.add_rgb_point(255.0, 1.0, 0.9, 0.7);
    component.set_color(color);

    component.set_scalar_opacity(PiecewiseFunction::from_points(&[
        (0.0, 0.0),
        (threshold, 0.0),
        (255.0, cfg.opacity as f64),
    ]));
    property
}

/// Camera looking at the volume center along the main diagonal
pub fn preview_camera(volume: &Volume) -> PerspectiveCamera {
    let bound_box = volume.bound_box();
    let center = bound_box.center();
    let offset = vector![1.0, 0.8, 1.2].normalize() * bound_box.dims().norm() * 1.3;
    PerspectiveCamera::look_at(center + offset, center)
}

pub fn render_preview(volume: &Volume, cfg: &RenderConfig) -> Result<RayCastImage> {
    let mut options = RenderOptions::builder()
        .resolution(cfg.resolution)
        .blend_mode(cfg.blend)
        .early_ray_termination(cfg.early_ray_termination)
        .empty_space_skipping(cfg.empty_space_skipping);
    if let Some(threads) = cfg.threads {
        options = options.threads(threads);
    }
    let options = options.build()?;

    let mut camera = preview_camera(volume);
    camera.change_aspect_from_resolution(cfg.resolution.x, cfg.resolution.y);

    let mut mapper = FixedPointRayCastMapper::new(options);
    let image = mapper.render(volume, &preview_property(cfg), &camera, &[])?;
    info!(
        "Rendered {}x{} preview",
        cfg.resolution.x, cfg.resolution.y
    );
    Ok(image.clone())
}
