//! Module with helper functions
//! Saves repetition in unit tests, integration tests and benchmarks

use nalgebra::{point, vector, Vector3};

use crate::{
    camera::PerspectiveCamera,
    transfer_function::{ColorTransferFunction, PiecewiseFunction, VolumeProperty},
    volumetric::Volume,
};

/// Ball of dense values in the middle of a cube of side `side`, falling off to 0 at the faces
pub fn sphere_data(side: usize) -> Vec<u8> {
    let center = (side as f32 - 1.0) / 2.0;
    let mut data = Vec::with_capacity(side * side * side);
    for z in 0..side {
        for y in 0..side {
            for x in 0..side {
                let d = vector![x as f32 - center, y as f32 - center, z as f32 - center].norm();
                let v = 255.0 * (1.0 - d / center.max(1.0));
                data.push(v.clamp(0.0, 255.0) as u8);
            }
        }
    }
    data
}

pub fn sphere_volume(side: usize) -> Volume {
    Volume::builder()
        .dims(vector![side, side, side])
        .data(sphere_data(side))
        .build()
        .unwrap()
}

/// Values grow with the x coordinate, `0..=255`
pub fn ramp_volume(size: Vector3<usize>) -> Volume {
    let mut data = Vec::with_capacity(size.x * size.y * size.z);
    for _ in 0..size.z * size.y {
        for x in 0..size.x {
            data.push((x * 255 / (size.x - 1).max(1)) as u8);
        }
    }
    Volume::builder().dims(size).data(data).build().unwrap()
}

/// Gray ramp colors, transparent up to `threshold` then linearly up to `max_opacity`
pub fn threshold_property(threshold: f64, max_opacity: f64) -> VolumeProperty {
    let mut property = VolumeProperty::new();
    let component = property.component_mut(0);

    let mut color = ColorTransferFunction::new();
    color.add_rgb_point(0.0, 0.0, 0.0, 0.0);
    color.add_rgb_point(255.0, 1.0, 1.0, 1.0);
    component.set_color(color);

    component.set_scalar_opacity(PiecewiseFunction::from_points(&[
        (0.0, 0.0),
        (threshold, 0.0),
        (255.0, max_opacity),
    ]));
    property
}

/// Camera on the +z side of `volume`, looking at its center
pub fn front_camera(volume: &Volume) -> PerspectiveCamera {
    let bound_box = volume.bound_box();
    let center = bound_box.center();
    let distance = bound_box.dims().norm() * 1.5;
    PerspectiveCamera::look_at(point![center.x, center.y, center.z + distance], center)
}
