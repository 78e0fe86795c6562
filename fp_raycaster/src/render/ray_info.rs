//! Camera rays converted to fixed-point voxel space.

use std::ops::Range;

use nalgebra::{Point3, Vector2, Vector3};

use crate::{
    camera::PerspectiveCamera,
    common::{BoundBox, ViewportBox},
    fixed_point::{FixedPosition, FixedStep},
    volumetric::Volume,
};

/// Fixed-point ray through the volume
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RayInfo {
    pub start: FixedPosition,
    pub step: FixedStep,
    pub steps: usize,
}

/// Everything needed to build the [`RayInfo`] of any pixel
#[derive(Debug, Clone)]
pub(crate) struct RaySetup {
    camera: PerspectiveCamera,
    resolution: (usize, usize),
    origin: Point3<f32>,
    spacing: Vector3<f32>,
    /// Voxel space box spanned by voxel centers
    voxel_box: BoundBox,
    sample_distance: f32,
    /// Added to every position, half a voxel for nearest sampling
    bias: f32,
}

impl RaySetup {
    pub fn new(
        camera: &PerspectiveCamera,
        volume: &Volume,
        resolution: Vector2<usize>,
        sample_distance: f32,
        bias: f32,
    ) -> RaySetup {
        let upper = (volume.dims() - Vector3::repeat(1)).cast::<f32>();
        RaySetup {
            camera: camera.clone(),
            resolution: (resolution.x, resolution.y),
            origin: volume.origin(),
            spacing: volume.spacing(),
            voxel_box: BoundBox::new(Point3::origin(), Point3::from(upper)),
            sample_distance,
            bias,
        }
    }

    /// Pixels the volume projects to.
    /// Falls back to the whole image when the volume reaches behind the camera.
    pub fn pixel_range(&self, volume_box: BoundBox) -> (Range<usize>, Range<usize>) {
        self.camera
            .project_box(volume_box)
            .unwrap_or_else(ViewportBox::full)
            .get_pixel_range(self.resolution)
    }

    /// Ray of pixel `(x, y)`, `None` when it misses the volume
    pub fn ray(&self, x: usize, y: usize) -> Option<RayInfo> {
        let world = self.camera.pixel_ray(x as f32, y as f32, self.resolution);
        let ray = world.to_voxel_space(&self.origin, &self.spacing);

        let (t0, t1) = self.voxel_box.intersect(&ray)?;
        let t0 = t0.max(0.0);

        let steps = ((t1 - t0) / self.sample_distance).floor() as usize + 1;

        let start = ray.point_from_t(t0);
        let mut coords = [0.0; 3];
        for (axis, c) in coords.iter_mut().enumerate() {
            let v = start[axis].clamp(self.voxel_box.lower[axis], self.voxel_box.upper[axis]);
            *c = v + self.bias;
        }

        let step = ray.direction * self.sample_distance;

        Some(RayInfo {
            start: FixedPosition::from_voxel_coords(coords),
            step: FixedStep::from_voxel_vector([step.x, step.y, step.z]),
            steps,
        })
    }
}
