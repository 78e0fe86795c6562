use nalgebra::{Point3, Vector3};

/// Half-line with a direction.
///
/// Camera rays carry a unit direction, the `t` parameter then measures world distance.
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    pub origin: Point3<f32>,
    pub direction: Vector3<f32>,
}

impl Ray {
    pub fn new(origin: Point3<f32>, direction: Vector3<f32>) -> Ray {
        Ray { origin, direction }
    }

    /// Returns point `t` units far from ray origin in ray direction
    pub fn point_from_t(&self, t: f32) -> Point3<f32> {
        self.origin + t * self.direction
    }

    /// Transform ray from world coordinates into voxel coordinates.
    ///
    /// The `t` parameter is preserved: `point_from_t(t)` of the result is the
    /// voxel-space image of the world point `point_from_t(t)`.
    ///
    /// # Params
    /// * `origin` - World position of voxel `[0,0,0]`
    /// * `spacing` - Shape of cells in volume
    pub fn to_voxel_space(&self, origin: &Point3<f32>, spacing: &Vector3<f32>) -> Ray {
        let origin = Point3::from((self.origin - origin).component_div(spacing));
        let direction = self.direction.component_div(spacing);
        Ray { origin, direction }
    }
}
