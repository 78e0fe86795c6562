use nalgebra::Vector3;

use super::SampleGenerator;

/// Ball centered in the volume, densest in the middle
pub struct SphereGenerator {
    center: Vector3<f32>,
    radius: f32,
}

impl SphereGenerator {
    pub fn new(dims: Vector3<usize>) -> SphereGenerator {
        let center = (dims.cast::<f32>() - Vector3::repeat(1.0)) / 2.0;
        SphereGenerator {
            center,
            radius: center.min().max(1.0),
        }
    }
}

impl SampleGenerator for SphereGenerator {
    fn sample_at(&self, coords: Vector3<usize>) -> u8 {
        let d = (coords.cast::<f32>() - self.center).norm() / self.radius;
        (255.0 * (1.0 - d)).clamp(0.0, 255.0) as u8
    }
}
