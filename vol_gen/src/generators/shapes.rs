use std::ops::RangeInclusive;

use nalgebra::{vector, Vector3};

use crate::config::{Config, GeneratorConfig};

use super::SampleGenerator;

/// Generate volume with a number of randomly placed shapes
pub struct ShapesGenerator {
    shapes: Vec<ShapeInfo>,
}

impl ShapesGenerator {
    pub fn new(shapes: Vec<ShapeInfo>) -> ShapesGenerator {
        ShapesGenerator { shapes }
    }

    pub fn from_config(config: &Config) -> ShapesGenerator {
        let (n_of_shapes, sample, obj_size) = match config.generator {
            GeneratorConfig::Shapes {
                n_of_shapes,
                sample,
                obj_size,
            } => (n_of_shapes, sample, obj_size as usize),
            _ => (0, 0, 1),
        };

        let variance = obj_size / 10;
        let random_shape_gen = ShapeInfoGenerator::new(
            config.dims,
            Vector3::repeat(obj_size),
            Vector3::repeat(variance),
            sample,
            10,
            config.seed,
        );
        ShapesGenerator::new(random_shape_gen.get_shapes(n_of_shapes))
    }
}

impl SampleGenerator for ShapesGenerator {
    // First shape containing the coordinates wins
    fn sample_at(&self, coords: Vector3<usize>) -> u8 {
        self.shapes
            .iter()
            .filter(|shape| shape.contains(coords))
            .find_map(|shape| shape.render_at(coords - shape.position_low))
            .unwrap_or(0)
    }
}

// # of enum ShapeType variants
const N_OF_SHAPE_KINDS: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeType {
    Cuboid,
    Sphere,
}

/// One shape in volume, occupying `position_low..=position_high`
#[derive(Debug, Clone)]
pub struct ShapeInfo {
    pub position_low: Vector3<usize>,
    pub position_high: Vector3<usize>,
    pub shape_type: ShapeType,
    pub sample: u8,
}

impl ShapeInfo {
    #[must_use]
    pub fn new(
        position_low: Vector3<usize>,
        position_high: Vector3<usize>,
        shape_type: ShapeType,
        sample: u8,
    ) -> Self {
        Self {
            position_low,
            position_high,
            shape_type,
            sample,
        }
    }

    fn contains(&self, coords: Vector3<usize>) -> bool {
        (0..3).all(|axis| {
            (self.position_low[axis]..=self.position_high[axis]).contains(&coords[axis])
        })
    }

    fn render_at(&self, offset: Vector3<usize>) -> Option<u8> {
        match self.shape_type {
            ShapeType::Cuboid => Some(self.sample),
            ShapeType::Sphere => self.render_sphere(offset),
        }
    }

    fn render_sphere(&self, offset: Vector3<usize>) -> Option<u8> {
        let size = (self.position_high - self.position_low).cast::<f32>();
        let center = size / 2.0;
        let r = size.min() / 2.0;

        if (offset.cast::<f32>() - center).norm() <= r {
            Some(self.sample)
        } else {
            None
        }
    }
}

/// Generate shapes
/// Helper type
pub struct ShapeInfoGenerator {
    rng: fastrand::Rng,
    vol_dims: Vector3<usize>,
    size: Vector3<usize>,
    size_variance: Vector3<usize>,
    sample: u8,
    sample_variance: u8,
}

impl ShapeInfoGenerator {
    #[must_use]
    pub fn new(
        vol_dims: Vector3<usize>,
        size: Vector3<usize>,
        size_variance: Vector3<usize>,
        sample: u8,
        sample_variance: u8,
        seed: Option<u64>,
    ) -> Self {
        let rng = fastrand::Rng::new();
        if let Some(seed) = seed {
            rng.seed(seed);
        }

        Self {
            rng,
            vol_dims,
            size,
            size_variance,
            sample,
            sample_variance,
        }
    }

    fn random_shape(&self) -> ShapeType {
        match self.rng.u8(0..N_OF_SHAPE_KINDS) {
            0 => ShapeType::Cuboid,
            _ => ShapeType::Sphere,
        }
    }

    fn random_vector(&self, ranges: [RangeInclusive<usize>; 3]) -> Vector3<usize> {
        let [x, y, z] = ranges;
        vector![self.rng.usize(x), self.rng.usize(y), self.rng.usize(z)]
    }

    pub fn get_shapes(&self, n: usize) -> Vec<ShapeInfo> {
        (0..n).map(|_| self.get_shape()).collect()
    }

    pub fn get_shape(&self) -> ShapeInfo {
        let shape_type = self.random_shape();

        // Sizes are clamped so that every shape fits the volume
        let size_ranges = [0, 1, 2].map(|axis| {
            let max = (self.size[axis] + self.size_variance[axis]).min(self.vol_dims[axis]);
            let min = self.size[axis]
                .saturating_sub(self.size_variance[axis])
                .clamp(1, max.max(1));
            min..=max.max(1)
        });
        let size = self.random_vector(size_ranges);

        // Spawn shape in positions it fits
        let pos_ranges = [0, 1, 2].map(|axis| 0..=self.vol_dims[axis].saturating_sub(size[axis]));
        let position_low = self.random_vector(pos_ranges);

        let position_high = position_low + size - Vector3::repeat(1);

        let sample = self.random_sample();

        ShapeInfo::new(position_low, position_high, shape_type, sample)
    }

    fn random_sample(&self) -> u8 {
        // Uses saturating intrinsics, so there is no overflow
        let low = self.sample.saturating_sub(self.sample_variance);
        let high = self.sample.saturating_add(self.sample_variance);
        self.rng.u8(low..=high)
    }
}
