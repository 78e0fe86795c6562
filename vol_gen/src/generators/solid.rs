use nalgebra::Vector3;

use crate::config::{Config, GeneratorConfig};

use super::SampleGenerator;

/// Generate solid volume
/// All sample values are the same, apart from an empty border
pub struct SolidGenerator {
    /// The sample value
    sample: u8,
    pad: usize,
    dims: Vector3<usize>,
}

impl SolidGenerator {
    pub fn new(dims: Vector3<usize>, sample: u8, pad: usize) -> SolidGenerator {
        SolidGenerator { sample, pad, dims }
    }

    pub fn from_config(config: &Config) -> SolidGenerator {
        let sample = match config.generator {
            GeneratorConfig::Solid { sample } => sample,
            _ => 0,
        };
        let pad = config.dims.min() / 8;
        SolidGenerator::new(config.dims, sample, pad)
    }
}

impl SampleGenerator for SolidGenerator {
    fn sample_at(&self, coords: Vector3<usize>) -> u8 {
        let inside = (0..3).all(|axis| {
            coords[axis] >= self.pad && coords[axis] + self.pad < self.dims[axis]
        });
        if inside {
            self.sample
        } else {
            0
        }
    }
}
