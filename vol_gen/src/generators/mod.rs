use fp_raycaster::{error::VolumeError, volumetric::Volume};
use indicatif::{ProgressBar, ProgressStyle};
use log::info;
use nalgebra::Vector3;
use rayon::prelude::*;

use crate::config::{Config, GeneratorConfig};

mod shapes;
mod solid;
mod sphere;

pub use shapes::ShapesGenerator;
pub use solid::SolidGenerator;
pub use sphere::SphereGenerator;

// Generates one sample at a time, at any location
pub trait SampleGenerator: Sync {
    fn sample_at(&self, coords: Vector3<usize>) -> u8;
}

pub fn get_sample_generator(config: &Config) -> Box<dyn SampleGenerator> {
    match config.generator {
        GeneratorConfig::Shapes { .. } => Box::new(ShapesGenerator::from_config(config)),
        GeneratorConfig::Solid { .. } => Box::new(SolidGenerator::from_config(config)),
        GeneratorConfig::Sphere => Box::new(SphereGenerator::new(config.dims)),
    }
}

/// Fill a `dims` sized buffer, z slices are generated in parallel
pub fn generate_samples(sg: &dyn SampleGenerator, dims: Vector3<usize>) -> Vec<u8> {
    let slice_len = dims.x * dims.y;
    let mut data = vec![0; slice_len * dims.z];

    let progress = ProgressBar::new(dims.z as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{bar:40} {pos}/{len} slices")
            .progress_chars("#>-"),
    );

    data.par_chunks_mut(slice_len)
        .enumerate()
        .for_each(|(z, slice)| {
            for y in 0..dims.y {
                for x in 0..dims.x {
                    slice[x + dims.x * y] = sg.sample_at(Vector3::new(x, y, z));
                }
            }
            progress.inc(1);
        });

    progress.finish_and_clear();
    data
}

pub fn generate_vol(config: &Config) -> Result<Volume, VolumeError> {
    let generator = get_sample_generator(config);
    let data = generate_samples(generator.as_ref(), config.dims);

    info!(
        "Generated {}x{}x{} volume",
        config.dims.x, config.dims.y, config.dims.z
    );

    Volume::builder()
        .dims(config.dims)
        .spacing(config.cell_shape)
        .data(data)
        .build()
}

#[cfg(test)]
mod test {

    use nalgebra::vector;

    use super::*;

    struct Coords;

    impl SampleGenerator for Coords {
        fn sample_at(&self, coords: Vector3<usize>) -> u8 {
            (coords.x + 10 * coords.y + 100 * coords.z) as u8
        }
    }

    #[test]
    fn samples_are_laid_out_linearly() {
        let data = generate_samples(&Coords, vector![3, 2, 2]);
        assert_eq!(data.len(), 12);
        assert_eq!(data[1], 1);
        assert_eq!(data[3], 10);
        assert_eq!(data[6], 100);
        assert_eq!(data[11], 112);
    }
}
