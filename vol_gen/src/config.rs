use std::{ffi::OsString, str::FromStr};

use clap::ArgMatches;
use fp_raycaster::{render::BlendMode, transfer_function::Interpolation};
use nalgebra::{Vector2, Vector3};

/// Parse all values of `key`
fn parse_values<T>(args: &ArgMatches, key: &str) -> Result<Vec<T>, String>
where
    T: FromStr,
{
    args.values_of(key)
        .ok_or_else(|| format!("missing value of {key}"))?
        .map(|v| v.parse::<T>().map_err(|_| format!("cannot parse {key} value {v}")))
        .collect()
}

fn parse_value<T: FromStr>(args: &ArgMatches, key: &str) -> Result<Option<T>, String> {
    args.value_of(key)
        .map(|v| v.parse::<T>().map_err(|_| format!("cannot parse {key} value {v}")))
        .transpose()
}

fn required<T: FromStr>(args: &ArgMatches, key: &str) -> Result<T, String> {
    parse_value(args, key)?.ok_or_else(|| format!("{key} is required"))
}

/// Transform `Values` into `Vector`
fn values_to_vector3<T>(args: &ArgMatches, key: &str) -> Result<Vector3<T>, String>
where
    T: FromStr + Copy + PartialEq + std::fmt::Debug + 'static,
{
    let vals: Vec<T> = parse_values(args, key)?;
    match vals[..] {
        [x, y, z] => Ok(Vector3::new(x, y, z)),
        _ => Err(format!("{key} needs 3 values")),
    }
}

/// App configuration
/// Config is built from args parsed by `clap`
#[derive(Debug)]
pub struct Config {
    /// Dimensions of volume
    pub dims: Vector3<usize>,
    /// Shape of cells
    pub cell_shape: Vector3<f32>,
    /// Type of generator to be used
    pub generator: GeneratorConfig,
    /// Optional seed for RNG, to replicate results
    pub seed: Option<u64>,
    pub render: RenderConfig,
    // Output file name
    pub file_name: OsString,
}

/// Settings of the preview render
#[derive(Debug, Clone)]
pub struct RenderConfig {
    pub resolution: Vector2<usize>,
    pub blend: BlendMode,
    pub interpolation: Interpolation,
    /// Values up to this one are transparent
    pub threshold: u8,
    /// Opacity of value 255
    pub opacity: f32,
    pub shade: bool,
    pub early_ray_termination: bool,
    pub empty_space_skipping: bool,
    /// `None` uses every core
    pub threads: Option<usize>,
}

impl Config {
    pub fn from_args(args: ArgMatches) -> Result<Config, String> {
        // Dims
        let dims = values_to_vector3::<usize>(&args, "dims")?;
        // Cell shape
        let cell_shape = values_to_vector3(&args, "shape")?;
        // Generator
        let generator = GeneratorConfig::from_args(&args)?;

        if let GeneratorConfig::Shapes { obj_size, .. } = generator {
            if dims.iter().any(|&d| d < obj_size as usize) {
                return Err(format!("object-size {obj_size} does not fit into the volume"));
            }
        }

        let seed = parse_value(&args, "seed")?;

        let resolution: Vec<usize> = parse_values(&args, "resolution")?;
        let resolution = match resolution[..] {
            [w, h] => Vector2::new(w, h),
            _ => return Err("resolution needs 2 values".into()),
        };

        let blend = match args.value_of("blend") {
            Some("mip") => BlendMode::MaximumIntensity,
            Some("minip") => BlendMode::MinimumIntensity,
            _ => BlendMode::Composite,
        };
        let interpolation = match args.value_of("interpolation") {
            Some("linear") => Interpolation::Linear,
            _ => Interpolation::Nearest,
        };

        let render = RenderConfig {
            resolution,
            blend,
            interpolation,
            threshold: required(&args, "threshold")?,
            opacity: required(&args, "opacity")?,
            shade: args.is_present("shade"),
            early_ray_termination: !args.is_present("no-ert"),
            empty_space_skipping: !args.is_present("no-ess"),
            threads: parse_value(&args, "threads")?,
        };

        // File name, has default value
        let file_name = args
            .value_of_os("output-file")
            .ok_or("output-file is required")?
            .into();

        Ok(Config {
            dims,
            cell_shape,
            generator,
            seed,
            render,
            file_name,
        })
    }
}

/// Settings specific to generator variant
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GeneratorConfig {
    /// Generate shapes
    Shapes {
        n_of_shapes: usize,
        sample: u8,
        obj_size: u32,
    },
    /// Generate solid volume
    Solid { sample: u8 },
    /// Ball with values falling off towards its surface
    Sphere,
}

impl GeneratorConfig {
    pub fn from_args(args: &ArgMatches) -> Result<GeneratorConfig, String> {
        match args.value_of("generator") {
            Some("shapes") => Ok(GeneratorConfig::Shapes {
                n_of_shapes: required(args, "n-of-shapes")?,
                sample: required(args, "sample")?,
                obj_size: required(args, "object-size")?,
            }),
            Some("solid") => Ok(GeneratorConfig::Solid {
                sample: required(args, "sample")?,
            }),
            Some("sphere") => Ok(GeneratorConfig::Sphere),
            other => Err(format!("unknown generator {other:?}")),
        }
    }
}
