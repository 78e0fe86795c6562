//! Argument parsing and validation
//! Uses library `clap`

use std::ffi::OsStr;

use clap::{Arg, Command, ValueHint};

// up to 32bit value
pub fn is_positive_number(num: &str) -> Result<(), String> {
    let n = num.parse::<u32>();
    match n {
        Ok(n) => {
            if n > 0 {
                Ok(())
            } else {
                Err("Number must be greater than 0".into())
            }
        }
        Err(_) => Err("Number required".into()),
    }
}

pub fn can_fit_u8(num: &str) -> Result<(), String> {
    let n = num.parse::<u8>();
    match n {
        Ok(_) => Ok(()),
        Err(_) => Err("Number does not fit in range <0;255>".into()),
    }
}

pub fn is_float_number(num: &str) -> Result<(), String> {
    let n = num.parse::<f32>();
    match n {
        Ok(n) => {
            if n > 0.0 {
                Ok(())
            } else {
                Err("Number must be greater than 0.0".into())
            }
        }
        Err(_) => Err("Number required".into()),
    }
}

pub fn is_fraction(num: &str) -> Result<(), String> {
    match num.parse::<f32>() {
        Ok(n) if (0.0..=1.0).contains(&n) => Ok(()),
        Ok(_) => Err("Number must be in range <0;1>".into()),
        Err(_) => Err("Number required".into()),
    }
}

pub const GENERATOR_NAMES: &[&str] = &["shapes", "solid", "sphere"];
pub const BLEND_NAMES: &[&str] = &["composite", "mip", "minip"];
pub const INTERPOLATION_NAMES: &[&str] = &["nearest", "linear"];

pub fn get_command<'a>() -> Command<'a> {
    Command::new("Vol-gen")
        .version("0.1.0")
        .about("Synthesizes a volume and renders it with the fixed-point ray caster")
        .arg(
            Arg::new("dims")
                .help("Dimensions of volume")
                .long("dims")
                .short('d')
                .required(true)
                .number_of_values(3)
                .value_names(&["X", "Y", "Z"])
                .use_value_delimiter(true)
                .require_value_delimiter(true)
                .require_equals(true)
                .validator(is_positive_number),
        )
        .arg(
            Arg::new("shape")
                .help("Shape of cell")
                .long("shape")
                .short('s')
                .number_of_values(3)
                .value_names(&["X", "Y", "Z"])
                .use_value_delimiter(true)
                .require_value_delimiter(true)
                .require_equals(true)
                .default_values(&["1", "1", "1"])
                .validator(is_float_number),
        )
        .arg(
            Arg::new("generator")
                .help("Type of generator")
                .long("generator")
                .short('g')
                .required(true)
                .requires_ifs(&[
                    ("solid", "sample"), // if solid is set, require option sample
                    ("shapes", "n-of-shapes"),
                    ("shapes", "sample"),
                    ("shapes", "object-size"),
                ])
                .takes_value(true)
                .value_name("NAME")
                .possible_values(GENERATOR_NAMES),
        )
        .arg(
            Arg::new("seed")
                .help("Seed for RNG, leave out for random seed")
                .long("seed")
                .value_name("SEED")
                .validator(is_positive_number),
        )
        .arg(
            Arg::new("sample")
                .help("Values of generated object")
                .long("sample")
                .value_name("BYTE")
                .validator(|s| is_positive_number(s).and(can_fit_u8(s))),
        )
        .arg(
            Arg::new("object-size")
                .help("Size of individual generated objects")
                .long("object-size")
                .value_name("SIDE")
                .validator(is_positive_number),
        )
        .arg(
            Arg::new("n-of-shapes")
                .help("Number of shapes generated in volume")
                .long("n-of-shapes")
                .value_name("N")
                .validator(is_positive_number),
        )
        .arg(
            Arg::new("resolution")
                .help("Resolution of rendered image")
                .long("resolution")
                .short('r')
                .number_of_values(2)
                .value_names(&["W", "H"])
                .use_value_delimiter(true)
                .require_value_delimiter(true)
                .require_equals(true)
                .default_values(&["512", "512"])
                .validator(is_positive_number),
        )
        .arg(
            Arg::new("blend")
                .help("How samples along a ray are combined")
                .long("blend")
                .short('b')
                .default_value("composite")
                .value_name("MODE")
                .possible_values(BLEND_NAMES),
        )
        .arg(
            Arg::new("interpolation")
                .help("Sampling of the voxel grid")
                .long("interpolation")
                .short('i')
                .default_value("nearest")
                .value_name("KIND")
                .possible_values(INTERPOLATION_NAMES),
        )
        .arg(
            Arg::new("threshold")
                .help("Values up to this one are transparent")
                .long("threshold")
                .default_value("40")
                .value_name("BYTE")
                .validator(can_fit_u8),
        )
        .arg(
            Arg::new("opacity")
                .help("Opacity of the densest value")
                .long("opacity")
                .default_value("0.3")
                .value_name("ALPHA")
                .validator(is_fraction),
        )
        .arg(Arg::new("shade").help("Shade with a headlight").long("shade"))
        .arg(
            Arg::new("no-ert")
                .help("Disable early ray termination")
                .long("no-ert"),
        )
        .arg(
            Arg::new("no-ess")
                .help("Disable empty space skipping")
                .long("no-ess"),
        )
        .arg(
            Arg::new("threads")
                .help("Number of render threads, all cores when left out")
                .long("threads")
                .short('t')
                .value_name("N")
                .validator(is_positive_number),
        )
        .arg(
            Arg::new("output-file")
                .help("Image file to output (16-bit PPM)")
                .long("output-file")
                .short('o')
                .value_name("FILE")
                .allow_invalid_utf8(true)
                .value_hint(ValueHint::FilePath)
                .default_value_os(OsStr::new("a.ppm")),
        )
}
