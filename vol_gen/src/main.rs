use std::error::Error;

use config::Config;
use log::info;

mod args;
mod config;
mod file;
mod generators;
mod render;

use crate::{args::get_command, file::open_create_file, generators::generate_vol};

fn run(cfg: &Config) -> Result<(), Box<dyn Error>> {
    let volume = generate_vol(cfg)?;
    let image = render::render_preview(&volume, &cfg.render)?;

    let file = open_create_file(&cfg.file_name)?;
    file::write_ppm(&image, file)?;

    info!("Image written to {:?}", cfg.file_name);
    Ok(())
}

pub fn main() {
    env_logger::init();

    let args = get_command().get_matches();

    let cfg = match Config::from_args(args) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(2);
        }
    };

    println!("Generating volume...");

    if let Err(e) = run(&cfg) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }

    println!("Finished, result in {:?}", cfg.file_name);
}
