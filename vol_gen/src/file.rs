use std::{
    fs::{File, OpenOptions},
    io::{self, BufWriter, Write},
    path::Path,
};

use byteorder::{BigEndian, WriteBytesExt};
use fp_raycaster::render::RayCastImage;

pub fn open_create_file<P>(path: P) -> Result<File, io::Error>
where
    P: AsRef<Path>,
{
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
}

// 15-bit channel stretched to the full 16-bit range
fn widen(v: u16) -> u16 {
    (v << 1) | (v >> 14)
}

/// Binary PPM with 16-bit big-endian channels, composited over black
pub fn write_ppm<W: Write>(image: &RayCastImage, out: W) -> io::Result<()> {
    let mut out = BufWriter::new(out);
    let resolution = image.resolution();
    write!(out, "P6\n{} {}\n65535\n", resolution.x, resolution.y)?;
    for pixel in image.pixels().chunks_exact(4) {
        for &channel in &pixel[..3] {
            out.write_u16::<BigEndian>(widen(channel))?;
        }
    }
    out.flush()
}

#[cfg(test)]
mod test {

    use fp_raycaster::{
        render::{FixedPointRayCastMapper, RenderOptions},
        transfer_function::VolumeProperty,
        volumetric::Volume,
    };
    use nalgebra::{point, vector};

    use super::*;

    #[test]
    fn widen_covers_range() {
        assert_eq!(widen(0), 0);
        assert_eq!(widen(0x7fff), 0xffff);
        assert_eq!(widen(0x4000), 0x8001);
    }

    #[test]
    fn ppm_layout() {
        let volume = Volume::builder()
            .dims(vector![2, 2, 2])
            .data(vec![255u8; 8])
            .build()
            .unwrap();
        let camera = fp_raycaster::camera::PerspectiveCamera::look_at(
            point![0.5, 0.5, 10.0],
            point![0.5, 0.5, 0.5],
        );
        let options = RenderOptions::builder()
            .resolution(vector![3, 2])
            .build()
            .unwrap();
        let mut mapper = FixedPointRayCastMapper::new(options);
        let image = mapper
            .render(&volume, &VolumeProperty::new(), &camera, &[])
            .unwrap();

        let mut buffer = Vec::new();
        write_ppm(image, &mut buffer).unwrap();

        let header = b"P6\n3 2\n65535\n";
        assert_eq!(&buffer[..header.len()], header);
        assert_eq!(buffer.len(), header.len() + 3 * 2 * 3 * 2);
    }
}
