use nalgebra::Vector2;

use crate::fixed_point;

/// RGBA output of the ray caster, 15-bit fixed-point channels.
///
/// Rows go downwards, pixel `[0,0]` is the upper left corner.
/// Colors are premultiplied by alpha.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RayCastImage {
    resolution: Vector2<usize>,
    pixels: Vec<u16>,
}

impl RayCastImage {
    pub fn new(resolution: Vector2<usize>) -> RayCastImage {
        RayCastImage {
            resolution,
            pixels: vec![0; resolution.x * resolution.y * 4],
        }
    }

    pub fn resolution(&self) -> Vector2<usize> {
        self.resolution
    }

    /// Resize and clear
    pub fn reset(&mut self, resolution: Vector2<usize>) {
        self.resolution = resolution;
        self.pixels.clear();
        self.pixels.resize(resolution.x * resolution.y * 4, 0);
    }

    /// Interleaved RGBA samples
    pub fn pixels(&self) -> &[u16] {
        &self.pixels
    }

    pub(crate) fn pixels_mut(&mut self) -> &mut [u16] {
        &mut self.pixels
    }

    /// Panics if the pixel lies outside the image
    pub fn pixel(&self, x: usize, y: usize) -> [u16; 4] {
        let i = (y * self.resolution.x + x) * 4;
        [
            self.pixels[i],
            self.pixels[i + 1],
            self.pixels[i + 2],
            self.pixels[i + 3],
        ]
    }

    /// 8-bit RGBA, for display and file output
    pub fn to_rgba8(&self) -> Vec<u8> {
        self.pixels.iter().map(|&v| fixed_point::to_u8(v)).collect()
    }

    /// 8-bit RGB over a black background
    pub fn to_rgb8(&self) -> Vec<u8> {
        self.pixels
            .chunks_exact(4)
            .flat_map(|p| [p[0], p[1], p[2]])
            .map(fixed_point::to_u8)
            .collect()
    }
}

/// Presented image plus the buffer the next frame is drawn into.
///
/// Both buffers live across frames, a frame replaces the presented image only when
/// it was drawn completely.
#[derive(Debug)]
pub(crate) struct ImageBuffers {
    front: RayCastImage,
    back: RayCastImage,
}

impl ImageBuffers {
    pub fn new(resolution: Vector2<usize>) -> ImageBuffers {
        ImageBuffers {
            front: RayCastImage::new(resolution),
            back: RayCastImage::new(resolution),
        }
    }

    /// Last completely drawn image
    pub fn front(&self) -> &RayCastImage {
        &self.front
    }

    /// Clear the back buffer, `draw` into it and present it if `draw` succeeds.
    pub fn draw<E>(
        &mut self,
        resolution: Vector2<usize>,
        draw: impl FnOnce(&mut RayCastImage) -> Result<(), E>,
    ) -> Result<&RayCastImage, E> {
        self.back.reset(resolution);
        draw(&mut self.back)?;
        std::mem::swap(&mut self.front, &mut self.back);
        Ok(&self.front)
    }
}
