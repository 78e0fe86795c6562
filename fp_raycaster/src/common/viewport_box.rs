use std::ops::Range;

use nalgebra::{point, Point2, Vector2};

/// Rectangle on the image plane, in relative coordinates `<0;1>x<0;1>`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportBox {
    pub lower: Point2<f32>,
    pub upper: Point2<f32>,
}

impl ViewportBox {
    /// Inverted box, the first added point becomes its only content
    pub fn new() -> Self {
        Self {
            lower: point![f32::INFINITY, f32::INFINITY],
            upper: point![f32::NEG_INFINITY, f32::NEG_INFINITY],
        }
    }

    /// The whole image plane
    pub fn full() -> Self {
        Self {
            lower: point![0.0, 0.0],
            upper: point![1.0, 1.0],
        }
    }

    pub fn add_point(&mut self, x: f32, y: f32) {
        self.upper.x = f32::max(self.upper.x, x);
        self.upper.y = f32::max(self.upper.y, y);
        self.lower.x = f32::min(self.lower.x, x);
        self.lower.y = f32::min(self.lower.y, y);
    }

    pub fn size(&self) -> Vector2<f32> {
        self.upper - self.lower
    }

    /// Pixels covered by the box, clamped to the image.
    /// Partially covered pixels are included.
    pub fn get_pixel_range(&self, resolution: (usize, usize)) -> (Range<usize>, Range<usize>) {
        let (width, height) = resolution;

        let to_pixels = |low: f32, high: f32, size: usize| {
            let size_f = size as f32;
            // Float to int casts saturate, negative values become 0
            let start = (f32::floor(low * size_f) as usize).min(size);
            let end = (f32::ceil(high * size_f) as usize).min(size);
            start..end.max(start)
        };

        (
            to_pixels(self.lower.x, self.upper.x, width),
            to_pixels(self.lower.y, self.upper.y, height),
        )
    }
}

impl Default for ViewportBox {
    fn default() -> Self {
        Self::new()
    }
}
