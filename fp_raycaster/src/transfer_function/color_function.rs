use crate::{color::RGB, common::TimeStamp};

/// Color function given by `(x, rgb)` control points, linear in RGB between them.
///
/// Clamped outside of the control point range like [`PiecewiseFunction`](super::PiecewiseFunction).
#[derive(Debug, Clone, Default)]
pub struct ColorTransferFunction {
    points: Vec<(f64, RGB)>,
    mtime: TimeStamp,
}

impl ColorTransferFunction {
    pub fn new() -> ColorTransferFunction {
        ColorTransferFunction::default()
    }

    /// Add control point, replacing a point with the same `x`
    pub fn add_rgb_point(&mut self, x: f64, r: f32, g: f32, b: f32) {
        if x.is_nan() {
            return;
        }
        let color = crate::color::new(r, g, b);
        let pos = self.points.partition_point(|p| p.0 < x);
        match self.points.get_mut(pos) {
            Some(p) if p.0 == x => p.1 = color,
            _ => self.points.insert(pos, (x, color)),
        }
        self.mtime.modified();
    }

    pub fn remove_point(&mut self, x: f64) -> bool {
        match self.points.iter().position(|p| p.0 == x) {
            Some(i) => {
                self.points.remove(i);
                self.mtime.modified();
                true
            }
            None => false,
        }
    }

    pub fn remove_all_points(&mut self) {
        self.points.clear();
        self.mtime.modified();
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Color at `x`, `None` without control points
    pub fn color(&self, x: f64) -> Option<RGB> {
        let first = self.points.first()?;
        let last = self.points.last()?;
        if x <= first.0 {
            return Some(first.1);
        }
        if x >= last.0 {
            return Some(last.1);
        }

        let hi = self.points.partition_point(|p| p.0 <= x);
        let (x0, c0) = self.points[hi - 1];
        let (x1, c1) = self.points[hi];
        let t = ((x - x0) / (x1 - x0)) as f32;
        Some(c0 + (c1 - c0) * t)
    }

    pub fn mtime(&self) -> TimeStamp {
        self.mtime
    }
}

#[cfg(test)]
mod test {

    use super::*;

    #[test]
    fn color_ramp() {
        let mut f = ColorTransferFunction::new();
        assert_eq!(f.color(0.0), None);

        f.add_rgb_point(0.0, 0.0, 0.0, 1.0);
        f.add_rgb_point(100.0, 1.0, 0.0, 0.0);

        assert_eq!(f.color(-1.0), Some(crate::color::new(0.0, 0.0, 1.0)));
        assert_eq!(f.color(50.0), Some(crate::color::new(0.5, 0.0, 0.5)));
        assert_eq!(f.color(200.0), Some(crate::color::new(1.0, 0.0, 0.0)));
    }
}
