use crate::common::TimeStamp;

/// Scalar function given by control points, linear between them.
///
/// Outside of the control point range the function is clamped to the first or
/// last point value. A function without points has no value.
#[derive(Debug, Clone, Default)]
pub struct PiecewiseFunction {
    /// Sorted by x, x values unique
    points: Vec<(f64, f64)>,
    mtime: TimeStamp,
}

impl PiecewiseFunction {
    pub fn new() -> PiecewiseFunction {
        PiecewiseFunction::default()
    }

    /// Construct from `(x, y)` control points in any order
    pub fn from_points(points: &[(f64, f64)]) -> PiecewiseFunction {
        let mut f = PiecewiseFunction::new();
        for &(x, y) in points {
            f.add_point(x, y);
        }
        f
    }

    /// Add control point, replacing a point with the same `x`.
    /// Points with NaN coordinates are ignored.
    pub fn add_point(&mut self, x: f64, y: f64) {
        if x.is_nan() || y.is_nan() {
            return;
        }
        let pos = self.points.partition_point(|p| p.0 < x);
        match self.points.get_mut(pos) {
            Some(p) if p.0 == x => p.1 = y,
            _ => self.points.insert(pos, (x, y)),
        }
        self.mtime.modified();
    }

    /// Returns `true` if a point was removed
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

    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Value at `x`, `None` without control points
    pub fn value(&self, x: f64) -> Option<f64> {
        let first = self.points.first()?;
        let last = self.points.last()?;
        if x <= first.0 {
            return Some(first.1);
        }
        if x >= last.0 {
            return Some(last.1);
        }

        // first.0 < x < last.0, both neighbours exist
        let hi = self.points.partition_point(|p| p.0 <= x);
        let (x0, y0) = self.points[hi - 1];
        let (x1, y1) = self.points[hi];
        let t = (x - x0) / (x1 - x0);
        Some(y0 + t * (y1 - y0))
    }

    /// `(first x, last x)` of the control points
    pub fn range(&self) -> Option<(f64, f64)> {
        Some((self.points.first()?.0, self.points.last()?.0))
    }

    pub fn mtime(&self) -> TimeStamp {
        self.mtime
    }
}
