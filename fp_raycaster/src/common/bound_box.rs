use nalgebra::{point, Point3, Vector3};

use super::Ray;

/// Axis aligned box, used for volume bounds and pickable props.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundBox {
    pub lower: Point3<f32>,
    pub upper: Point3<f32>,
}

impl BoundBox {
    pub fn new(lower: Point3<f32>, upper: Point3<f32>) -> BoundBox {
        BoundBox { lower, upper }
    }

    pub fn from_position_dims(position: Point3<f32>, dimensions: Vector3<f32>) -> BoundBox {
        BoundBox {
            lower: position,
            upper: position + dimensions,
        }
    }

    pub fn dims(&self) -> Vector3<f32> {
        self.upper - self.lower
    }

    pub fn center(&self) -> Point3<f32> {
        self.lower + 0.5 * self.dims()
    }

    /// Closed containment test, points on faces are inside.
    pub fn contains(&self, pos: &Point3<f32>) -> bool {
        (0..3).all(|i| self.lower[i] <= pos[i] && pos[i] <= self.upper[i])
    }

    /// Parameters of the ray segment inside the box, `(t_enter, t_exit)`.
    ///
    /// `t_enter` is negative when the ray starts inside the box.
    /// Returns `None` when the box is missed or lies entirely behind the ray origin.
    pub fn intersect(&self, ray: &Ray) -> Option<(f32, f32)> {
        // Source: An Efficient and Robust Ray–Box Intersection Algorithm. Amy Williams et al. 2004.

        // t value of intersection with the 6 planes of a bounding box
        let t0 = (self.lower - ray.origin).component_div(&ray.direction);
        let t1 = (self.upper - ray.origin).component_div(&ray.direction);

        // [ (min,max) , (min,max) , (min,max) ]
        let t_minmax = t0.zip_map(&t1, |t0, t1| if t0 < t1 { (t0, t1) } else { (t1, t0) });

        let tmin = f32::max(f32::max(t_minmax.x.0, t_minmax.y.0), t_minmax.z.0);
        let tmax = f32::min(f32::min(t_minmax.x.1, t_minmax.y.1), t_minmax.z.1);

        // NaN appears for rays lying exactly in a face plane
        if tmin.is_nan() || tmax.is_nan() {
            return None;
        }

        if tmax.is_sign_negative() {
            return None;
        }

        if tmin > tmax {
            return None;
        }

        Some((tmin, tmax))
    }
}

/// Iterates over the 8 corners of a [`BoundBox`]
pub struct BoundBoxIterator {
    lower: Point3<f32>,
    upper: Point3<f32>,
    state: u8,
}

impl Iterator for BoundBoxIterator {
    type Item = Point3<f32>;

    fn next(&mut self) -> Option<Self::Item> {
        let p = match self.state {
            0 => self.lower,
            1 => point![self.upper.x, self.lower.y, self.lower.z],
            2 => point![self.upper.x, self.upper.y, self.lower.z],
            3 => point![self.lower.x, self.upper.y, self.lower.z],
            4 => point![self.lower.x, self.lower.y, self.upper.z],
            5 => point![self.upper.x, self.lower.y, self.upper.z],
            6 => self.upper,
            7 => point![self.lower.x, self.upper.y, self.upper.z],
            _ => return None,
        };
        self.state += 1;
        Some(p)
    }
}

impl IntoIterator for BoundBox {
    type Item = Point3<f32>;

    type IntoIter = BoundBoxIterator;

    fn into_iter(self) -> Self::IntoIter {
        BoundBoxIterator {
            lower: self.lower,
            upper: self.upper,
            state: 0,
        }
    }
}
