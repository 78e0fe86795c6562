use nalgebra::{vector, Vector3};

/// Side of the octahedral grid
pub const ENCODER_GRID: usize = 64;

/// Maps unit normals to `u16` indices on an octahedral grid.
///
/// The sphere is folded onto the octahedron `|x|+|y|+|z| = 1`, the lower half is
/// unfolded over the corners of the upper half, and the resulting square is
/// sampled by a `ENCODER_GRID` x `ENCODER_GRID` grid.
/// Index `ENCODER_GRID²` is reserved for zero normals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectionEncoder {
    grid: usize,
}

impl DirectionEncoder {
    pub fn new() -> DirectionEncoder {
        DirectionEncoder {
            grid: ENCODER_GRID,
        }
    }

    /// Count of indices, including the zero normal
    pub fn number_of_directions(&self) -> usize {
        self.grid * self.grid + 1
    }

    pub fn zero_normal_index(&self) -> u16 {
        (self.grid * self.grid) as u16
    }

    pub fn encode(&self, normal: &Vector3<f32>) -> u16 {
        let l1 = normal.x.abs() + normal.y.abs() + normal.z.abs();
        if !(l1 > f32::EPSILON) || !l1.is_finite() {
            return self.zero_normal_index();
        }

        let mut u = normal.x / l1;
        let mut v = normal.y / l1;
        if normal.z < 0.0 {
            let (fu, fv) = (u, v);
            u = (1.0 - fv.abs()) * sign(fu);
            v = (1.0 - fu.abs()) * sign(fv);
        }

        let last = (self.grid - 1) as f32;
        let to_cell = |c: f32| (((c + 1.0) * 0.5 * last).round() as usize).min(self.grid - 1);

        (to_cell(v) * self.grid + to_cell(u)) as u16
    }

    /// Unit normal of a grid cell, zero vector for the zero normal index
    pub fn decode(&self, index: u16) -> Vector3<f32> {
        let index = index as usize;
        if index >= self.grid * self.grid {
            return Vector3::zeros();
        }

        let last = (self.grid - 1) as f32;
        let mut u = (index % self.grid) as f32 / last * 2.0 - 1.0;
        let mut v = (index / self.grid) as f32 / last * 2.0 - 1.0;
        let z = 1.0 - u.abs() - v.abs();
        if z < 0.0 {
            let (fu, fv) = (u, v);
            u = (1.0 - fv.abs()) * sign(fu);
            v = (1.0 - fu.abs()) * sign(fv);
        }

        vector![u, v, z].normalize()
    }
}

impl Default for DirectionEncoder {
    fn default() -> Self {
        Self::new()
    }
}

fn sign(v: f32) -> f32 {
    if v >= 0.0 {
        1.0
    } else {
        -1.0
    }
}
