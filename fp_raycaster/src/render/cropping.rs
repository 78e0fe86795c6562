//! Cropping of the volume by six axis aligned planes.
//!
//! The planes split the volume into 27 regions, region `x + 3y + 9z` where each
//! coordinate is 0 below the lower plane, 1 between the planes and 2 above the upper
//! plane. Bit `r` of the flags keeps region `r` visible.

use nalgebra::{Point3, Vector3};

use crate::fixed_point::{FixedPosition, SHIFT};

/// Mask with every region set
pub const ALL_REGIONS: u32 = 0x7ff_ffff;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CroppingPreset {
    /// Only the central region
    SubVolume,
    /// Everything except the 8 corner regions
    Fence,
    /// The 8 corner regions
    InvertedFence,
    /// Regions with at least two central coordinates
    Cross,
    /// Complement of the cross
    InvertedCross,
}

impl CroppingPreset {
    pub fn flags(&self) -> u32 {
        match self {
            CroppingPreset::SubVolume => 0x0002000,
            CroppingPreset::Fence => 0x2ebfeba,
            CroppingPreset::InvertedFence => 0x5140145,
            CroppingPreset::Cross => 0x0417410,
            CroppingPreset::InvertedCross => 0x7be8bef,
        }
    }
}

/// Cropping planes in world coordinates and the visible region mask
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cropping {
    pub lower: Point3<f32>,
    pub upper: Point3<f32>,
    pub region_flags: u32,
}

impl Cropping {
    pub fn new(lower: Point3<f32>, upper: Point3<f32>, region_flags: u32) -> Cropping {
        Cropping {
            lower,
            upper,
            region_flags: region_flags & ALL_REGIONS,
        }
    }

    pub fn with_preset(lower: Point3<f32>, upper: Point3<f32>, preset: CroppingPreset) -> Cropping {
        Cropping::new(lower, upper, preset.flags())
    }

    /// Planes in fixed-point voxel coordinates.
    /// `bias` (in voxels) is added like it is added to ray positions.
    pub(crate) fn to_voxel_space(
        &self,
        origin: &Point3<f32>,
        spacing: &Vector3<f32>,
        bias: f32,
    ) -> VoxelCropping {
        let to_fixed = |world: f32, axis: usize| {
            let v = (world - origin[axis]) / spacing[axis] + bias;
            (v * (1 << SHIFT) as f32).round().max(0.0) as u32
        };
        let mut bounds = [[0; 2]; 3];
        for (axis, b) in bounds.iter_mut().enumerate() {
            let lo = to_fixed(self.lower[axis], axis);
            let hi = to_fixed(self.upper[axis], axis);
            *b = [lo.min(hi), lo.max(hi)];
        }
        VoxelCropping {
            bounds,
            flags: self.region_flags,
        }
    }
}

/// Cropping resolved against a volume, queried per sample
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoxelCropping {
    bounds: [[u32; 2]; 3],
    flags: u32,
}

impl VoxelCropping {
    #[inline(always)]
    pub fn region(&self, pos: &FixedPosition) -> u32 {
        let raw = pos.raw();
        let mut region = 0;
        let mut weight = 1;
        for axis in 0..3 {
            let [lo, hi] = self.bounds[axis];
            let idx = if raw[axis] < lo {
                0
            } else if raw[axis] <= hi {
                1
            } else {
                2
            };
            region += idx * weight;
            weight *= 3;
        }
        region
    }

    /// Whether the sample at `pos` is removed
    #[inline(always)]
    pub fn is_cropped(&self, pos: &FixedPosition) -> bool {
        (self.flags >> self.region(pos)) & 1 == 0
    }
}
