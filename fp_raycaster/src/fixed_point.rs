//! Fixed-point convention shared by the lookup tables and the compositing kernel.
//!
//! Colors and opacities are fractions with 15 fraction bits where `0x7fff` stands for 1.0.
//! Every product of two such values fits into `u32` (both factors stay below `u16::MAX`),
//! so the kernel never widens past 32 bits.
//!
//! Ray positions are voxel coordinates carrying the same 15 fraction bits.
//! Upper 17 bits are the voxel index, `>> 17` yields the 4x4x4 block coordinate.

/// Number of fraction bits
pub const SHIFT: u32 = 15;
/// Fraction part of a fixed-point position
pub const MASK: u32 = 0x7fff;
/// Fixed-point 1.0 for colors and opacities
pub const ONE: u32 = 0x7fff;
/// Rounding bias for round-half-up products
pub const ROUND_HALF: u32 = 0x4000;
/// Rounding bias used by the shading products and color premultiplication
pub const ROUND_UP: u32 = 0x7fff;
/// Rounding bias for round-half-down products
pub const ROUND_HALF_DOWN: u32 = 0x3fff;
/// Shift from a fixed-point position to a space-leap block coordinate
pub const BLOCK_SHIFT: u32 = 17;
/// Side of a space-leap block in voxels
pub const BLOCK_SIDE: usize = 1 << (BLOCK_SHIFT - SHIFT);
/// Default early ray termination threshold for the remaining opacity
pub const DEFAULT_TERMINATION: u16 = 0xff;

/// Product of two fractions, rounded to nearest.
#[inline(always)]
pub fn mul(a: u32, b: u32) -> u32 {
    (a * b + ROUND_HALF) >> SHIFT
}

/// Product of two fractions, rounded up.
#[inline(always)]
pub fn mul_up(a: u32, b: u32) -> u32 {
    (a * b + ROUND_UP) >> SHIFT
}

/// Product of two fractions, ties rounded down.
///
/// Gradient opacity of dependent components rounds this way.
#[inline(always)]
pub fn mul_half_down(a: u32, b: u32) -> u32 {
    (a * b + ROUND_HALF_DOWN) >> SHIFT
}

/// Product of two fractions, truncated.
///
/// Used by compositing: truncation keeps the remaining opacity strictly decreasing.
#[inline(always)]
pub fn mul_floor(a: u32, b: u32) -> u32 {
    (a * b) >> SHIFT
}

/// `1.0 - a`, saturated at zero
#[inline(always)]
pub fn complement(a: u32) -> u32 {
    ONE - a.min(ONE)
}

/// Clamp an accumulated value into the fraction range.
#[inline(always)]
pub fn saturate(v: u32) -> u16 {
    v.min(ONE) as u16
}

/// Float in `<0;1>` to fraction, rounded. Values outside are clamped.
pub fn from_f32(v: f32) -> u16 {
    if v.is_nan() {
        return 0;
    }
    (v.clamp(0.0, 1.0) * ONE as f32 + 0.5) as u16
}

/// Float to fraction without the upper clamp, saturating at `u16::MAX`.
///
/// Shading coefficients may exceed 1.0.
pub fn from_f32_unclamped(v: f32) -> u16 {
    if v.is_nan() || v <= 0.0 {
        return 0;
    }
    (v * ONE as f32 + 0.5).min(u16::MAX as f32) as u16
}

/// Fraction to float
pub fn to_f32(v: u32) -> f32 {
    v as f32 / ONE as f32
}

/// 15-bit fraction to 8-bit channel
#[inline]
pub fn to_u8(v: u16) -> u8 {
    (v.min(ONE as u16) >> 7) as u8
}

/// Position inside the volume in fixed-point voxel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedPosition([u32; 3]);

impl FixedPosition {
    /// Construct from voxel coordinates.
    /// Negative coordinates are clamped to zero.
    pub fn from_voxel_coords(coords: [f32; 3]) -> FixedPosition {
        FixedPosition(coords.map(|c| (c * (1 << SHIFT) as f32).round() as u32))
    }

    pub fn from_raw(raw: [u32; 3]) -> FixedPosition {
        FixedPosition(raw)
    }

    pub fn raw(&self) -> [u32; 3] {
        self.0
    }

    /// Index of the voxel containing the position
    #[inline(always)]
    pub fn voxel(&self) -> [u32; 3] {
        self.0.map(|c| c >> SHIFT)
    }

    /// Fractional offset inside the voxel
    #[inline(always)]
    pub fn fraction(&self) -> [u32; 3] {
        self.0.map(|c| c & MASK)
    }

    /// Move by one step, saturating at the ends of the `u32` range
    #[inline(always)]
    pub fn advance(&mut self, step: &FixedStep) {
        for i in 0..3 {
            self.0[i] = self.0[i].saturating_add_signed(step.0[i]);
        }
    }

    /// Voxel coordinates as floats
    pub fn to_voxel_coords(&self) -> [f32; 3] {
        self.0.map(|c| c as f32 / (1 << SHIFT) as f32)
    }
}

/// Per-sample increment of a [`FixedPosition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedStep([i32; 3]);

impl FixedStep {
    /// Construct from a step given in voxel units
    pub fn from_voxel_vector(step: [f32; 3]) -> FixedStep {
        FixedStep(step.map(|c| (c * (1 << SHIFT) as f32).round() as i32))
    }

    pub fn raw(&self) -> [i32; 3] {
        self.0
    }

    pub fn reversed(&self) -> FixedStep {
        FixedStep(self.0.map(|c| -c))
    }
}
