//! Voxel samplers of the kernel.
//!
//! A sampler is loaded with a ray position and then answers per-component table
//! indices, gradient magnitudes and shading coefficients of that position.

use std::marker::PhantomData;

use crate::{
    fixed_point::{mul, mul_floor, FixedPosition, ONE, ROUND_UP, SHIFT},
    shading::ShadingTables,
    transfer_function::ScalarConversion,
    volumetric::{GradientField, Scalar, Volume, MAX_COMPONENTS},
};

/// Raw value to table index conversion, chosen once per render
pub(crate) trait IndexConversion: 'static {
    fn index<T: Scalar>(conversion: &ScalarConversion, raw: T) -> u16;
}

/// Raw values are indices (`shift == 0`, `scale == 1`)
pub(crate) struct Identity;

/// `(raw + shift) * scale`, clamped to the table
pub(crate) struct Scaled;

impl IndexConversion for Identity {
    #[inline(always)]
    fn index<T: Scalar>(_conversion: &ScalarConversion, raw: T) -> u16 {
        raw.as_index()
    }
}

impl IndexConversion for Scaled {
    #[inline(always)]
    fn index<T: Scalar>(conversion: &ScalarConversion, raw: T) -> u16 {
        conversion.index(raw.to_f64())
    }
}

/// Read-only voxel data shared by all samplers of a render
pub(crate) struct VoxelSource<'a, T> {
    pub data: &'a [T],
    pub max_voxel: [u32; 3],
    pub dims: [usize; 2],
    pub components: usize,
    pub conversions: &'a [ScalarConversion],
    pub gradients: Option<&'a GradientField>,
    pub shading: Option<&'a ShadingTables>,
}

impl<'a, T> Clone for VoxelSource<'a, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, T> Copy for VoxelSource<'a, T> {}

impl<'a, T: Scalar> VoxelSource<'a, T> {
    pub fn new(
        volume: &Volume,
        data: &'a [T],
        conversions: &'a [ScalarConversion],
        gradients: Option<&'a GradientField>,
        shading: Option<&'a ShadingTables>,
    ) -> Self {
        let dims = volume.dims();
        VoxelSource {
            data,
            max_voxel: [
                (dims.x - 1) as u32,
                (dims.y - 1) as u32,
                (dims.z - 1) as u32,
            ],
            dims: [dims.x, dims.y],
            components: volume.components(),
            conversions,
            gradients,
            shading,
        }
    }

    /// Voxel containing `pos`, clamped to the volume
    #[inline(always)]
    pub fn clamp_voxel(&self, pos: &FixedPosition) -> [u32; 3] {
        let v = pos.voxel();
        [
            v[0].min(self.max_voxel[0]),
            v[1].min(self.max_voxel[1]),
            v[2].min(self.max_voxel[2]),
        ]
    }

    #[inline(always)]
    pub fn voxel_index(&self, v: [u32; 3]) -> usize {
        v[0] as usize + self.dims[0] * (v[1] as usize + self.dims[1] * v[2] as usize)
    }
}

pub(crate) trait Sampler {
    /// Value tracked by maximum intensity projection
    type Mip: Copy + PartialOrd;

    fn load(&mut self, pos: &FixedPosition);

    /// Table index of `component` at the loaded position
    fn index(&self, component: usize) -> u16;

    /// Quantized gradient magnitude, 0 without gradients
    fn magnitude(&self, channel: usize) -> u8;

    /// Diffuse and specular coefficients of table set `set`
    fn shading(&self, set: usize, channel: usize) -> ([u32; 3], [u32; 3]);

    fn mip_value(&self, component: usize) -> Self::Mip;

    fn mip_index(&self, value: Self::Mip, component: usize) -> u16;
}

pub(crate) trait FromSource<'a, T: Scalar>: Sampler {
    fn from_source(source: VoxelSource<'a, T>) -> Self;
}

// Unlit coefficients, used when shading data is missing
const UNLIT: ([u32; 3], [u32; 3]) = ([ONE; 3], [0; 3]);

/// Value of the closest voxel.
///
/// Ray positions carry a half voxel bias, the voxel is the integer part.
pub(crate) struct Nearest<'a, T, C> {
    source: VoxelSource<'a, T>,
    voxel: usize,
    _conversion: PhantomData<fn() -> C>,
}

impl<'a, T: Scalar, C: IndexConversion> FromSource<'a, T> for Nearest<'a, T, C> {
    fn from_source(source: VoxelSource<'a, T>) -> Self {
        Nearest {
            source,
            voxel: 0,
            _conversion: PhantomData,
        }
    }
}

impl<'a, T: Scalar, C: IndexConversion> Sampler for Nearest<'a, T, C> {
    /// Native values, no conversion on the hot path
    type Mip = T;

    #[inline(always)]
    fn load(&mut self, pos: &FixedPosition) {
        self.voxel = self.source.voxel_index(self.source.clamp_voxel(pos));
    }

    #[inline(always)]
    fn index(&self, component: usize) -> u16 {
        let raw = self.source.data[self.voxel * self.source.components + component];
        C::index(&self.source.conversions[component], raw)
    }

    #[inline(always)]
    fn magnitude(&self, channel: usize) -> u8 {
        match self.source.gradients {
            Some(g) => g.magnitude(self.voxel, channel),
            None => 0,
        }
    }

    #[inline(always)]
    fn shading(&self, set: usize, channel: usize) -> ([u32; 3], [u32; 3]) {
        match (self.source.gradients, self.source.shading) {
            (Some(g), Some(shading)) => {
                let direction = g.direction(self.voxel, channel);
                (
                    shading.diffuse(set, direction).map(u32::from),
                    shading.specular(set, direction).map(u32::from),
                )
            }
            _ => UNLIT,
        }
    }

    #[inline(always)]
    fn mip_value(&self, component: usize) -> T {
        self.source.data[self.voxel * self.source.components + component]
    }

    #[inline(always)]
    fn mip_index(&self, value: T, component: usize) -> u16 {
        C::index(&self.source.conversions[component], value)
    }
}

/// Trilinear blend of the 8 voxels around the position.
///
/// Corners are converted to table indices first, the indices are interpolated.
/// Corner data is fetched only when the ray enters a new cell.
pub(crate) struct Trilinear<'a, T, C> {
    source: VoxelSource<'a, T>,
    cell: Option<[u32; 3]>,
    weights: [u32; 8],
    indices: [[u32; 8]; MAX_COMPONENTS],
    magnitudes: [[u32; 8]; MAX_COMPONENTS],
    directions: [[u16; 8]; MAX_COMPONENTS],
    _conversion: PhantomData<fn() -> C>,
}

impl<'a, T: Scalar, C: IndexConversion> FromSource<'a, T> for Trilinear<'a, T, C> {
    fn from_source(source: VoxelSource<'a, T>) -> Self {
        Trilinear {
            source,
            cell: None,
            weights: [0; 8],
            indices: [[0; 8]; MAX_COMPONENTS],
            magnitudes: [[0; 8]; MAX_COMPONENTS],
            directions: [[0; 8]; MAX_COMPONENTS],
            _conversion: PhantomData,
        }
    }
}

impl<'a, T: Scalar, C: IndexConversion> Trilinear<'a, T, C> {
    fn fetch(&mut self, base: [u32; 3]) {
        let src = &self.source;
        let max = src.max_voxel;

        // A, B = +x, C = +y, D = +xy, E..H the same one slice further in z
        let mut corners = [0; 8];
        for (i, corner) in corners.iter_mut().enumerate() {
            let v = [
                (base[0] + (i as u32 & 1)).min(max[0]),
                (base[1] + ((i as u32 >> 1) & 1)).min(max[1]),
                (base[2] + (i as u32 >> 2)).min(max[2]),
            ];
            *corner = src.voxel_index(v);
        }

        for c in 0..src.components {
            let conversion = &src.conversions[c];
            for (i, &corner) in corners.iter().enumerate() {
                let raw = src.data[corner * src.components + c];
                self.indices[c][i] = C::index(conversion, raw) as u32;
            }
        }

        if let Some(g) = src.gradients {
            for ch in 0..g.channels() {
                for (i, &corner) in corners.iter().enumerate() {
                    self.magnitudes[ch][i] = g.magnitude(corner, ch) as u32;
                    self.directions[ch][i] = g.direction(corner, ch);
                }
            }
        }
    }

    #[inline(always)]
    fn interpolate(&self, values: &[u32; 8]) -> u32 {
        let sum: u32 = values
            .iter()
            .zip(self.weights.iter())
            .map(|(v, w)| v * w)
            .sum();
        (ROUND_UP + sum) >> SHIFT
    }
}

/// Corner weights of a position inside a cell, ordered like the corners
#[inline(always)]
pub(crate) fn trilinear_weights(fraction: [u32; 3]) -> [u32; 8] {
    let w2 = fraction;
    let w1 = [ONE - w2[0], ONE - w2[1], ONE - w2[2]];

    let xy = [
        mul(w1[0], w1[1]),
        mul(w2[0], w1[1]),
        mul(w1[0], w2[1]),
        mul(w2[0], w2[1]),
    ];

    [
        mul_floor(w1[2], xy[0]),
        mul_floor(w1[2], xy[1]),
        mul_floor(w1[2], xy[2]),
        mul_floor(w1[2], xy[3]),
        mul_floor(w2[2], xy[0]),
        mul_floor(w2[2], xy[1]),
        mul_floor(w2[2], xy[2]),
        mul_floor(w2[2], xy[3]),
    ]
}

impl<'a, T: Scalar, C: IndexConversion> Sampler for Trilinear<'a, T, C> {
    /// Interpolated table indices
    type Mip = u16;

    #[inline(always)]
    fn load(&mut self, pos: &FixedPosition) {
        let base = self.source.clamp_voxel(pos);
        if self.cell != Some(base) {
            self.cell = Some(base);
            self.fetch(base);
        }
        self.weights = trilinear_weights(pos.fraction());
    }

    #[inline(always)]
    fn index(&self, component: usize) -> u16 {
        self.interpolate(&self.indices[component]) as u16
    }

    #[inline(always)]
    fn magnitude(&self, channel: usize) -> u8 {
        self.interpolate(&self.magnitudes[channel]).min(255) as u8
    }

    fn shading(&self, set: usize, channel: usize) -> ([u32; 3], [u32; 3]) {
        let shading = match (self.source.gradients, self.source.shading) {
            (Some(_), Some(shading)) => shading,
            _ => return UNLIT,
        };

        let mut diffuse = [0u32; 3];
        let mut specular = [0u32; 3];
        for (i, &direction) in self.directions[channel].iter().enumerate() {
            let w = self.weights[i];
            let d = shading.diffuse(set, direction);
            let s = shading.specular(set, direction);
            for k in 0..3 {
                diffuse[k] += d[k] as u32 * w;
                specular[k] += s[k] as u32 * w;
            }
        }

        (
            diffuse.map(|v| (ROUND_UP + v) >> SHIFT),
            specular.map(|v| (ROUND_UP + v) >> SHIFT),
        )
    }

    #[inline(always)]
    fn mip_value(&self, component: usize) -> u16 {
        self.index(component)
    }

    #[inline(always)]
    fn mip_index(&self, value: u16, _component: usize) -> u16 {
        value
    }
}
