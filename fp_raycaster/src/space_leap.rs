//! Coarse block summary of the volume used to skip transparent regions.
//!
//! The volume is split into blocks of 4x4x4 voxels. A block stores the minimal and
//! maximal table index of every component over voxels `4b..=4b+4`, so the cells
//! a trilinear sample may read are covered too.
//!
//! Interpolated indices never exceed the largest corner but may fall slightly below
//! the smallest one, the lower bounds are widened by a margin when interpolating.

use log::debug;
use nalgebra::Vector3;

use crate::{
    common::TimeStamp,
    fixed_point::BLOCK_SIDE,
    transfer_function::{ScalarConversion, TransferFunctionTables},
    volumetric::{dispatch_scalars, GradientField, Scalar, Volume},
};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum BlockType {
    Empty,
    NonEmpty,
}

#[derive(Debug, Default)]
pub struct SpaceLeaper {
    block_dims: Vector3<usize>,
    components: usize,
    /// `[min, max]` index, `block * components + component`
    ranges: Vec<[u16; 2]>,
    gradient_channels: usize,
    /// `block * gradient_channels + channel`
    max_magnitudes: Vec<u8>,
    blocks: Vec<BlockType>,
    conversions: Vec<ScalarConversion>,
    /// Subtracted from lower index bounds
    margin: u16,
    build_time: Option<TimeStamp>,
}

/// Lower bound slack needed by trilinear sampling
pub const TRILINEAR_MARGIN: u16 = 16;

impl SpaceLeaper {
    pub fn new() -> SpaceLeaper {
        SpaceLeaper::default()
    }

    /// Slack subtracted from the lower index bound of every block
    pub fn set_margin(&mut self, margin: u16) {
        self.margin = margin;
    }

    pub fn margin(&self) -> u16 {
        self.margin
    }

    /// Block grid size of a volume
    pub fn block_dims_of(dims: Vector3<usize>) -> Vector3<usize> {
        dims.map(|d| ((d.max(1) - 1) / BLOCK_SIDE) + 1)
    }

    /// Rebuild the block summary if the volume, the index conversion or the gradient
    /// field changed since the last build. Returns `true` when rebuilt.
    pub fn update(
        &mut self,
        volume: &Volume,
        conversions: &[ScalarConversion],
        gradients: Option<&GradientField>,
    ) -> bool {
        let channels = gradients.map_or(0, GradientField::channels);
        let stale = match self.build_time {
            None => true,
            Some(built) => {
                volume.mtime() > built
                    || self.conversions != conversions
                    || self.gradient_channels != channels
                    || gradients.map_or(false, |g| g.build_time() > built)
            }
        };
        if !stale {
            return false;
        }

        self.block_dims = SpaceLeaper::block_dims_of(volume.dims());
        self.components = volume.components();
        self.conversions = conversions.to_vec();
        self.gradient_channels = channels;

        let block_count = self.block_count();
        self.ranges = vec![[u16::MAX, 0]; block_count * self.components];
        dispatch_scalars!(volume.data(), data => self.collect_ranges(volume, data), opaque => ());

        self.max_magnitudes = vec![0; block_count * channels];
        if let Some(gradients) = gradients {
            self.collect_magnitudes(volume, gradients);
        }

        self.blocks = vec![BlockType::NonEmpty; block_count];
        self.build_time = Some(TimeStamp::now());

        debug!(
            "Space leap structure rebuilt, {}x{}x{} blocks",
            self.block_dims.x, self.block_dims.y, self.block_dims.z
        );
        true
    }

    // Visits every voxel of every block, borders are shared between neighbours
    fn for_each_block_voxel(&self, dims: Vector3<usize>, mut f: impl FnMut(usize, usize)) {
        for bz in 0..self.block_dims.z {
            for by in 0..self.block_dims.y {
                for bx in 0..self.block_dims.x {
                    let block = self.block_index([bx as u32, by as u32, bz as u32]);
                    let span = |b: usize, d: usize| {
                        (b * BLOCK_SIDE)..=((b * BLOCK_SIDE + BLOCK_SIDE).min(d - 1))
                    };
                    for z in span(bz, dims.z) {
                        for y in span(by, dims.y) {
                            for x in span(bx, dims.x) {
                                f(block, x + dims.x * (y + dims.y * z));
                            }
                        }
                    }
                }
            }
        }
    }

    fn collect_ranges<T: Scalar>(&mut self, volume: &Volume, data: &[T]) {
        let components = self.components;
        let conversions = std::mem::take(&mut self.conversions);
        let mut ranges = std::mem::take(&mut self.ranges);

        self.for_each_block_voxel(volume.dims(), |block, voxel| {
            for c in 0..components {
                let index = conversions[c].index(data[voxel * components + c].to_f64());
                let range = &mut ranges[block * components + c];
                range[0] = range[0].min(index);
                range[1] = range[1].max(index);
            }
        });

        self.conversions = conversions;
        self.ranges = ranges;
    }

    fn collect_magnitudes(&mut self, volume: &Volume, gradients: &GradientField) {
        let channels = self.gradient_channels;
        let mut maxima = std::mem::take(&mut self.max_magnitudes);

        self.for_each_block_voxel(volume.dims(), |block, voxel| {
            for ch in 0..channels {
                let m = &mut maxima[block * channels + ch];
                *m = (*m).max(gradients.magnitude(voxel, ch));
            }
        });

        self.max_magnitudes = maxima;
    }

    /// Re-evaluate block visibility for composite rendering against current tables.
    ///
    /// A block is visible when some table set maps a part of its index range to a
    /// nonzero opacity, and, with gradient opacity, some magnitude up to the block's
    /// maximum to a nonzero gradient opacity.
    pub fn update_flags(&mut self, tables: &TransferFunctionTables) {
        let sets = tables.tables();
        for block in 0..self.blocks.len() {
            let visible = sets.iter().enumerate().any(|(channel, set)| {
                let [lo, hi] = self.index_range(block, set.opacity_component());
                if !set.any_opacity(lo.saturating_sub(self.margin), hi) {
                    return false;
                }
                if set.gradient_opacity_table().is_none() {
                    return true;
                }
                let magnitude = if channel < self.gradient_channels {
                    self.max_magnitude(block, channel)
                } else {
                    u8::MAX
                };
                set.any_gradient_opacity(magnitude)
            });
            self.blocks[block] = if visible {
                BlockType::NonEmpty
            } else {
                BlockType::Empty
            };
        }

        debug!(
            "Space leap flags updated, {}/{} blocks visible",
            self.non_empty_blocks(),
            self.blocks.len()
        );
    }

    pub fn block_dims(&self) -> Vector3<usize> {
        self.block_dims
    }

    pub fn block_count(&self) -> usize {
        self.block_dims.iter().product()
    }

    #[inline(always)]
    pub fn block_index(&self, block: [u32; 3]) -> usize {
        block[0] as usize
            + self.block_dims.x * (block[1] as usize + self.block_dims.y * block[2] as usize)
    }

    #[inline(always)]
    pub fn block_type(&self, block: usize) -> BlockType {
        self.blocks[block]
    }

    /// `[min, max]` table index of `component` inside a block
    #[inline(always)]
    pub fn index_range(&self, block: usize, component: usize) -> [u16; 2] {
        self.ranges[block * self.components + component]
    }

    pub fn max_magnitude(&self, block: usize, channel: usize) -> u8 {
        self.max_magnitudes[block * self.gradient_channels + channel]
    }

    /// Whether a block may hold an index above `current` (below when `flip`).
    /// Blocks that cannot improve the running extreme are skipped by MIP rays.
    #[inline(always)]
    pub fn may_improve(&self, block: usize, component: usize, current: u16, flip: bool) -> bool {
        let [lo, hi] = self.index_range(block, component);
        if flip {
            lo.saturating_sub(self.margin) <= current
        } else {
            hi >= current
        }
    }

    pub fn non_empty_blocks(&self) -> usize {
        self.blocks
            .iter()
            .filter(|&&b| b == BlockType::NonEmpty)
            .count()
    }
}

#[cfg(test)]
mod test {

    use nalgebra::vector;

    use super::*;
    use crate::{
        render::BlendMode,
        transfer_function::{PiecewiseFunction, VolumeProperty},
        volumetric::{DirectionEncoder, ScalarType},
    };

    // 9x5x5 volume, value 200 in voxel x == 8, zero elsewhere
    fn wall_volume() -> Volume {
        let dims = vector![9, 5, 5];
        let mut data = vec![0u8; 9 * 5 * 5];
        for z in 0..5 {
            for y in 0..5 {
                data[8 + 9 * (y + 5 * z)] = 200;
            }
        }
        Volume::builder().dims(dims).data(data).build().unwrap()
    }

    fn conversions(volume: &Volume) -> Vec<ScalarConversion> {
        vec![ScalarConversion::new(ScalarType::U8, &volume.component_range(0))]
    }

    #[test]
    fn block_ranges_share_borders() {
        let volume = wall_volume();
        let mut leaper = SpaceLeaper::new();
        assert!(leaper.update(&volume, &conversions(&volume), None));

        assert_eq!(leaper.block_dims(), vector![3, 2, 2]);

        let first = leaper.block_index([0, 0, 0]);
        let second = leaper.block_index([1, 0, 0]);
        let third = leaper.block_index([2, 1, 1]);
        assert_eq!(leaper.index_range(first, 0), [0, 0]);
        // Voxels 4..=8 include the wall
        assert_eq!(leaper.index_range(second, 0), [0, 200]);
        assert_eq!(leaper.index_range(third, 0), [200, 200]);

        assert!(!leaper.update(&volume, &conversions(&volume), None));
    }

    #[test]
    fn flags_follow_opacity() {
        let volume = wall_volume();
        let mut property = VolumeProperty::new();
        property
            .component_mut(0)
            .set_scalar_opacity(PiecewiseFunction::from_points(&[(100.0, 0.0), (101.0, 1.0)]));

        let mut tables = TransferFunctionTables::new();
        tables.update(&volume, &property, 1.0, BlendMode::Composite);

        let mut leaper = SpaceLeaper::new();
        leaper.update(&volume, tables.conversions(), None);
        leaper.update_flags(&tables);

        assert_eq!(leaper.block_type(leaper.block_index([0, 0, 0])), BlockType::Empty);
        assert_eq!(leaper.block_type(leaper.block_index([1, 1, 0])), BlockType::NonEmpty);
        assert_eq!(leaper.non_empty_blocks(), 8);

        property
            .component_mut(0)
            .set_scalar_opacity(PiecewiseFunction::from_points(&[(0.0, 1.0)]));
        tables.update(&volume, &property, 1.0, BlendMode::Composite);
        leaper.update_flags(&tables);
        assert_eq!(leaper.non_empty_blocks(), leaper.block_count());
    }

    #[test]
    fn gradient_opacity_hides_flat_blocks() {
        let volume = wall_volume();
        let encoder = DirectionEncoder::new();
        let gradients = GradientField::compute(&volume, false, &encoder, 1).unwrap();

        let mut property = VolumeProperty::new();
        property
            .component_mut(0)
            .set_gradient_opacity(Some(PiecewiseFunction::from_points(&[
                (0.0, 0.0),
                (1.0, 1.0),
            ])));
        let mut tables = TransferFunctionTables::new();
        tables.update(&volume, &property, 1.0, BlendMode::Composite);

        let mut leaper = SpaceLeaper::new();
        leaper.update(&volume, tables.conversions(), Some(&gradients));
        leaper.update_flags(&tables);

        // Far from the wall every gradient is zero
        let flat = leaper.block_index([0, 0, 0]);
        assert_eq!(leaper.max_magnitude(flat, 0), 0);
        assert_eq!(leaper.block_type(flat), BlockType::Empty);
        assert_eq!(leaper.block_type(leaper.block_index([2, 0, 0])), BlockType::NonEmpty);
    }

    #[test]
    fn mip_leap_test() {
        let volume = wall_volume();
        let mut leaper = SpaceLeaper::new();
        leaper.update(&volume, &conversions(&volume), None);

        let empty = leaper.block_index([0, 1, 1]);
        let wall = leaper.block_index([2, 0, 0]);

        assert!(!leaper.may_improve(empty, 0, 10, false));
        assert!(leaper.may_improve(wall, 0, 10, false));
        assert!(leaper.may_improve(empty, 0, 0, false));

        assert!(leaper.may_improve(empty, 0, 10, true));
        assert!(!leaper.may_improve(wall, 0, 10, true));

        leaper.set_margin(TRILINEAR_MARGIN);
        assert!(!leaper.may_improve(wall, 0, 150, true));
        assert!(leaper.may_improve(wall, 0, 190, true));
    }

    #[test]
    fn margin_widens_lower_bound() {
        let volume = wall_volume();
        let mut property = VolumeProperty::new();
        // Only indices just below the wall value are visible
        property
            .component_mut(0)
            .set_scalar_opacity(PiecewiseFunction::from_points(&[
                (189.0, 0.0),
                (190.0, 1.0),
                (195.0, 1.0),
                (196.0, 0.0),
            ]));
        let mut tables = TransferFunctionTables::new();
        tables.update(&volume, &property, 1.0, BlendMode::Composite);

        let mut leaper = SpaceLeaper::new();
        leaper.update(&volume, tables.conversions(), None);
        let wall = leaper.block_index([2, 1, 1]);

        leaper.update_flags(&tables);
        assert_eq!(leaper.block_type(wall), BlockType::Empty);

        leaper.set_margin(TRILINEAR_MARGIN);
        leaper.update_flags(&tables);
        assert_eq!(leaper.block_type(wall), BlockType::NonEmpty);
    }
}
