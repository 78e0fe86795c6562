//! Maximum and minimum intensity projection.

use std::{marker::PhantomData, ops::Range};

use crate::{
    render::{cropping::VoxelCropping, ray_info::RayInfo},
    space_leap::SpaceLeaper,
    volumetric::{Scalar, MAX_COMPONENTS},
};

use super::{
    composite::block_of,
    layout::{Layout, LayoutTables},
    sampler::{FromSource, Sampler, VoxelSource},
    RayKernel,
};

/// Running extreme of the tracked components
struct Extremes<M> {
    best: [Option<M>; MAX_COMPONENTS],
    /// Table index of `best`
    best_index: [u16; MAX_COMPONENTS],
    /// Indices of every component at the extreme, dependent layouts only
    snapshot: [u16; MAX_COMPONENTS],
}

pub(crate) struct MipKernel<'a, T, S, L> {
    source: VoxelSource<'a, T>,
    tables: LayoutTables<'a>,
    leaper: Option<&'a SpaceLeaper>,
    cropping: Option<VoxelCropping>,
    /// Minimum instead of maximum
    flip: bool,
    _kinds: PhantomData<fn() -> (S, L)>,
}

impl<'a, T, S, L> MipKernel<'a, T, S, L>
where
    T: Scalar,
    S: FromSource<'a, T>,
    L: Layout,
{
    pub fn new(
        source: VoxelSource<'a, T>,
        tables: LayoutTables<'a>,
        leaper: Option<&'a SpaceLeaper>,
        cropping: Option<VoxelCropping>,
        flip: bool,
    ) -> Self {
        MipKernel {
            source,
            tables,
            leaper,
            cropping,
            flip,
            _kinds: PhantomData,
        }
    }

    // Dependent data follows the opacity component
    fn tracked(&self) -> Range<usize> {
        let components = self.source.components;
        if L::INDEPENDENT {
            0..components
        } else {
            components - 1..components
        }
    }

    #[inline(always)]
    fn improves(&self, value: S::Mip, best: Option<S::Mip>) -> bool {
        match best {
            None => true,
            Some(best) if self.flip => value < best,
            Some(best) => value > best,
        }
    }

    // A block is skipped once every tracked component has an extreme the block cannot beat
    fn can_skip(&self, leaper: &SpaceLeaper, block: usize, extremes: &Extremes<S::Mip>) -> bool {
        self.tracked().all(|c| {
            extremes.best[c].is_some()
                && !leaper.may_improve(block, c, extremes.best_index[c], self.flip)
        })
    }

    fn trace(&self, sampler: &mut S, ray: &RayInfo) -> Extremes<S::Mip> {
        let mut extremes = Extremes {
            best: [None; MAX_COMPONENTS],
            best_index: [0; MAX_COMPONENTS],
            snapshot: [0; MAX_COMPONENTS],
        };
        let tracked = self.tracked();

        let mut pos = ray.start;
        let mut block = usize::MAX;
        let mut skip = false;

        for _ in 0..ray.steps {
            let sample_pos = pos;
            pos.advance(&ray.step);

            if let Some(leaper) = self.leaper {
                let current = leaper.block_index(block_of(self.source.clamp_voxel(&sample_pos)));
                if current != block {
                    block = current;
                    skip = self.can_skip(leaper, block, &extremes);
                }
                if skip {
                    continue;
                }
            }

            if let Some(cropping) = &self.cropping {
                if cropping.is_cropped(&sample_pos) {
                    continue;
                }
            }

            sampler.load(&sample_pos);
            for c in tracked.clone() {
                let value = sampler.mip_value(c);
                if !self.improves(value, extremes.best[c]) {
                    continue;
                }
                extremes.best[c] = Some(value);
                extremes.best_index[c] = sampler.mip_index(value, c);
                if !L::INDEPENDENT {
                    for (i, index) in extremes.snapshot[..self.source.components]
                        .iter_mut()
                        .enumerate()
                    {
                        *index = sampler.index(i);
                    }
                }
            }
        }

        extremes
    }
}

impl<'a, T, S, L> RayKernel for MipKernel<'a, T, S, L>
where
    T: Scalar,
    S: FromSource<'a, T>,
    L: Layout,
{
    type Sampler = S;

    fn sampler(&self) -> S {
        S::from_source(self.source)
    }

    fn cast(&self, sampler: &mut S, ray: &RayInfo) -> [u16; 4] {
        let extremes = self.trace(sampler, ray);
        if extremes.best[self.tracked().start].is_none() {
            return [0; 4];
        }
        let indices = if L::INDEPENDENT {
            extremes.best_index
        } else {
            extremes.snapshot
        };
        L::mip_pixel(&indices, &self.tables)
    }
}
