//! Front-to-back alpha compositing.

use std::marker::PhantomData;

use crate::{
    fixed_point::{complement, mul_floor, BLOCK_SHIFT, ONE, SHIFT},
    render::{cropping::VoxelCropping, ray_info::RayInfo},
    space_leap::{BlockType, SpaceLeaper},
    volumetric::Scalar,
};

use super::{
    layout::{Layout, LayoutTables},
    sampler::{FromSource, VoxelSource},
    RayKernel,
};

/// Accumulated color and remaining opacity of one ray
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Compositor {
    color: [u32; 3],
    remaining: u32,
}

impl Compositor {
    pub fn new() -> Compositor {
        Compositor {
            color: [0; 3],
            remaining: ONE,
        }
    }

    /// Blend a premultiplied sample behind everything accumulated so far
    #[inline(always)]
    pub fn add(&mut self, color: [u32; 3], alpha: u32) {
        for k in 0..3 {
            self.color[k] += mul_floor(color[k], self.remaining);
        }
        self.remaining = mul_floor(self.remaining, complement(alpha));
    }

    #[inline(always)]
    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn pixel(&self) -> [u16; 4] {
        [
            self.color[0].min(ONE) as u16,
            self.color[1].min(ONE) as u16,
            self.color[2].min(ONE) as u16,
            (ONE - self.remaining) as u16,
        ]
    }
}

#[inline(always)]
pub(crate) fn block_of(voxel: [u32; 3]) -> [u32; 3] {
    voxel.map(|v| v >> (BLOCK_SHIFT - SHIFT))
}

/// Composite ray caster, one instance per render configuration
pub(crate) struct CompositeKernel<'a, T, S, L, const GO: bool, const SHADE: bool> {
    source: VoxelSource<'a, T>,
    tables: LayoutTables<'a>,
    leaper: Option<&'a SpaceLeaper>,
    cropping: Option<VoxelCropping>,
    /// Remaining opacity that stops a ray, `None` disables termination
    termination: Option<u32>,
    _kinds: PhantomData<fn() -> (S, L)>,
}

impl<'a, T, S, L, const GO: bool, const SHADE: bool> CompositeKernel<'a, T, S, L, GO, SHADE> {
    pub fn new(
        source: VoxelSource<'a, T>,
        tables: LayoutTables<'a>,
        leaper: Option<&'a SpaceLeaper>,
        cropping: Option<VoxelCropping>,
        termination: Option<u32>,
    ) -> Self {
        CompositeKernel {
            source,
            tables,
            leaper,
            cropping,
            termination,
            _kinds: PhantomData,
        }
    }
}

impl<'a, T, S, L, const GO: bool, const SHADE: bool> RayKernel
    for CompositeKernel<'a, T, S, L, GO, SHADE>
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
        let mut compositor = Compositor::new();
        let mut pos = ray.start;
        let mut block = usize::MAX;
        let mut empty = false;

        for _ in 0..ray.steps {
            let sample_pos = pos;
            pos.advance(&ray.step);

            if let Some(leaper) = self.leaper {
                let current = leaper.block_index(block_of(self.source.clamp_voxel(&sample_pos)));
                if current != block {
                    block = current;
                    empty = leaper.block_type(block) == BlockType::Empty;
                }
                if empty {
                    continue;
                }
            }

            if let Some(cropping) = &self.cropping {
                if cropping.is_cropped(&sample_pos) {
                    continue;
                }
            }

            sampler.load(&sample_pos);
            let (color, alpha) = match L::classify::<S, GO, SHADE>(sampler, &self.tables) {
                Some(sample) => sample,
                None => continue,
            };
            compositor.add(color, alpha);

            if let Some(threshold) = self.termination {
                if compositor.remaining() < threshold {
                    break;
                }
            }
        }

        compositor.pixel()
    }
}
