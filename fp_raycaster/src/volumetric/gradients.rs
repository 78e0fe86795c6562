//! Per-voxel gradient estimation for gradient opacity and shading.
//!
//! Gradients are central differences in world units (one-sided on the volume border).
//! Magnitudes are quantized to `0..=255` with a per-channel scale derived from the
//! channel's value range, directions are stored as [`DirectionEncoder`] indices of the
//! surface normal (the negated gradient).

use log::debug;
use nalgebra::{vector, Vector3};

use crate::{
    common::{TimeStamp, ValueRange},
    error::RenderError,
};

use super::{dispatch_scalars, DirectionEncoder, Scalar, Volume};

/// Number of gradient opacity table entries, one per quantized magnitude
pub const GRADIENT_TABLE_SIZE: usize = 256;

/// Scale mapping a world-space gradient magnitude to the `0..=255` index range.
///
/// A jump over the full value range within 4 world units maps to the last index.
pub fn magnitude_scale(range: &ValueRange) -> f32 {
    let width = range.width();
    if width > 0.0 {
        (255.0 / (0.25 * width)) as f32
    } else {
        1.0
    }
}

/// Component feeding gradient channel `channel`.
///
/// Dependent data has a single channel computed from the opacity component (the last one),
/// independent data one channel per component.
pub fn channel_component(components: usize, independent: bool, channel: usize) -> usize {
    if independent {
        channel
    } else {
        components - 1
    }
}

pub fn channel_count(components: usize, independent: bool) -> usize {
    if independent {
        components
    } else {
        1
    }
}

/// Quantized gradients of all voxels
#[derive(Debug, Clone)]
pub struct GradientField {
    channels: usize,
    independent: bool,
    magnitudes: Vec<u8>,
    directions: Vec<u16>,
    scales: Vec<f32>,
    build_time: TimeStamp,
}

impl GradientField {
    /// Estimate gradients of `volume` using `threads` workers.
    ///
    /// Opaque payloads produce zero gradients.
    pub fn compute(
        volume: &Volume,
        independent: bool,
        encoder: &DirectionEncoder,
        threads: usize,
    ) -> Result<GradientField, RenderError> {
        let components = volume.components();
        let channels = channel_count(components, independent);
        let scales: Vec<f32> = (0..channels)
            .map(|ch| {
                let comp = channel_component(components, independent, ch);
                magnitude_scale(&volume.component_range(comp))
            })
            .collect();

        let len = volume.voxel_count() * channels;
        let mut magnitudes = vec![0; len];
        let mut directions = vec![encoder.zero_normal_index(); len];

        let job = GradientJob {
            dims: volume.dims(),
            spacing: volume.spacing(),
            components,
            independent,
            channels,
            scales: &scales,
            encoder,
        };

        dispatch_scalars!(
            volume.data(),
            data => job.run(data, &mut magnitudes, &mut directions, threads)?,
            opaque => ()
        );

        debug!(
            "Gradients computed, {} voxels, {} channel(s)",
            volume.voxel_count(),
            channels
        );

        Ok(GradientField {
            channels,
            independent,
            magnitudes,
            directions,
            scales,
            build_time: TimeStamp::now(),
        })
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn independent(&self) -> bool {
        self.independent
    }

    /// Quantized magnitudes, `voxel * channels + channel`
    pub fn magnitudes(&self) -> &[u8] {
        &self.magnitudes
    }

    /// Encoded normals, `voxel * channels + channel`
    pub fn directions(&self) -> &[u16] {
        &self.directions
    }

    pub fn magnitude(&self, voxel: usize, channel: usize) -> u8 {
        self.magnitudes[voxel * self.channels + channel]
    }

    pub fn direction(&self, voxel: usize, channel: usize) -> u16 {
        self.directions[voxel * self.channels + channel]
    }

    /// World magnitude to index scale of a channel
    pub fn magnitude_scale(&self, channel: usize) -> f32 {
        self.scales[channel]
    }

    pub fn build_time(&self) -> TimeStamp {
        self.build_time
    }
}

struct GradientJob<'a> {
    dims: Vector3<usize>,
    spacing: Vector3<f32>,
    components: usize,
    independent: bool,
    channels: usize,
    scales: &'a [f32],
    encoder: &'a DirectionEncoder,
}

impl<'a> GradientJob<'a> {
    fn run<T: Scalar>(
        &self,
        data: &[T],
        magnitudes: &mut [u8],
        directions: &mut [u16],
        threads: usize,
    ) -> Result<(), RenderError> {
        let slice_len = self.dims.x * self.dims.y * self.channels;
        let slices_per_thread = (self.dims.z + threads.max(1) - 1) / threads.max(1);
        let chunk_len = slice_len * slices_per_thread.max(1);

        crossbeam::scope(|s| {
            let chunks = magnitudes
                .chunks_mut(chunk_len)
                .zip(directions.chunks_mut(chunk_len));
            for (i, (mag_chunk, dir_chunk)) in chunks.enumerate() {
                let first_z = i * slices_per_thread;
                s.spawn(move |_| {
                    let slices = mag_chunk
                        .chunks_mut(slice_len)
                        .zip(dir_chunk.chunks_mut(slice_len));
                    for (dz, (mags, dirs)) in slices.enumerate() {
                        self.slice(data, first_z + dz, mags, dirs);
                    }
                });
            }
        })
        .map_err(|_| RenderError::WorkerPanicked)
    }

    fn slice<T: Scalar>(&self, data: &[T], z: usize, mags: &mut [u8], dirs: &mut [u16]) {
        let mut i = 0;
        for y in 0..self.dims.y {
            for x in 0..self.dims.x {
                for ch in 0..self.channels {
                    let comp = channel_component(self.components, self.independent, ch);
                    let g = self.gradient(data, [x, y, z], comp);
                    let norm = g.norm();

                    let mag = (norm * self.scales[ch]).round().clamp(0.0, 255.0);
                    mags[i] = mag as u8;
                    dirs[i] = if norm > 0.0 {
                        self.encoder.encode(&(-g / norm))
                    } else {
                        self.encoder.zero_normal_index()
                    };
                    i += 1;
                }
            }
        }
    }

    fn gradient<T: Scalar>(&self, data: &[T], pos: [usize; 3], comp: usize) -> Vector3<f32> {
        let fetch = |p: [usize; 3]| {
            let index = p[0] + self.dims.x * (p[1] + self.dims.y * p[2]);
            data[index * self.components + comp].to_f64()
        };

        let mut g = vector![0.0, 0.0, 0.0];
        for axis in 0..3 {
            let (mut lo, mut hi) = (pos, pos);
            lo[axis] = pos[axis].saturating_sub(1);
            hi[axis] = (pos[axis] + 1).min(self.dims[axis] - 1);
            let steps = hi[axis] - lo[axis];
            if steps > 0 {
                let delta = fetch(hi) - fetch(lo);
                g[axis] = (delta / (steps as f64 * self.spacing[axis] as f64)) as f32;
            }
        }
        g
    }
}
