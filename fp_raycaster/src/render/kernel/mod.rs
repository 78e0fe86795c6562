//! Ray-cast kernel: samplers, layouts and the compositing helpers.
//!
//! Every render configuration is resolved to one concrete kernel type before the
//! parallel phase, the per-sample loop carries no configuration branches.

mod composite;
mod layout;
mod mip;
mod sampler;

use std::ops::Range;

use log::debug;

use crate::{
    error::{RenderError, Result},
    render::{
        cropping::VoxelCropping,
        image::RayCastImage,
        ray_info::{RayInfo, RaySetup},
        BlendMode, ComponentLayout,
    },
    shading::ShadingTables,
    space_leap::SpaceLeaper,
    transfer_function::{Interpolation, TransferFunctionTables},
    volumetric::{dispatch_scalars, GradientField, Scalar, Volume, MAX_COMPONENTS},
};

use self::{
    composite::CompositeKernel,
    layout::{FourDependent, Independent, Layout, LayoutTables, OneComponent, TwoDependent},
    mip::MipKernel,
    sampler::{FromSource, Identity, Nearest, Scaled, Trilinear, VoxelSource},
};

/// One fully specialized ray caster
pub(crate) trait RayKernel: Sync {
    /// Per-thread sampling state
    type Sampler;

    fn sampler(&self) -> Self::Sampler;

    /// Pixel of a single ray, premultiplied 15-bit RGBA
    fn cast(&self, sampler: &mut Self::Sampler, ray: &RayInfo) -> [u16; 4];
}

/// Resolved state of a render, shared read-only by all workers
pub(crate) struct KernelInputs<'a> {
    pub volume: &'a Volume,
    pub tables: &'a TransferFunctionTables,
    pub weights: [f32; MAX_COMPONENTS],
    pub layout: ComponentLayout,
    pub interpolation: Interpolation,
    pub blend: BlendMode,
    pub gradients: Option<&'a GradientField>,
    pub shading: Option<&'a ShadingTables>,
    pub leaper: Option<&'a SpaceLeaper>,
    pub cropping: Option<VoxelCropping>,
    pub gradient_opacity: bool,
    pub shade: bool,
    /// Remaining opacity threshold, `None` without early termination
    pub termination: Option<u32>,
    pub threads: usize,
}

/// Cast rows of one worker.
///
/// `rows` pairs an image row index with its pixels, only pixels in `columns` are cast.
pub(crate) fn generate_image<K: RayKernel>(
    thread_id: usize,
    thread_count: usize,
    kernel: &K,
    setup: &RaySetup,
    columns: Range<usize>,
    rows: Vec<(usize, &mut [u16])>,
) {
    debug!(
        "Worker {}/{} casting {} row(s)",
        thread_id + 1,
        thread_count,
        rows.len()
    );

    let mut sampler = kernel.sampler();
    for (y, row) in rows {
        for x in columns.clone() {
            let ray = match setup.ray(x, y) {
                Some(ray) => ray,
                None => continue,
            };
            let pixel = kernel.cast(&mut sampler, &ray);
            row[x * 4..x * 4 + 4].copy_from_slice(&pixel);
        }
    }
}

/// Split `pixels` into the rows of each worker, row `y` goes to worker `y % threads`.
///
/// Only rows in `rows` are handed out, each bucket is allocated once at its final size.
fn interleave_rows(
    pixels: &mut [u16],
    width: usize,
    rows: Range<usize>,
    threads: usize,
) -> Vec<Vec<(usize, &mut [u16])>> {
    let per_thread = rows.len() / threads + 1;
    let mut buckets: Vec<Vec<(usize, &mut [u16])>> = (0..threads)
        .map(|_| Vec::with_capacity(per_thread))
        .collect();
    if width == 0 {
        return buckets;
    }
    for (y, row) in pixels
        .chunks_mut(width * 4)
        .enumerate()
        .skip(rows.start)
        .take(rows.len())
    {
        buckets[y % threads].push((y, row));
    }
    buckets
}

/// Run `kernel` over the visible rows of `image` on `inputs.threads` workers
fn run_kernel<K: RayKernel>(
    kernel: &K,
    inputs: &KernelInputs,
    setup: &RaySetup,
    image: &mut RayCastImage,
) -> Result<()> {
    let threads = inputs.threads.max(1);
    let width = image.resolution().x;
    let (columns, row_range) = setup.pixel_range(inputs.volume.bound_box());
    let buckets = interleave_rows(image.pixels_mut(), width, row_range, threads);

    crossbeam::scope(|s| {
        for (thread_id, rows) in buckets.into_iter().enumerate() {
            let columns = columns.clone();
            s.spawn(move |_| generate_image(thread_id, threads, kernel, setup, columns, rows));
        }
    })
    .map_err(|_| RenderError::WorkerPanicked)
}

/// Pick the kernel for `inputs` and render into `image`
pub(crate) fn render(
    inputs: &KernelInputs,
    setup: &RaySetup,
    image: &mut RayCastImage,
) -> Result<()> {
    dispatch_scalars!(
        inputs.volume.data(),
        data => render_typed(inputs, data.as_slice(), setup, image),
        opaque => Err(RenderError::UnsupportedScalarType(inputs.volume.scalar_type()))
    )
}

fn render_typed<T: Scalar>(
    inputs: &KernelInputs,
    data: &[T],
    setup: &RaySetup,
    image: &mut RayCastImage,
) -> Result<()> {
    let source = VoxelSource::new(
        inputs.volume,
        data,
        inputs.tables.conversions(),
        inputs.gradients,
        inputs.shading,
    );

    let identity = inputs.tables.identity_conversion();
    match (inputs.interpolation, identity) {
        (Interpolation::Nearest, true) => {
            with_sampler::<T, Nearest<T, Identity>>(inputs, source, setup, image)
        }
        (Interpolation::Nearest, false) => {
            with_sampler::<T, Nearest<T, Scaled>>(inputs, source, setup, image)
        }
        (Interpolation::Linear, true) => {
            with_sampler::<T, Trilinear<T, Identity>>(inputs, source, setup, image)
        }
        (Interpolation::Linear, false) => {
            with_sampler::<T, Trilinear<T, Scaled>>(inputs, source, setup, image)
        }
    }
}

fn with_sampler<'a, T: Scalar, S: FromSource<'a, T>>(
    inputs: &KernelInputs<'a>,
    source: VoxelSource<'a, T>,
    setup: &RaySetup,
    image: &mut RayCastImage,
) -> Result<()> {
    match inputs.layout {
        ComponentLayout::OneSimple | ComponentLayout::One => {
            with_layout::<T, S, OneComponent>(inputs, source, setup, image)
        }
        ComponentLayout::TwoDependent => {
            with_layout::<T, S, TwoDependent>(inputs, source, setup, image)
        }
        ComponentLayout::FourDependent => {
            with_layout::<T, S, FourDependent>(inputs, source, setup, image)
        }
        ComponentLayout::Independent(_) => {
            with_layout::<T, S, Independent>(inputs, source, setup, image)
        }
    }
}

fn with_layout<'a, T: Scalar, S: FromSource<'a, T>, L: Layout>(
    inputs: &KernelInputs<'a>,
    source: VoxelSource<'a, T>,
    setup: &RaySetup,
    image: &mut RayCastImage,
) -> Result<()> {
    let tables = LayoutTables {
        sets: inputs.tables.tables(),
        weights: inputs.weights,
        components: inputs.volume.components(),
    };

    macro_rules! composite {
        ($go:literal, $shade:literal) => {
            run_kernel(
                &CompositeKernel::<T, S, L, $go, $shade>::new(
                    source,
                    tables,
                    inputs.leaper,
                    inputs.cropping,
                    inputs.termination,
                ),
                inputs,
                setup,
                image,
            )
        };
    }

    match inputs.blend {
        BlendMode::Composite => match (inputs.gradient_opacity, inputs.shade) {
            (false, false) => composite!(false, false),
            (true, false) => composite!(true, false),
            (false, true) => composite!(false, true),
            (true, true) => composite!(true, true),
        },
        BlendMode::MaximumIntensity | BlendMode::MinimumIntensity => {
            let flip = inputs.blend == BlendMode::MinimumIntensity;
            let kernel =
                MipKernel::<T, S, L>::new(source, tables, inputs.leaper, inputs.cropping, flip);
            run_kernel(&kernel, inputs, setup, image)
        }
    }
}
