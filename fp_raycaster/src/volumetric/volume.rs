use nalgebra::{point, vector, Point3, Vector3};

use crate::{
    common::{BoundBox, TimeStamp, ValueRange},
    error::VolumeError,
};

use super::{dispatch_scalars, Scalar, ScalarData, ScalarType};

/// Maximum number of components per voxel
pub const MAX_COMPONENTS: usize = 4;

/// Regular grid of voxels, each with 1 to 4 components.
///
/// Memory layout: component fastest, then x, then y, then z.
/// Voxel `[0,0,0]` sits at `origin`, neighbouring voxels are `spacing` apart.
#[derive(Debug, Clone)]
pub struct Volume {
    dims: Vector3<usize>,
    spacing: Vector3<f32>,
    origin: Point3<f32>,
    components: usize,
    data: ScalarData,
    ranges: Vec<ValueRange>,
    mtime: TimeStamp,
}

impl Volume {
    pub fn builder() -> VolumeBuilder {
        VolumeBuilder::default()
    }

    pub fn dims(&self) -> Vector3<usize> {
        self.dims
    }

    pub fn spacing(&self) -> Vector3<f32> {
        self.spacing
    }

    pub fn origin(&self) -> Point3<f32> {
        self.origin
    }

    pub fn components(&self) -> usize {
        self.components
    }

    pub fn scalar_type(&self) -> ScalarType {
        self.data.scalar_type()
    }

    pub fn data(&self) -> &ScalarData {
        &self.data
    }

    /// Last modification of data or geometry
    pub fn mtime(&self) -> TimeStamp {
        self.mtime
    }

    /// Range of values of component `c`, empty for opaque payloads
    pub fn component_range(&self, c: usize) -> ValueRange {
        self.ranges.get(c).copied().unwrap_or_default()
    }

    /// Number of voxels
    pub fn voxel_count(&self) -> usize {
        self.dims.iter().product()
    }

    /// Element strides of x, y and z steps
    pub fn increments(&self) -> [usize; 3] {
        let c = self.components;
        [c, c * self.dims.x, c * self.dims.x * self.dims.y]
    }

    /// Linear index of a voxel, not counting components
    pub fn voxel_index(&self, x: usize, y: usize, z: usize) -> usize {
        x + self.dims.x * (y + self.dims.y * z)
    }

    /// Value of component `c` at voxel `[x,y,z]`
    pub fn value(&self, x: usize, y: usize, z: usize, c: usize) -> Option<f64> {
        if x >= self.dims.x || y >= self.dims.y || z >= self.dims.z || c >= self.components {
            return None;
        }
        self.data
            .value_f64(self.voxel_index(x, y, z) * self.components + c)
    }

    /// World-space box spanned by voxel centers
    pub fn bound_box(&self) -> BoundBox {
        let extent = (self.dims - vector![1, 1, 1])
            .cast::<f32>()
            .component_mul(&self.spacing);
        BoundBox::from_position_dims(self.origin, extent)
    }

    pub fn set_origin(&mut self, origin: Point3<f32>) {
        self.origin = origin;
        self.mtime.modified();
    }

    /// Non-positive spacing is rejected
    pub fn set_spacing(&mut self, spacing: Vector3<f32>) -> Result<(), VolumeError> {
        if spacing.iter().any(|&s| !(s > 0.0)) {
            return Err(VolumeError::InvalidSpacing);
        }
        self.spacing = spacing;
        self.mtime.modified();
        Ok(())
    }

    /// Replace all samples, the scalar type may change.
    /// Ranges and modification stamp are refreshed.
    pub fn replace_data(&mut self, data: impl Into<ScalarData>) -> Result<(), VolumeError> {
        let data = data.into();
        let expected = self.voxel_count() * self.components;
        if data.len() != expected {
            return Err(VolumeError::SizeMismatch {
                expected,
                actual: data.len(),
            });
        }
        self.ranges = component_ranges(&data, self.components);
        self.data = data;
        self.mtime.modified();
        Ok(())
    }
}

fn typed_ranges<T: Scalar>(data: &[T], components: usize) -> Vec<ValueRange> {
    let mut ranges = vec![ValueRange::empty(); components];
    for voxel in data.chunks_exact(components) {
        for (range, &value) in ranges.iter_mut().zip(voxel) {
            range.extend(value.to_f64());
        }
    }
    ranges
}

fn component_ranges(data: &ScalarData, components: usize) -> Vec<ValueRange> {
    dispatch_scalars!(data, v => typed_ranges(v, components), opaque => vec![ValueRange::empty(); components])
}

/// Assembles a [`Volume`]
///
/// Spacing defaults to 1 in every axis, origin to the world origin and
/// component count to 1.
#[derive(Debug, Default)]
pub struct VolumeBuilder {
    dims: Option<Vector3<usize>>,
    spacing: Option<Vector3<f32>>,
    origin: Option<Point3<f32>>,
    components: Option<usize>,
    data: Option<ScalarData>,
}

impl VolumeBuilder {
    pub fn dims(mut self, dims: Vector3<usize>) -> Self {
        self.dims = Some(dims);
        self
    }

    pub fn spacing(mut self, spacing: Vector3<f32>) -> Self {
        self.spacing = Some(spacing);
        self
    }

    pub fn origin(mut self, origin: Point3<f32>) -> Self {
        self.origin = Some(origin);
        self
    }

    pub fn components(mut self, components: usize) -> Self {
        self.components = Some(components);
        self
    }

    pub fn data(mut self, data: impl Into<ScalarData>) -> Self {
        self.data = Some(data.into());
        self
    }

    pub fn build(self) -> Result<Volume, VolumeError> {
        let dims = self.dims.ok_or(VolumeError::DegenerateDimensions)?;
        if dims.iter().any(|&d| d == 0) {
            return Err(VolumeError::DegenerateDimensions);
        }

        let spacing = self.spacing.unwrap_or_else(|| vector![1.0, 1.0, 1.0]);
        if spacing.iter().any(|&s| !(s > 0.0)) {
            return Err(VolumeError::InvalidSpacing);
        }

        let components = self.components.unwrap_or(1);
        if components == 0 || components > MAX_COMPONENTS {
            return Err(VolumeError::ComponentCount(components));
        }

        let data = self.data.ok_or(VolumeError::MissingData)?;
        let expected = dims.iter().product::<usize>() * components;
        if data.len() != expected {
            return Err(VolumeError::SizeMismatch {
                expected,
                actual: data.len(),
            });
        }

        let ranges = component_ranges(&data, components);

        Ok(Volume {
            dims,
            spacing,
            origin: self.origin.unwrap_or_else(|| point![0.0, 0.0, 0.0]),
            components,
            data,
            ranges,
            mtime: TimeStamp::now(),
        })
    }
}
