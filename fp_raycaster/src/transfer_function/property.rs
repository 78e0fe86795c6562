use crate::{common::TimeStamp, volumetric::MAX_COMPONENTS};

use super::{ColorTransferFunction, PiecewiseFunction};

/// Sampling of the voxel grid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interpolation {
    /// Value of the closest voxel
    Nearest,
    /// Trilinear blend of the 8 voxels around the sample
    Linear,
}

/// Appearance of one component (or of the whole voxel for dependent components).
#[derive(Debug, Clone)]
pub struct ComponentProperty {
    color: ColorTransferFunction,
    scalar_opacity: PiecewiseFunction,
    gradient_opacity: Option<PiecewiseFunction>,
    scalar_opacity_unit_distance: f32,
    weight: f32,
    ambient: f32,
    diffuse: f32,
    specular: f32,
    specular_power: f32,
    mtime: TimeStamp,
}

impl Default for ComponentProperty {
    fn default() -> Self {
        ComponentProperty {
            color: ColorTransferFunction::new(),
            scalar_opacity: PiecewiseFunction::new(),
            gradient_opacity: None,
            scalar_opacity_unit_distance: 1.0,
            weight: 1.0,
            ambient: 0.1,
            diffuse: 0.7,
            specular: 0.2,
            specular_power: 10.0,
            mtime: TimeStamp::now(),
        }
    }
}

impl ComponentProperty {
    pub fn color(&self) -> &ColorTransferFunction {
        &self.color
    }

    pub fn color_mut(&mut self) -> &mut ColorTransferFunction {
        &mut self.color
    }

    pub fn set_color(&mut self, color: ColorTransferFunction) {
        self.color = color;
        self.mtime.modified();
    }

    pub fn scalar_opacity(&self) -> &PiecewiseFunction {
        &self.scalar_opacity
    }

    pub fn scalar_opacity_mut(&mut self) -> &mut PiecewiseFunction {
        &mut self.scalar_opacity
    }

    pub fn set_scalar_opacity(&mut self, opacity: PiecewiseFunction) {
        self.scalar_opacity = opacity;
        self.mtime.modified();
    }

    /// `None` disables gradient opacity modulation
    pub fn gradient_opacity(&self) -> Option<&PiecewiseFunction> {
        self.gradient_opacity.as_ref()
    }

    pub fn gradient_opacity_mut(&mut self) -> Option<&mut PiecewiseFunction> {
        self.gradient_opacity.as_mut()
    }

    pub fn set_gradient_opacity(&mut self, gradient_opacity: Option<PiecewiseFunction>) {
        self.gradient_opacity = gradient_opacity;
        self.mtime.modified();
    }

    /// World distance over which the scalar opacity applies unchanged
    pub fn scalar_opacity_unit_distance(&self) -> f32 {
        self.scalar_opacity_unit_distance
    }

    pub fn set_scalar_opacity_unit_distance(&mut self, distance: f32) {
        self.scalar_opacity_unit_distance = distance;
        self.mtime.modified();
    }

    /// Blend weight of an independent component
    pub fn weight(&self) -> f32 {
        self.weight
    }

    /// Negative weights are clamped to zero
    pub fn set_weight(&mut self, weight: f32) {
        self.weight = weight.max(0.0);
        self.mtime.modified();
    }

    pub fn ambient(&self) -> f32 {
        self.ambient
    }

    pub fn diffuse(&self) -> f32 {
        self.diffuse
    }

    pub fn specular(&self) -> f32 {
        self.specular
    }

    pub fn specular_power(&self) -> f32 {
        self.specular_power
    }

    pub fn set_shading(&mut self, ambient: f32, diffuse: f32, specular: f32, specular_power: f32) {
        self.ambient = ambient;
        self.diffuse = diffuse;
        self.specular = specular;
        self.specular_power = specular_power;
        self.mtime.modified();
    }

    /// Newest stamp of the component and its functions
    pub fn mtime(&self) -> TimeStamp {
        let mut t = self.mtime.max(self.color.mtime());
        t = t.max(self.scalar_opacity.mtime());
        if let Some(go) = &self.gradient_opacity {
            t = t.max(go.mtime());
        }
        t
    }
}

/// Appearance of a volume.
///
/// Dependent data uses component 0 only, independent data one entry per component.
#[derive(Debug, Clone)]
pub struct VolumeProperty {
    components: [ComponentProperty; MAX_COMPONENTS],
    independent_components: bool,
    interpolation: Interpolation,
    shade: bool,
    mtime: TimeStamp,
}

impl Default for VolumeProperty {
    fn default() -> Self {
        VolumeProperty {
            components: Default::default(),
            independent_components: true,
            interpolation: Interpolation::Nearest,
            shade: false,
            mtime: TimeStamp::now(),
        }
    }
}

impl VolumeProperty {
    pub fn new() -> VolumeProperty {
        VolumeProperty::default()
    }

    /// Panics if `c >= MAX_COMPONENTS`
    pub fn component(&self, c: usize) -> &ComponentProperty {
        &self.components[c]
    }

    /// Panics if `c >= MAX_COMPONENTS`
    pub fn component_mut(&mut self, c: usize) -> &mut ComponentProperty {
        &mut self.components[c]
    }

    pub fn independent_components(&self) -> bool {
        self.independent_components
    }

    pub fn set_independent_components(&mut self, independent: bool) {
        self.independent_components = independent;
        self.mtime.modified();
    }

    pub fn interpolation(&self) -> Interpolation {
        self.interpolation
    }

    pub fn set_interpolation(&mut self, interpolation: Interpolation) {
        self.interpolation = interpolation;
        self.mtime.modified();
    }

    pub fn shade(&self) -> bool {
        self.shade
    }

    pub fn set_shade(&mut self, shade: bool) {
        self.shade = shade;
        self.mtime.modified();
    }

    /// Newest stamp of the property, its components and their functions
    pub fn mtime(&self) -> TimeStamp {
        self.components
            .iter()
            .map(ComponentProperty::mtime)
            .fold(self.mtime, TimeStamp::max)
    }
}
