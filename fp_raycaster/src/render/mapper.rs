use log::{debug, error};

use crate::{
    camera::PerspectiveCamera,
    error::{RenderError, Result},
    fixed_point::ONE,
    shading::{Light, ShadingTables},
    space_leap::{SpaceLeaper, TRILINEAR_MARGIN},
    transfer_function::{Interpolation, TransferFunctionTables, VolumeProperty},
    volumetric::{gradients, DirectionEncoder, GradientField, ScalarType, Volume, MAX_COMPONENTS},
};

use super::{
    image::{ImageBuffers, RayCastImage},
    kernel::{self, KernelInputs},
    ray_info::RaySetup,
    BlendMode, RenderOptions,
};

/// How the components of a volume map to color and opacity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentLayout {
    /// One component, raw values are table indices
    OneSimple,
    /// One component with a scaled index conversion
    One,
    /// Component 0 feeds color, component 1 opacity
    TwoDependent,
    /// Unsigned char RGB plus an opacity component
    FourDependent,
    /// Every component classified separately, the value is the component count
    Independent(usize),
}

impl ComponentLayout {
    /// Layout of `volume` rendered with `property`.
    ///
    /// Single components resolve to [`ComponentLayout::One`], see
    /// [`ComponentLayout::with_identity_conversion`].
    pub fn resolve(volume: &Volume, property: &VolumeProperty) -> Result<ComponentLayout> {
        let scalar_type = volume.scalar_type();
        if !scalar_type.is_supported() {
            return Err(RenderError::UnsupportedScalarType(scalar_type));
        }

        let components = volume.components();
        if components > MAX_COMPONENTS {
            return Err(RenderError::TooManyComponents(components));
        }

        if components == 1 {
            return Ok(ComponentLayout::One);
        }
        if property.independent_components() {
            return Ok(ComponentLayout::Independent(components));
        }

        match components {
            2 => Ok(ComponentLayout::TwoDependent),
            3 => Err(RenderError::ThreeComponentDependent),
            _ if scalar_type == ScalarType::U8 => Ok(ComponentLayout::FourDependent),
            _ => Err(RenderError::FourComponentDependentType(scalar_type)),
        }
    }

    /// Use the simple single component path when raw values are indices
    pub fn with_identity_conversion(self, identity: bool) -> ComponentLayout {
        match self {
            ComponentLayout::One if identity => ComponentLayout::OneSimple,
            other => other,
        }
    }

    pub fn is_independent(&self) -> bool {
        matches!(self, ComponentLayout::Independent(_))
    }
}

/// Fixed-point ray-cast volume mapper.
///
/// Owns every structure derived from the volume and its property and rebuilds them
/// only when their inputs changed. A failed render leaves the previous image in place.
///
/// # Example
///
/// ```
/// use fp_raycaster::{
///     camera::PerspectiveCamera,
///     render::{FixedPointRayCastMapper, RenderOptions},
///     transfer_function::VolumeProperty,
///     volumetric::Volume,
/// };
/// use nalgebra::{point, vector};
///
/// let volume = Volume::builder()
///     .dims(vector![4, 4, 4])
///     .data(vec![128u8; 64])
///     .build()
///     .unwrap();
/// let camera = PerspectiveCamera::look_at(point![1.5, 1.5, 20.0], point![1.5, 1.5, 1.5]);
/// let options = RenderOptions::builder()
///     .resolution(vector![32, 32])
///     .build()
///     .unwrap();
///
/// let mut mapper = FixedPointRayCastMapper::new(options);
/// let image = mapper
///     .render(&volume, &VolumeProperty::new(), &camera, &[])
///     .unwrap();
/// assert_eq!(image.resolution(), vector![32, 32]);
/// ```
#[derive(Debug)]
pub struct FixedPointRayCastMapper {
    options: RenderOptions,
    tables: TransferFunctionTables,
    gradients: Option<GradientField>,
    encoder: DirectionEncoder,
    shading: ShadingTables,
    leaper: SpaceLeaper,
    images: ImageBuffers,
    layout: Option<ComponentLayout>,
}

impl FixedPointRayCastMapper {
    pub fn new(options: RenderOptions) -> FixedPointRayCastMapper {
        let images = ImageBuffers::new(options.resolution);
        FixedPointRayCastMapper {
            options,
            tables: TransferFunctionTables::new(),
            gradients: None,
            encoder: DirectionEncoder::new(),
            shading: ShadingTables::new(),
            leaper: SpaceLeaper::new(),
            images,
            layout: None,
        }
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    pub fn set_options(&mut self, options: RenderOptions) {
        self.options = options;
    }

    pub fn tables(&self) -> &TransferFunctionTables {
        &self.tables
    }

    /// Last successfully rendered image
    pub fn image(&self) -> &RayCastImage {
        self.images.front()
    }

    /// Gradient field of the last render that needed one
    pub fn gradients(&self) -> Option<&GradientField> {
        self.gradients.as_ref()
    }

    pub fn space_leaper(&self) -> &SpaceLeaper {
        &self.leaper
    }

    /// Layout of the last successful render
    pub fn layout(&self) -> Option<ComponentLayout> {
        self.layout
    }

    /// Render `volume` as seen by `camera`.
    ///
    /// An empty `lights` list shades with a headlight. Configuration errors are
    /// reported before any table is built or the image is touched.
    pub fn render(
        &mut self,
        volume: &Volume,
        property: &VolumeProperty,
        camera: &PerspectiveCamera,
        lights: &[Light],
    ) -> Result<&RayCastImage> {
        if let Err(e) = self.options.validate() {
            error!("Render skipped: {}", e);
            return Err(e);
        }
        let layout = match ComponentLayout::resolve(volume, property) {
            Ok(layout) => layout,
            Err(e) => {
                error!("Render skipped: {}", e);
                return Err(e);
            }
        };

        let options = self.options.clone();
        let blend = options.blend_mode;
        self.tables
            .update(volume, property, options.sample_distance, blend);
        let layout = layout.with_identity_conversion(self.tables.identity_conversion());

        let composite = blend == BlendMode::Composite;
        let gradient_opacity = composite && self.tables.gradient_opacity_enabled();
        let shade = composite && property.shade();
        let interpolation = property.interpolation();

        if gradient_opacity || shade {
            self.update_gradients(volume, layout.is_independent())?;
        }
        let gradients = if gradient_opacity || shade {
            self.gradients.as_ref()
        } else {
            None
        };

        if shade {
            self.shading.update(
                property,
                self.tables.tables().len(),
                lights,
                camera,
                &self.encoder,
            );
        }

        let leaper = if options.empty_space_skipping {
            self.leaper
                .update(volume, self.tables.conversions(), gradients);
            self.leaper.set_margin(match interpolation {
                Interpolation::Nearest => 0,
                Interpolation::Linear => TRILINEAR_MARGIN,
            });
            if composite {
                self.leaper.update_flags(&self.tables);
            }
            Some(&self.leaper)
        } else {
            None
        };

        // Nearest sampling rounds through a half voxel bias
        let bias = match interpolation {
            Interpolation::Nearest => 0.5,
            Interpolation::Linear => 0.0,
        };
        let cropping = options
            .cropping
            .map(|c| c.to_voxel_space(&volume.origin(), &volume.spacing(), bias));

        let mut weights = [1.0; MAX_COMPONENTS];
        for (c, w) in weights.iter_mut().enumerate() {
            *w = property.component(c).weight();
        }

        let inputs = KernelInputs {
            volume,
            tables: &self.tables,
            weights,
            layout,
            interpolation,
            blend,
            gradients,
            shading: if shade { Some(&self.shading) } else { None },
            leaper,
            cropping,
            gradient_opacity,
            shade,
            termination: options
                .early_ray_termination
                .then(|| (options.termination_threshold as u32).min(ONE)),
            threads: options.threads,
        };

        debug!(
            "Rendering {:?} layout, {:?} interpolation, {:?}, gradient opacity {}, shading {}",
            layout, interpolation, blend, gradient_opacity, shade
        );

        let setup = RaySetup::new(
            camera,
            volume,
            options.resolution,
            options.sample_distance,
            bias,
        );
        let image = self
            .images
            .draw(options.resolution, |image| kernel::render(&inputs, &setup, image))?;

        self.layout = Some(layout);
        Ok(image)
    }

    // Gradients follow the volume and the channel layout
    fn update_gradients(&mut self, volume: &Volume, independent: bool) -> Result<()> {
        let channels = gradients::channel_count(volume.components(), independent);
        let stale = match &self.gradients {
            Some(g) => {
                volume.mtime() > g.build_time()
                    || g.channels() != channels
                    || g.independent() != independent
            }
            None => true,
        };
        if stale {
            self.gradients = Some(GradientField::compute(
                volume,
                independent,
                &self.encoder,
                self.options.threads,
            )?);
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {

    use nalgebra::vector;

    use super::*;

    fn volume<T>(components: usize, data: Vec<T>) -> Volume
    where
        Vec<T>: Into<crate::volumetric::ScalarData>,
    {
        Volume::builder()
            .dims(vector![2, 1, 1])
            .components(components)
            .data(data)
            .build()
            .unwrap()
    }

    #[test]
    fn layouts() {
        let mut property = VolumeProperty::new();

        let one = volume(1, vec![0u8, 1]);
        assert_eq!(ComponentLayout::resolve(&one, &property), Ok(ComponentLayout::One));
        assert_eq!(
            ComponentLayout::One.with_identity_conversion(true),
            ComponentLayout::OneSimple
        );

        let two = volume(2, vec![0u16; 4]);
        assert_eq!(
            ComponentLayout::resolve(&two, &property),
            Ok(ComponentLayout::Independent(2))
        );

        property.set_independent_components(false);
        assert_eq!(
            ComponentLayout::resolve(&two, &property),
            Ok(ComponentLayout::TwoDependent)
        );

        let three = volume(3, vec![0u8; 6]);
        assert_eq!(
            ComponentLayout::resolve(&three, &property),
            Err(RenderError::ThreeComponentDependent)
        );

        let four = volume(4, vec![0u8; 8]);
        assert_eq!(
            ComponentLayout::resolve(&four, &property),
            Ok(ComponentLayout::FourDependent)
        );

        let four_float = volume(4, vec![0.0f32; 8]);
        assert_eq!(
            ComponentLayout::resolve(&four_float, &property),
            Err(RenderError::FourComponentDependentType(ScalarType::F32))
        );
    }

    #[test]
    fn unsupported_type_is_rejected_first() {
        let volume = Volume::builder()
            .dims(vector![2, 1, 1])
            .components(3)
            .data(crate::volumetric::ScalarData::Opaque {
                scalar_type: ScalarType::Bit,
                values: 6,
                bytes: vec![0],
            })
            .build()
            .unwrap();
        let mut property = VolumeProperty::new();
        property.set_independent_components(false);

        assert_eq!(
            ComponentLayout::resolve(&volume, &property),
            Err(RenderError::UnsupportedScalarType(ScalarType::Bit))
        );
    }
}
