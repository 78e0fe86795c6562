//! Lights and the per-direction shading lookup of the kernel.

use log::debug;
use nalgebra::Vector3;

use crate::{
    camera::PerspectiveCamera,
    color::{self, RGB},
    fixed_point,
    transfer_function::{ComponentProperty, VolumeProperty},
    volumetric::DirectionEncoder,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LightDirection {
    /// Shines along the view direction of the camera
    Headlight,
    /// Fixed world-space direction the light travels in
    Directional(Vector3<f32>),
}

/// Directional light source
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Light {
    pub direction: LightDirection,
    pub color: RGB,
    pub intensity: f32,
}

impl Light {
    /// White light attached to the camera
    pub fn headlight() -> Light {
        Light {
            direction: LightDirection::Headlight,
            color: color::white(),
            intensity: 1.0,
        }
    }

    /// Light travelling along `direction` in world space
    pub fn directional(direction: Vector3<f32>, color: RGB, intensity: f32) -> Light {
        Light {
            direction: LightDirection::Directional(direction),
            color,
            intensity,
        }
    }

    // Unit vector from the surface towards the light
    fn to_light(&self, camera: &PerspectiveCamera) -> Option<Vector3<f32>> {
        let travel = match self.direction {
            LightDirection::Headlight => camera.get_dir(),
            LightDirection::Directional(d) => d,
        };
        (-travel).try_normalize(f32::EPSILON)
    }
}

impl Default for Light {
    fn default() -> Self {
        Light::headlight()
    }
}

/// Diffuse and specular coefficients per encoded normal direction.
///
/// One table set per property component in use. Coefficients are 15-bit fractions
/// that may exceed 1.0 when several lights add up.
#[derive(Debug, Default)]
pub struct ShadingTables {
    directions: usize,
    diffuse: Vec<[u16; 3]>,
    specular: Vec<[u16; 3]>,
}

impl ShadingTables {
    pub fn new() -> ShadingTables {
        ShadingTables::default()
    }

    /// Recompute the tables of the first `sets` components of `property`.
    ///
    /// An empty light list falls back to a single headlight.
    pub fn update(
        &mut self,
        property: &VolumeProperty,
        sets: usize,
        lights: &[Light],
        camera: &PerspectiveCamera,
        encoder: &DirectionEncoder,
    ) {
        let headlight = [Light::headlight()];
        let lights = if lights.is_empty() { &headlight[..] } else { lights };

        let view = -camera.get_dir();
        let resolved: Vec<_> = lights
            .iter()
            .filter_map(|light| {
                let l = light.to_light(camera)?;
                let h = (l + view).try_normalize(f32::EPSILON).unwrap_or(l);
                Some((l, h, light.color * light.intensity))
            })
            .collect();

        self.directions = encoder.number_of_directions();
        self.diffuse.clear();
        self.specular.clear();

        for set in 0..sets {
            let component = property.component(set);
            for index in 0..self.directions {
                let (d, s) = shade_direction(
                    component,
                    &encoder.decode(index as u16),
                    index as u16 == encoder.zero_normal_index(),
                    &resolved,
                );
                self.diffuse.push(d);
                self.specular.push(s);
            }
        }

        debug!(
            "Shading tables updated, {} set(s), {} light(s)",
            sets,
            resolved.len()
        );
    }

    #[inline(always)]
    pub fn diffuse(&self, set: usize, direction: u16) -> [u16; 3] {
        self.diffuse[set * self.directions + direction as usize]
    }

    #[inline(always)]
    pub fn specular(&self, set: usize, direction: u16) -> [u16; 3] {
        self.specular[set * self.directions + direction as usize]
    }
}

fn shade_direction(
    component: &ComponentProperty,
    normal: &Vector3<f32>,
    zero_normal: bool,
    lights: &[(Vector3<f32>, Vector3<f32>, RGB)],
) -> ([u16; 3], [u16; 3]) {
    let mut diffuse = color::mono(component.ambient());
    let mut specular = color::black();

    for (l, h, light_color) in lights {
        if zero_normal {
            diffuse += light_color * component.diffuse();
            continue;
        }
        let n_dot_l = normal.dot(l);
        if n_dot_l > 0.0 {
            diffuse += light_color * (component.diffuse() * n_dot_l);
            let n_dot_h = normal.dot(h);
            if n_dot_h > 0.0 {
                let s = component.specular() * n_dot_h.powf(component.specular_power());
                specular += light_color * s;
            }
        }
    }

    (to_fixed(&diffuse), to_fixed(&specular))
}

fn to_fixed(c: &RGB) -> [u16; 3] {
    [
        fixed_point::from_f32_unclamped(c.x),
        fixed_point::from_f32_unclamped(c.y),
        fixed_point::from_f32_unclamped(c.z),
    ]
}
