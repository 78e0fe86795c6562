//! Component layouts: how the components of a sample turn into color and opacity.

use crate::{
    fixed_point::{mul_half_down, mul_up, ONE},
    transfer_function::ComponentTables,
    volumetric::MAX_COMPONENTS,
};

use super::sampler::Sampler;

/// Tables and weights the layouts read
pub(crate) struct LayoutTables<'a> {
    pub sets: &'a [ComponentTables],
    pub weights: [f32; MAX_COMPONENTS],
    pub components: usize,
}

pub(crate) trait Layout: 'static {
    /// Components are tracked separately by MIP
    const INDEPENDENT: bool;

    /// Premultiplied color and opacity of the loaded sample, `None` for zero opacity
    fn classify<S: Sampler, const GO: bool, const SHADE: bool>(
        sampler: &S,
        tables: &LayoutTables,
    ) -> Option<([u32; 3], u32)>;

    /// Pixel of a MIP ray from the table indices at its extreme
    fn mip_pixel(indices: &[u16; MAX_COMPONENTS], tables: &LayoutTables) -> [u16; 4];
}

/// Single component feeding color and opacity
pub(crate) struct OneComponent;

/// Component 0 feeds color, component 1 opacity
pub(crate) struct TwoDependent;

/// Unsigned char RGB in components 0 to 2, component 3 feeds opacity
pub(crate) struct FourDependent;

/// Every component has its own tables and weight
pub(crate) struct Independent;

// Rounded up, an opaque white sample stays white
#[inline(always)]
fn premultiply(color: [u16; 3], alpha: u32) -> [u32; 3] {
    color.map(|c| mul_up(c as u32, alpha))
}

#[inline(always)]
fn gradient_opacity(set: &ComponentTables, alpha: u32, magnitude: u8) -> u32 {
    match set.gradient_opacity_table() {
        Some(table) => mul_up(alpha, table[magnitude as usize] as u32),
        None => alpha,
    }
}

// Dependent components round ties down
#[inline(always)]
fn dependent_gradient_opacity(set: &ComponentTables, alpha: u32, magnitude: u8) -> u32 {
    match set.gradient_opacity_table() {
        Some(table) => mul_half_down(alpha, table[magnitude as usize] as u32),
        None => alpha,
    }
}

/// `c * diffuse + alpha * specular`, clamped to one
#[inline(always)]
fn shade(color: [u32; 3], alpha: u32, (diffuse, specular): ([u32; 3], [u32; 3])) -> [u32; 3] {
    let mut out = [0; 3];
    for k in 0..3 {
        let c = mul_up(color[k], diffuse[k]) + mul_up(alpha, specular[k]);
        out[k] = c.min(ONE);
    }
    out
}

#[inline(always)]
fn pixel(color: [u32; 3], alpha: u32) -> [u16; 4] {
    [
        color[0].min(ONE) as u16,
        color[1].min(ONE) as u16,
        color[2].min(ONE) as u16,
        alpha.min(ONE) as u16,
    ]
}

// Raw 8-bit color times a 15-bit opacity
#[inline(always)]
fn premultiply_raw(raw: [u16; 3], alpha: u32) -> [u32; 3] {
    raw.map(|c| (c as u32 * alpha + 0x7f) >> 8)
}

impl Layout for OneComponent {
    const INDEPENDENT: bool = false;

    #[inline(always)]
    fn classify<S: Sampler, const GO: bool, const SHADE: bool>(
        sampler: &S,
        tables: &LayoutTables,
    ) -> Option<([u32; 3], u32)> {
        let set = &tables.sets[0];
        let index = sampler.index(0);

        let mut alpha = set.opacity(index) as u32;
        if GO {
            alpha = gradient_opacity(set, alpha, sampler.magnitude(0));
        }
        if alpha == 0 {
            return None;
        }

        let mut color = premultiply(set.color(index), alpha);
        if SHADE {
            color = shade(color, alpha, sampler.shading(0, 0));
        }
        Some((color, alpha))
    }

    fn mip_pixel(indices: &[u16; MAX_COMPONENTS], tables: &LayoutTables) -> [u16; 4] {
        let set = &tables.sets[0];
        let alpha = set.opacity(indices[0]) as u32;
        pixel(premultiply(set.color(indices[0]), alpha), alpha)
    }
}

impl Layout for TwoDependent {
    const INDEPENDENT: bool = false;

    #[inline(always)]
    fn classify<S: Sampler, const GO: bool, const SHADE: bool>(
        sampler: &S,
        tables: &LayoutTables,
    ) -> Option<([u32; 3], u32)> {
        let set = &tables.sets[0];

        let mut alpha = set.opacity(sampler.index(1)) as u32;
        if GO {
            alpha = dependent_gradient_opacity(set, alpha, sampler.magnitude(0));
        }
        if alpha == 0 {
            return None;
        }

        let mut color = premultiply(set.color(sampler.index(0)), alpha);
        if SHADE {
            color = shade(color, alpha, sampler.shading(0, 0));
        }
        Some((color, alpha))
    }

    fn mip_pixel(indices: &[u16; MAX_COMPONENTS], tables: &LayoutTables) -> [u16; 4] {
        let set = &tables.sets[0];
        let alpha = set.opacity(indices[1]) as u32;
        pixel(premultiply(set.color(indices[0]), alpha), alpha)
    }
}

impl Layout for FourDependent {
    const INDEPENDENT: bool = false;

    #[inline(always)]
    fn classify<S: Sampler, const GO: bool, const SHADE: bool>(
        sampler: &S,
        tables: &LayoutTables,
    ) -> Option<([u32; 3], u32)> {
        let set = &tables.sets[0];

        let mut alpha = set.opacity(sampler.index(3)) as u32;
        if GO {
            alpha = dependent_gradient_opacity(set, alpha, sampler.magnitude(0));
        }
        if alpha == 0 {
            return None;
        }

        let raw = [sampler.index(0), sampler.index(1), sampler.index(2)];
        let mut color = premultiply_raw(raw, alpha);
        if SHADE {
            color = shade(color, alpha, sampler.shading(0, 0));
        }
        Some((color, alpha))
    }

    fn mip_pixel(indices: &[u16; MAX_COMPONENTS], tables: &LayoutTables) -> [u16; 4] {
        let alpha = tables.sets[0].opacity(indices[3]) as u32;
        let raw = [indices[0], indices[1], indices[2]];
        pixel(premultiply_raw(raw, alpha), alpha)
    }
}

impl Layout for Independent {
    const INDEPENDENT: bool = true;

    #[inline(always)]
    fn classify<S: Sampler, const GO: bool, const SHADE: bool>(
        sampler: &S,
        tables: &LayoutTables,
    ) -> Option<([u32; 3], u32)> {
        let mut indices = [0u16; MAX_COMPONENTS];
        let mut alphas = [0u32; MAX_COMPONENTS];
        let mut total = 0;

        for c in 0..tables.components {
            let set = &tables.sets[c];
            indices[c] = sampler.index(c);
            let mut alpha = (set.opacity(indices[c]) as f32 * tables.weights[c]) as u32;
            if GO {
                alpha = gradient_opacity(set, alpha, sampler.magnitude(c));
            }
            alphas[c] = alpha.min(ONE);
            total += alphas[c];
        }
        if total == 0 {
            return None;
        }

        let mut color = [0u32; 3];
        let mut alpha = 0;
        for c in 0..tables.components {
            let a = alphas[c];
            if a == 0 {
                continue;
            }
            let mut component_color = premultiply(tables.sets[c].color(indices[c]), a);
            if SHADE {
                component_color = shade(component_color, a, sampler.shading(c, c));
            }
            for k in 0..3 {
                color[k] += component_color[k];
            }
            alpha += a * a / total;
        }

        Some((color.map(|v| v.min(ONE)), alpha.min(ONE)))
    }

    fn mip_pixel(indices: &[u16; MAX_COMPONENTS], tables: &LayoutTables) -> [u16; 4] {
        let mut color = [0u32; 3];
        let mut alpha = 0;
        for c in 0..tables.components {
            let set = &tables.sets[c];
            let a = ((set.opacity(indices[c]) as f32 * tables.weights[c]) as u32).min(ONE);
            let component_color = premultiply(set.color(indices[c]), a);
            for k in 0..3 {
                color[k] += component_color[k];
            }
            alpha += a;
        }
        pixel(color, alpha)
    }
}

#[cfg(test)]
mod test {

    use nalgebra::vector;

    use super::*;
    use crate::{
        fixed_point::FixedPosition,
        render::BlendMode,
        transfer_function::{PiecewiseFunction, TransferFunctionTables, VolumeProperty},
        volumetric::Volume,
    };

    /// Sampler returning fixed indices
    struct Fixed {
        indices: [u16; 4],
        magnitude: u8,
    }

    impl Sampler for Fixed {
        type Mip = u16;

        fn load(&mut self, _pos: &FixedPosition) {}

        fn index(&self, component: usize) -> u16 {
            self.indices[component]
        }

        fn magnitude(&self, _channel: usize) -> u8 {
            self.magnitude
        }

        fn shading(&self, _set: usize, _channel: usize) -> ([u32; 3], [u32; 3]) {
            ([ONE / 2; 3], [0; 3])
        }

        fn mip_value(&self, component: usize) -> u16 {
            self.indices[component]
        }

        fn mip_index(&self, value: u16, _component: usize) -> u16 {
            value
        }
    }

    fn tables_for(components: usize, independent: bool) -> TransferFunctionTables {
        let volume = Volume::builder()
            .dims(vector![2, 1, 1])
            .components(components)
            .data(vec![0u8, 255].repeat(components))
            .build()
            .unwrap();
        let mut property = VolumeProperty::new();
        property.set_independent_components(independent);
        for c in 0..components {
            property
                .component_mut(c)
                .set_scalar_opacity(PiecewiseFunction::from_points(&[(0.0, 0.0), (255.0, 1.0)]));
        }
        property
            .component_mut(0)
            .set_gradient_opacity(Some(PiecewiseFunction::from_points(&[(0.0, 0.0), (1.0, 1.0)])));

        let mut tables = TransferFunctionTables::new();
        tables.update(&volume, &property, 1.0, BlendMode::MaximumIntensity);
        tables
    }

    fn layout_tables(tables: &TransferFunctionTables, components: usize) -> LayoutTables {
        LayoutTables {
            sets: tables.tables(),
            weights: [1.0; 4],
            components,
        }
    }

    #[test]
    fn zero_opacity_is_skipped() {
        let tables = tables_for(1, false);
        let lt = layout_tables(&tables, 1);
        let sampler = Fixed {
            indices: [0; 4],
            magnitude: 255,
        };
        assert!(OneComponent::classify::<_, false, false>(&sampler, &lt).is_none());
    }

    #[test]
    fn one_component_premultiplies() {
        let tables = tables_for(1, false);
        let lt = layout_tables(&tables, 1);
        let sampler = Fixed {
            indices: [255, 0, 0, 0],
            magnitude: 0,
        };

        let (color, alpha) = OneComponent::classify::<_, false, false>(&sampler, &lt).unwrap();
        assert_eq!(alpha, ONE);
        // Opaque white stays white
        assert_eq!(color, [ONE; 3]);

        // Zero gradient magnitude hides the sample
        assert!(OneComponent::classify::<_, true, false>(&sampler, &lt).is_none());

        let (shaded, _) = OneComponent::classify::<_, false, true>(&sampler, &lt).unwrap();
        assert_eq!(shaded, [ONE / 2; 3]);
    }

    #[test]
    fn two_dependent_splits_color_and_opacity() {
        let tables = tables_for(2, false);
        let lt = layout_tables(&tables, 2);
        let sample = |color: u16, opacity: u16, magnitude: u8| Fixed {
            indices: [color, opacity, 0, 0],
            magnitude,
        };

        // Bright but transparent
        assert!(TwoDependent::classify::<_, false, false>(&sample(255, 0, 0), &lt).is_none());

        let (color, alpha) =
            TwoDependent::classify::<_, false, false>(&sample(0, 255, 0), &lt).unwrap();
        assert_eq!((color, alpha), ([0; 3], ONE));

        let (color, alpha) =
            TwoDependent::classify::<_, false, false>(&sample(255, 255, 0), &lt).unwrap();
        assert_eq!((color, alpha), ([ONE; 3], ONE));

        // Gradient opacity of dependent data rounds ties down
        assert!(TwoDependent::classify::<_, true, false>(&sample(255, 255, 0), &lt).is_none());
        let (_, alpha) =
            TwoDependent::classify::<_, true, false>(&sample(255, 255, 255), &lt).unwrap();
        assert_eq!(alpha, ONE - 1);
        let (_, alpha) =
            OneComponent::classify::<_, true, false>(&sample(255, 0, 255), &lt).unwrap();
        assert_eq!(alpha, ONE);

        assert_eq!(TwoDependent::mip_pixel(&[255, 0, 0, 0], &lt), [0; 4]);
        assert_eq!(
            TwoDependent::mip_pixel(&[0, 255, 0, 0], &lt),
            [0, 0, 0, ONE as u16]
        );
        assert_eq!(TwoDependent::mip_pixel(&[255, 255, 0, 0], &lt), [ONE as u16; 4]);
    }

    #[test]
    fn four_dependent_uses_raw_color() {
        let tables = tables_for(4, false);
        let lt = layout_tables(&tables, 4);
        let sampler = Fixed {
            indices: [255, 0, 128, 255],
            magnitude: 0,
        };

        let (color, alpha) = FourDependent::classify::<_, false, false>(&sampler, &lt).unwrap();
        assert_eq!(alpha, ONE);
        assert_eq!(color, [(255 * ONE + 0x7f) >> 8, 0, (128 * ONE + 0x7f) >> 8]);
    }

    #[test]
    fn independent_blends_components() {
        let tables = tables_for(2, true);
        let lt = layout_tables(&tables, 2);

        let one_visible = Fixed {
            indices: [255, 0, 0, 0],
            magnitude: 0,
        };
        let (color, alpha) = Independent::classify::<_, false, false>(&one_visible, &lt).unwrap();
        assert_eq!(alpha, ONE);
        assert_eq!(color[0], ONE);

        let none_visible = Fixed {
            indices: [0; 4],
            magnitude: 0,
        };
        assert!(Independent::classify::<_, false, false>(&none_visible, &lt).is_none());

        let pixel = Independent::mip_pixel(&[255, 255, 0, 0], &lt);
        assert_eq!(pixel, [ONE as u16; 4]);
    }
}
