//! Dense fixed-point lookup tables sampled from the transfer functions.
//!
//! Raw samples are mapped to table indices by [`ScalarConversion`], the tables hold
//! colors and opacities as 15-bit fractions. Tables are rebuilt only when the property,
//! the volume or the render settings they depend on change.

use log::info;

use crate::{
    color,
    common::{TimeStamp, ValueRange},
    fixed_point,
    render::BlendMode,
    volumetric::{gradients, ScalarType, Volume, GRADIENT_TABLE_SIZE},
};

use super::{ComponentProperty, VolumeProperty};

/// Upper bound of a scalar table size
pub const MAX_TABLE_SIZE: usize = 32768;

/// Mapping of raw sample values to table indices, `index = (raw + shift) * scale`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScalarConversion {
    shift: f64,
    scale: f64,
    table_size: usize,
}

impl ScalarConversion {
    /// Conversion for a component of `scalar_type` with values in `range`
    pub fn new(scalar_type: ScalarType, range: &ValueRange) -> ScalarConversion {
        match scalar_type {
            ScalarType::U8 => ScalarConversion {
                shift: 0.0,
                scale: 1.0,
                table_size: 256,
            },
            ScalarType::I8 => ScalarConversion {
                shift: 128.0,
                scale: 1.0,
                table_size: 256,
            },
            _ if range.is_empty() => ScalarConversion {
                shift: 0.0,
                scale: 1.0,
                table_size: 1,
            },
            t if t.is_float() => {
                let width = range.width();
                let scale = if width > 0.0 {
                    (MAX_TABLE_SIZE - 1) as f64 / width
                } else {
                    1.0
                };
                ScalarConversion {
                    shift: -range.low,
                    scale,
                    table_size: MAX_TABLE_SIZE,
                }
            }
            _ => {
                let width = range.width();
                if width < MAX_TABLE_SIZE as f64 {
                    ScalarConversion {
                        shift: -range.low,
                        scale: 1.0,
                        table_size: width as usize + 1,
                    }
                } else {
                    ScalarConversion {
                        shift: -range.low,
                        scale: (MAX_TABLE_SIZE - 1) as f64 / width,
                        table_size: MAX_TABLE_SIZE,
                    }
                }
            }
        }
    }

    pub fn shift(&self) -> f64 {
        self.shift
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn table_size(&self) -> usize {
        self.table_size
    }

    /// Raw values are table indices already
    pub fn is_identity(&self) -> bool {
        self.shift == 0.0 && self.scale == 1.0
    }

    /// Table index of a raw value, clamped to the table
    #[inline(always)]
    pub fn index(&self, raw: f64) -> u16 {
        let v = (raw + self.shift) * self.scale;
        // NaN fails both comparisons and ends at zero
        let max = (self.table_size - 1) as f64;
        if v >= max {
            max as u16
        } else if v > 0.0 {
            v as u16
        } else {
            0
        }
    }

    /// Scalar value a table entry represents
    pub fn value_of_index(&self, index: usize) -> f64 {
        index as f64 / self.scale - self.shift
    }
}

/// Lookup tables of one property component.
///
/// For dependent data a single set exists, color is indexed through component 0 and
/// opacity through the last component.
#[derive(Debug, Clone)]
pub struct ComponentTables {
    color_component: usize,
    opacity_component: usize,
    /// RGB triplets
    color: Vec<u16>,
    scalar_opacity: Vec<u16>,
    gradient_opacity: Option<Vec<u16>>,
    /// Count of nonzero opacity entries before each index
    opacity_prefix: Vec<u32>,
    gradient_prefix: Option<Vec<u32>>,
}

impl ComponentTables {
    #[allow(clippy::too_many_arguments)]
    fn build(
        property: &ComponentProperty,
        color_component: usize,
        opacity_component: usize,
        color_conversion: &ScalarConversion,
        opacity_conversion: &ScalarConversion,
        color_range: &ValueRange,
        opacity_correction: Option<f64>,
        gradient_scale: f32,
    ) -> ComponentTables {
        let color_fn = property.color();
        let color_size = color_conversion.table_size();
        let mut color = Vec::with_capacity(color_size * 3);
        for i in 0..color_size {
            let x = color_conversion.value_of_index(i);
            let rgb = color_fn
                .color(x)
                .unwrap_or_else(|| gray_ramp(x, color_range));
            color.extend(rgb.iter().map(|&c| fixed_point::from_f32(c)));
        }

        let opacity_fn = property.scalar_opacity();
        let scalar_opacity: Vec<u16> = (0..opacity_conversion.table_size())
            .map(|i| {
                let x = opacity_conversion.value_of_index(i);
                let mut a = opacity_fn.value(x).unwrap_or(1.0).clamp(0.0, 1.0);
                if let Some(exponent) = opacity_correction {
                    a = 1.0 - (1.0 - a).powf(exponent);
                }
                fixed_point::from_f32(a as f32)
            })
            .collect();

        let gradient_opacity = property.gradient_opacity().map(|go| {
            (0..GRADIENT_TABLE_SIZE)
                .map(|i| {
                    let magnitude = i as f64 / gradient_scale as f64;
                    let a = go.value(magnitude).unwrap_or(1.0).clamp(0.0, 1.0);
                    fixed_point::from_f32(a as f32)
                })
                .collect::<Vec<_>>()
        });

        let opacity_prefix = prefix_counts(&scalar_opacity);
        let gradient_prefix = gradient_opacity.as_deref().map(prefix_counts);

        ComponentTables {
            color_component,
            opacity_component,
            color,
            scalar_opacity,
            gradient_opacity,
            opacity_prefix,
            gradient_prefix,
        }
    }

    /// Data component indexing the color table
    pub fn color_component(&self) -> usize {
        self.color_component
    }

    /// Data component indexing the opacity table
    pub fn opacity_component(&self) -> usize {
        self.opacity_component
    }

    #[inline(always)]
    pub fn color(&self, index: u16) -> [u16; 3] {
        let i = index as usize * 3;
        [self.color[i], self.color[i + 1], self.color[i + 2]]
    }

    #[inline(always)]
    pub fn opacity(&self, index: u16) -> u16 {
        self.scalar_opacity[index as usize]
    }

    pub fn color_table(&self) -> &[u16] {
        &self.color
    }

    pub fn opacity_table(&self) -> &[u16] {
        &self.scalar_opacity
    }

    /// `None` when gradient opacity is disabled for this component
    pub fn gradient_opacity_table(&self) -> Option<&[u16]> {
        self.gradient_opacity.as_deref()
    }

    /// Whether any index in `lo..=hi` has nonzero opacity
    pub fn any_opacity(&self, lo: u16, hi: u16) -> bool {
        let last = self.scalar_opacity.len() - 1;
        let lo = (lo as usize).min(last);
        let hi = (hi as usize).min(last);
        lo <= hi && self.opacity_prefix[hi + 1] > self.opacity_prefix[lo]
    }

    /// Whether any magnitude in `0..=max_magnitude` has nonzero gradient opacity.
    /// Always `true` without a gradient opacity table.
    pub fn any_gradient_opacity(&self, max_magnitude: u8) -> bool {
        match &self.gradient_prefix {
            Some(prefix) => prefix[max_magnitude as usize + 1] > 0,
            None => true,
        }
    }
}

fn prefix_counts(table: &[u16]) -> Vec<u32> {
    let mut prefix = Vec::with_capacity(table.len() + 1);
    let mut count = 0;
    prefix.push(0);
    for &v in table {
        count += (v > 0) as u32;
        prefix.push(count);
    }
    prefix
}

// Black at the minimum of the range, white at the maximum
fn gray_ramp(x: f64, range: &ValueRange) -> color::RGB {
    let width = range.width();
    if width > 0.0 {
        color::mono(((x - range.low) / width).clamp(0.0, 1.0) as f32)
    } else {
        color::white()
    }
}

#[derive(Debug, Clone, PartialEq)]
struct TableKey {
    volume_mtime: TimeStamp,
    scalar_type: ScalarType,
    components: usize,
    independent: bool,
    sample_distance: f32,
    blend: BlendMode,
}

/// Memoized lookup tables of a volume and its property
#[derive(Debug, Default)]
pub struct TransferFunctionTables {
    conversions: Vec<ScalarConversion>,
    tables: Vec<ComponentTables>,
    key: Option<TableKey>,
    build_time: Option<TimeStamp>,
    rebuild_count: usize,
}

impl TransferFunctionTables {
    pub fn new() -> TransferFunctionTables {
        TransferFunctionTables::default()
    }

    /// Rebuild the tables if `property`, `volume` or the render settings changed
    /// since the last build. Returns `true` when a rebuild happened.
    ///
    /// The volume must have passed render validation.
    pub fn update(
        &mut self,
        volume: &Volume,
        property: &VolumeProperty,
        sample_distance: f32,
        blend: BlendMode,
    ) -> bool {
        let key = TableKey {
            volume_mtime: volume.mtime(),
            scalar_type: volume.scalar_type(),
            components: volume.components(),
            independent: property.independent_components(),
            sample_distance,
            blend,
        };

        let fresh = match (&self.key, self.build_time) {
            (Some(old), Some(built)) => *old == key && property.mtime() < built,
            _ => false,
        };
        if fresh {
            return false;
        }

        self.build(volume, property, &key);
        self.key = Some(key);
        self.build_time = Some(TimeStamp::now());
        self.rebuild_count += 1;

        info!(
            "Transfer function tables rebuilt ({} table set(s), rebuild #{})",
            self.tables.len(),
            self.rebuild_count
        );
        true
    }

    fn build(&mut self, volume: &Volume, property: &VolumeProperty, key: &TableKey) {
        let components = volume.components();
        let independent = key.independent && components > 1;

        self.conversions = (0..components)
            .map(|c| ScalarConversion::new(key.scalar_type, &volume.component_range(c)))
            .collect();

        let set_count = gradients::channel_count(components, independent);
        self.tables = (0..set_count)
            .map(|t| {
                let component = property.component(t);
                let (color_c, opacity_c) = if independent {
                    (t, t)
                } else {
                    (0, components - 1)
                };
                let correction = match key.blend {
                    BlendMode::Composite => {
                        let unit = component.scalar_opacity_unit_distance();
                        if unit > 0.0 {
                            Some(key.sample_distance as f64 / unit as f64)
                        } else {
                            None
                        }
                    }
                    _ => None,
                };
                let gradient_scale =
                    gradients::magnitude_scale(&volume.component_range(opacity_c));

                ComponentTables::build(
                    component,
                    color_c,
                    opacity_c,
                    &self.conversions[color_c],
                    &self.conversions[opacity_c],
                    &volume.component_range(color_c),
                    correction,
                    gradient_scale,
                )
            })
            .collect();
    }

    /// Conversion of every data component
    pub fn conversions(&self) -> &[ScalarConversion] {
        &self.conversions
    }

    /// Whether every component converts through the identity
    pub fn identity_conversion(&self) -> bool {
        self.conversions.iter().all(ScalarConversion::is_identity)
    }

    /// Table sets, one for dependent data, one per component for independent data
    pub fn tables(&self) -> &[ComponentTables] {
        &self.tables
    }

    /// Whether any table set modulates opacity by gradient magnitude
    pub fn gradient_opacity_enabled(&self) -> bool {
        self.tables
            .iter()
            .any(|t| t.gradient_opacity_table().is_some())
    }

    /// Number of rebuilds so far
    pub fn rebuild_count(&self) -> usize {
        self.rebuild_count
    }

    pub fn build_time(&self) -> Option<TimeStamp> {
        self.build_time
    }
}
