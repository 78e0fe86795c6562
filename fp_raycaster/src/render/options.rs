use nalgebra::{vector, Vector2};

use crate::{error::RenderError, fixed_point::DEFAULT_TERMINATION};

use super::Cropping;

/// How samples along a ray are combined
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendMode {
    /// Front-to-back alpha compositing
    Composite,
    /// Maximum intensity projection
    MaximumIntensity,
    /// Minimum intensity projection
    MinimumIntensity,
}

/// Settings of one render
#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub resolution: Vector2<usize>,
    /// Distance between samples along a ray, world units
    pub sample_distance: f32,
    pub blend_mode: BlendMode,
    pub early_ray_termination: bool,
    /// Rays stop once the remaining opacity drops below this value
    pub termination_threshold: u16,
    pub empty_space_skipping: bool,
    pub cropping: Option<Cropping>,
    /// Worker thread count
    pub threads: usize,
}

impl RenderOptions {
    pub fn builder() -> RenderOptionsBuilder {
        RenderOptionsBuilder::new()
    }

    pub fn validate(&self) -> Result<(), RenderError> {
        if self.resolution.x == 0 || self.resolution.y == 0 {
            return Err(RenderError::InvalidOptions("resolution must not be zero"));
        }
        if !(self.sample_distance > 0.0) || !self.sample_distance.is_finite() {
            return Err(RenderError::InvalidOptions("sample distance must be positive"));
        }
        if self.threads == 0 {
            return Err(RenderError::InvalidOptions("thread count must not be zero"));
        }
        Ok(())
    }
}

impl Default for RenderOptions {
    fn default() -> Self {
        RenderOptions {
            resolution: vector![512, 512],
            sample_distance: 1.0,
            blend_mode: BlendMode::Composite,
            early_ray_termination: true,
            termination_threshold: DEFAULT_TERMINATION,
            empty_space_skipping: true,
            cropping: None,
            threads: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
        }
    }
}

pub struct RenderOptionsBuilder {
    options: RenderOptions,
}

impl RenderOptionsBuilder {
    pub fn new() -> Self {
        Self {
            options: RenderOptions::default(),
        }
    }

    pub fn resolution(mut self, resolution: Vector2<usize>) -> Self {
        self.options.resolution = resolution;
        self
    }

    pub fn sample_distance(mut self, distance: f32) -> Self {
        self.options.sample_distance = distance;
        self
    }

    pub fn blend_mode(mut self, mode: BlendMode) -> Self {
        self.options.blend_mode = mode;
        self
    }

    pub fn early_ray_termination(mut self, enabled: bool) -> Self {
        self.options.early_ray_termination = enabled;
        self
    }

    pub fn termination_threshold(mut self, threshold: u16) -> Self {
        self.options.termination_threshold = threshold;
        self
    }

    pub fn empty_space_skipping(mut self, enabled: bool) -> Self {
        self.options.empty_space_skipping = enabled;
        self
    }

    pub fn cropping(mut self, cropping: Cropping) -> Self {
        self.options.cropping = Some(cropping);
        self
    }

    pub fn threads(mut self, threads: usize) -> Self {
        self.options.threads = threads;
        self
    }

    /// Validated options
    pub fn build(self) -> Result<RenderOptions, RenderError> {
        self.options.validate()?;
        Ok(self.options)
    }

    /// Options without validation, the mapper still validates before rendering
    pub fn build_unchecked(self) -> RenderOptions {
        self.options
    }
}

impl Default for RenderOptionsBuilder {
    fn default() -> Self {
        Self::new()
    }
}
