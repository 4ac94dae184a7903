//! The filter pipeline executor.
//!
//! A [`Pipeline`] holds the fixed parameters of every stage and walks
//! them in a fixed order:
//!
//! ```text
//! gaussian blur -> reflected tile? -> bloom? -> gloom? -> pixellate? -> crop
//! ```
//!
//! The blur always runs. Each `?` stage runs only when its gate in the
//! [`FilterConfig`] is on; otherwise the working image passes through
//! untouched. The final crop always targets the extent of the image the
//! run started from, never the grown working extent.
//!
//! ```rust
//! # use imagepost_pipeline::{FilterConfig, Image, Pipeline, PipelineError, RgbaImage};
//! # fn run() -> Result<(), PipelineError> {
//! let source = Image::new(RgbaImage::from_pixel(64, 48, [90, 120, 200, 255].into()));
//! let config = FilterConfig {
//!     blur_radius: 3.0,
//!     bloom_enabled: true,
//!     ..FilterConfig::default()
//! };
//! let rendered = Pipeline::new().run(Some(&source), &config)?;
//! assert_eq!(rendered.extent(), source.extent());
//! # Ok(())
//! # }
//! ```
//!
//! # Statelessness
//!
//! A run never sees the output of an earlier run. Callers re-render
//! from the scaled source on every control change, which keeps repeated
//! toggling from compounding filters.

use std::time::Duration;

use web_time::Instant;

use crate::diagnostics::{PipelineDiagnostics, StageDiagnostics};
use crate::glow::{Bloom, Gloom};
use crate::pixellate::Pixellate;
use crate::stage::{FilterStage, Stage};
use crate::tile::ReflectedTile;
use crate::types::{Extent, FilterConfig, Image, PipelineError, RenderLimits};

/// Number of stages in every plan.
pub const STAGE_COUNT: usize = 5;

/// Fixed-order filter pipeline with per-run resource limits.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Pipeline {
    tile: ReflectedTile,
    bloom: Bloom,
    gloom: Gloom,
    pixellate: Pixellate,
    limits: RenderLimits,
}

impl Pipeline {
    /// A pipeline with the built-in stage parameters and default limits.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the resource limits.
    #[must_use]
    pub const fn with_limits(mut self, limits: RenderLimits) -> Self {
        self.limits = limits;
        self
    }

    /// The resource limits applied to every run.
    #[must_use]
    pub const fn limits(&self) -> RenderLimits {
        self.limits
    }

    /// The stage sequence for `config`, paired with each stage's gate.
    ///
    /// The order never changes; only the booleans do.
    #[must_use]
    pub fn plan(&self, config: &FilterConfig) -> [(Stage, bool); STAGE_COUNT] {
        [
            (
                Stage::GaussianBlur {
                    radius: config.blur_radius,
                },
                true,
            ),
            (Stage::ReflectedTile(self.tile), config.tiled_enabled),
            (Stage::Bloom(self.bloom), config.bloom_enabled),
            (Stage::Gloom(self.gloom), config.gloom_enabled),
            (Stage::Pixellate(self.pixellate), config.pixellate_enabled),
        ]
    }

    /// Render `image` with `config`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::EmptyInput`] if `image` is `None` (no
    /// stage runs), [`PipelineError::InvalidConfig`] for an infinite
    /// blur radius, [`PipelineError::Filter`] if a stage fails, and
    /// [`PipelineError::Rasterization`] if the final crop fails or a
    /// resource limit is exceeded.
    pub fn run(&self, image: Option<&Image>, config: &FilterConfig) -> Result<Image, PipelineError> {
        self.run_with_diagnostics(image, config).map(|(output, _)| output)
    }

    /// Render `image` with `config`, also returning per-stage diagnostics.
    ///
    /// # Errors
    ///
    /// Same as [`run`](Self::run).
    pub fn run_with_diagnostics(
        &self,
        image: Option<&Image>,
        config: &FilterConfig,
    ) -> Result<(Image, PipelineDiagnostics), PipelineError> {
        let Some(input) = image else {
            tracing::debug!("no source image; nothing to render");
            return Err(PipelineError::EmptyInput);
        };
        let config = config.sanitized()?;
        let started = Instant::now();
        let target = input.extent();

        let mut stages = Vec::with_capacity(STAGE_COUNT);
        let mut working: Option<Image> = None;

        for (stage, enabled) in self.plan(&config) {
            let current = working.as_ref().unwrap_or(input);
            stages.push(if enabled {
                self.check_pixel_budget(&stage, stage.output_extent(current.extent()))?;

                let stage_started = Instant::now();
                let next = stage.apply(current)?;
                let duration = stage_started.elapsed();
                self.check_time_budget(&stage, duration)?;

                tracing::debug!(
                    stage = stage.name(),
                    extent = %next.extent(),
                    elapsed_ms = duration.as_secs_f64() * 1000.0,
                    "applied stage"
                );
                let extent = next.extent();
                working = Some(next);
                StageDiagnostics {
                    stage: stage.name().to_string(),
                    applied: true,
                    duration,
                    extent,
                }
            } else {
                StageDiagnostics {
                    stage: stage.name().to_string(),
                    applied: false,
                    duration: Duration::ZERO,
                    extent: current.extent(),
                }
            });
        }

        let raster_started = Instant::now();
        let output = crate::raster::rasterize(working.as_ref().unwrap_or(input), target)?;
        let raster_duration = raster_started.elapsed();

        let diagnostics = PipelineDiagnostics {
            input_extent: target,
            stages,
            raster_duration,
            total_duration: started.elapsed(),
        };
        Ok((output, diagnostics))
    }

    fn check_pixel_budget(&self, stage: &Stage, projected: Extent) -> Result<(), PipelineError> {
        if projected.area() > self.limits.max_pixels {
            tracing::warn!(
                stage = stage.name(),
                extent = %projected,
                max_pixels = self.limits.max_pixels,
                "working image would exceed the pixel budget"
            );
            return Err(PipelineError::Rasterization(format!(
                "stage `{}` would produce {} pixels ({projected}), limit is {}",
                stage.name(),
                projected.area(),
                self.limits.max_pixels,
            )));
        }
        Ok(())
    }

    fn check_time_budget(&self, stage: &Stage, elapsed: Duration) -> Result<(), PipelineError> {
        if elapsed > self.limits.stage_budget {
            tracing::warn!(
                stage = stage.name(),
                elapsed_ms = elapsed.as_secs_f64() * 1000.0,
                budget_ms = self.limits.stage_budget.as_secs_f64() * 1000.0,
                "stage exceeded its time budget"
            );
            return Err(PipelineError::Rasterization(format!(
                "stage `{}` took {:.1}ms, budget is {:.1}ms",
                stage.name(),
                elapsed.as_secs_f64() * 1000.0,
                self.limits.stage_budget.as_secs_f64() * 1000.0,
            )));
        }
        Ok(())
    }
}

/// Render `image` with `config` using the built-in stage parameters and
/// default limits.
///
/// # Errors
///
/// See [`Pipeline::run`].
pub fn run_pipeline(image: Option<&Image>, config: &FilterConfig) -> Result<Image, PipelineError> {
    Pipeline::new().run(image, config)
}
