//! Filter stages: one variant per built-in filter.
//!
//! This module defines the [`FilterStage`] trait every stage implements
//! and the [`Stage`] enum that carries each filter's fixed parameters.
//!
//! # Gating
//!
//! Stages do not know whether they are switched on. The pipeline pairs
//! each stage with the boolean from [`FilterConfig`] that gates it (see
//! [`Stage::gate`]) and walks the pairs in order; a disabled stage is
//! simply not called.
//!
//! [`FilterConfig`]: crate::types::FilterConfig

use crate::glow::{Bloom, Gloom};
use crate::pixellate::Pixellate;
use crate::tile::ReflectedTile;
use crate::types::{Extent, Gate, Image, PipelineError};

/// Trait for a single filter operation.
///
/// Implementations are pure: the output depends only on the input image
/// and the parameters held by the stage.
pub trait FilterStage {
    /// Stable, human-readable stage name used in errors and diagnostics.
    fn name(&self) -> &'static str;

    /// Extent of the image [`apply`](Self::apply) would produce for an
    /// input with the given extent.
    fn output_extent(&self, input: Extent) -> Extent;

    /// Run the stage.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Filter`] if the input has zero area.
    fn apply(&self, image: &Image) -> Result<Image, PipelineError>;
}

/// A filter with its parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Stage {
    /// Gaussian blur with the slider radius. Never gated.
    GaussianBlur {
        /// Blur sigma in pixels; `<= 0` is an identity.
        radius: f32,
    },
    /// Eightfold reflected tile.
    ReflectedTile(ReflectedTile),
    /// Screen-blend glow.
    Bloom(Bloom),
    /// Multiply-blend glow.
    Gloom(Gloom),
    /// Block mosaic.
    Pixellate(Pixellate),
}

impl Stage {
    /// The switch that gates this stage, or `None` for the always-on blur.
    #[must_use]
    pub const fn gate(&self) -> Option<Gate> {
        match self {
            Self::GaussianBlur { .. } => None,
            Self::ReflectedTile(_) => Some(Gate::Tiled),
            Self::Bloom(_) => Some(Gate::Bloom),
            Self::Gloom(_) => Some(Gate::Gloom),
            Self::Pixellate(_) => Some(Gate::Pixellate),
        }
    }
}

impl FilterStage for Stage {
    fn name(&self) -> &'static str {
        match self {
            Self::GaussianBlur { .. } => "gaussian_blur",
            Self::ReflectedTile(_) => "eightfold_reflected_tile",
            Self::Bloom(_) => "bloom",
            Self::Gloom(_) => "gloom",
            Self::Pixellate(_) => "pixellate",
        }
    }

    fn output_extent(&self, input: Extent) -> Extent {
        match self {
            Self::GaussianBlur { .. } | Self::Pixellate(_) => input,
            Self::ReflectedTile(tile) => tile.output_extent(input),
            Self::Bloom(bloom) => input.grow(bloom.margin()),
            Self::Gloom(gloom) => input.grow(gloom.margin()),
        }
    }

    fn apply(&self, image: &Image) -> Result<Image, PipelineError> {
        if image.extent().is_empty() {
            return Err(PipelineError::Filter {
                stage: self.name(),
                reason: format!("input image has zero area ({})", image.extent()),
            });
        }

        Ok(match self {
            Self::GaussianBlur { radius } => crate::blur::gaussian_blur(image, *radius),
            Self::ReflectedTile(tile) => tile.apply(image),
            Self::Bloom(bloom) => bloom.apply(image),
            Self::Gloom(gloom) => gloom.apply(image),
            Self::Pixellate(pixellate) => pixellate.apply(image),
        })
    }
}
