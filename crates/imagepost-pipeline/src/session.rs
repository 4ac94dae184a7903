//! Headless edit session: the live control state behind one image view.
//!
//! An [`EditSession`] owns the scaled source photo and the current
//! slider/switch positions. Every control change rebuilds the
//! [`FilterConfig`] and re-renders from the scaled source, never from
//! the previous output, so toggling a switch off and on again gets
//! back exactly the image it started from.
//!
//! Without a source the displayed output is blank; that is not an
//! error. A failed render also blanks the output and reports the error,
//! so a stale or partial image is never left on screen.

use image::DynamicImage;

use crate::pipeline::Pipeline;
use crate::scale::{ResampleFilter, scale_to_view};
use crate::types::{Dimensions, FilterConfig, Gate, Image, PipelineError};

/// Control state and rendered output for a single view.
#[derive(Debug, Clone, Default)]
pub struct EditSession {
    pipeline: Pipeline,
    source: Option<Image>,
    controls: FilterConfig,
    output: Option<Image>,
}

impl EditSession {
    /// A session with no source photo and every control at its default.
    #[must_use]
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            pipeline,
            ..Self::default()
        }
    }

    /// The scaled source every render starts from.
    #[must_use]
    pub const fn source(&self) -> Option<&Image> {
        self.source.as_ref()
    }

    /// The last successfully rendered image, if any.
    #[must_use]
    pub const fn output(&self) -> Option<&Image> {
        self.output.as_ref()
    }

    /// Current control state.
    #[must_use]
    pub const fn controls(&self) -> FilterConfig {
        self.controls
    }

    /// Replace the scaled source and re-render.
    ///
    /// Passing `None` clears the source and blanks the output.
    ///
    /// # Errors
    ///
    /// Any render error other than [`PipelineError::EmptyInput`].
    pub fn set_source(&mut self, source: Option<Image>) -> Result<Option<&Image>, PipelineError> {
        self.source = source;
        self.refresh()
    }

    /// Scale a picked photo to the view and make it the new source.
    ///
    /// If scaling fails the source is cleared, leaving the view blank.
    ///
    /// # Errors
    ///
    /// Scaling errors ([`PipelineError::InvalidConfig`]) and render
    /// errors other than [`PipelineError::EmptyInput`].
    pub fn set_photo(
        &mut self,
        photo: &DynamicImage,
        view: Dimensions,
        screen_scale: f32,
        filter: ResampleFilter,
    ) -> Result<Option<&Image>, PipelineError> {
        match scale_to_view(photo, view, screen_scale, filter) {
            Ok(scaled) => self.set_source(Some(scaled)),
            Err(PipelineError::EmptyInput) => self.set_source(None),
            Err(e) => {
                self.source = None;
                self.output = None;
                Err(e)
            }
        }
    }

    /// Move the blur slider and re-render.
    ///
    /// # Errors
    ///
    /// Any render error other than [`PipelineError::EmptyInput`].
    pub fn set_blur_radius(&mut self, radius: f32) -> Result<Option<&Image>, PipelineError> {
        self.controls.blur_radius = radius;
        self.refresh()
    }

    /// Flip a switch and re-render.
    ///
    /// # Errors
    ///
    /// Any render error other than [`PipelineError::EmptyInput`].
    pub fn set_gate(&mut self, gate: Gate, enabled: bool) -> Result<Option<&Image>, PipelineError> {
        self.controls.set_gate(gate, enabled);
        self.refresh()
    }

    /// Replace every control at once and re-render.
    ///
    /// # Errors
    ///
    /// Any render error other than [`PipelineError::EmptyInput`].
    pub fn set_controls(&mut self, controls: FilterConfig) -> Result<Option<&Image>, PipelineError> {
        self.controls = controls;
        self.refresh()
    }

    /// Re-render from the scaled source with the current controls.
    ///
    /// Returns the new output, or `None` when there is no source.
    ///
    /// # Errors
    ///
    /// Any render error other than [`PipelineError::EmptyInput`]; the
    /// output is blanked before the error is returned.
    pub fn refresh(&mut self) -> Result<Option<&Image>, PipelineError> {
        match self.pipeline.run(self.source.as_ref(), &self.controls) {
            Ok(rendered) => {
                self.output = Some(rendered);
                Ok(self.output.as_ref())
            }
            Err(PipelineError::EmptyInput) => {
                self.output = None;
                Ok(None)
            }
            Err(e) => {
                tracing::warn!(error = %e, "render failed; clearing output");
                self.output = None;
                Err(e)
            }
        }
    }
}
