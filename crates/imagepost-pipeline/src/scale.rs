//! Scaling a picked photo to the display surface.
//!
//! The view is measured in points; the pipeline works in device pixels,
//! so the target size is the view size multiplied by the screen scale.
//! The photo is resized to fit inside that target with its aspect ratio
//! preserved, and the scaled image becomes the fixed source every render
//! starts from.

use std::fmt;

use image::DynamicImage;
use image::imageops::FilterType;
use serde::{Deserialize, Serialize};

use crate::types::{Dimensions, Image, PipelineError};

/// Resampling filter used when scaling a photo to its view.
///
/// Serialized by its snake_case [`name`](Self::name).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResampleFilter {
    /// Nearest neighbour; blocky.
    Nearest,
    /// Bilinear. Cheap and smooth enough for photos shown at view size.
    #[default]
    Triangle,
    /// Bicubic.
    CatmullRom,
    /// Gaussian; softest.
    Gaussian,
    /// Lanczos, 3 lobes; sharpest and slowest.
    Lanczos3,
}

impl ResampleFilter {
    /// Every filter, cheapest first.
    pub const ALL: [Self; 5] = [
        Self::Nearest,
        Self::Triangle,
        Self::CatmullRom,
        Self::Gaussian,
        Self::Lanczos3,
    ];

    /// Stable name, identical to the serialized form.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Nearest => "nearest",
            Self::Triangle => "triangle",
            Self::CatmullRom => "catmull_rom",
            Self::Gaussian => "gaussian",
            Self::Lanczos3 => "lanczos3",
        }
    }
}

impl From<ResampleFilter> for FilterType {
    fn from(filter: ResampleFilter) -> Self {
        match filter {
            ResampleFilter::Nearest => Self::Nearest,
            ResampleFilter::Triangle => Self::Triangle,
            ResampleFilter::CatmullRom => Self::CatmullRom,
            ResampleFilter::Gaussian => Self::Gaussian,
            ResampleFilter::Lanczos3 => Self::Lanczos3,
        }
    }
}

impl fmt::Display for ResampleFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Device-pixel size of a view of `view` points on a screen with the
/// given scale factor.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidConfig`] if the view has a zero
/// dimension or the scale is not a positive finite number.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn device_pixels(view: Dimensions, screen_scale: f32) -> Result<Dimensions, PipelineError> {
    if view.width == 0 || view.height == 0 {
        return Err(PipelineError::InvalidConfig(format!(
            "view size {}x{} has a zero dimension",
            view.width, view.height
        )));
    }
    if !(screen_scale.is_finite() && screen_scale > 0.0) {
        return Err(PipelineError::InvalidConfig(format!(
            "screen scale must be positive, got {screen_scale}"
        )));
    }

    let scale = f64::from(screen_scale);
    let px = |points: u32| (f64::from(points) * scale).round().clamp(1.0, f64::from(u32::MAX)) as u32;
    Ok(Dimensions {
        width: px(view.width),
        height: px(view.height),
    })
}

/// Scale a decoded photo to fit a view on a screen with the given
/// scale factor.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyInput`] if the photo has zero area and
/// [`PipelineError::InvalidConfig`] for an invalid view or scale.
pub fn scale_to_view(
    image: &DynamicImage,
    view: Dimensions,
    screen_scale: f32,
    filter: ResampleFilter,
) -> Result<Image, PipelineError> {
    if image.width() == 0 || image.height() == 0 {
        return Err(PipelineError::EmptyInput);
    }
    let target = device_pixels(view, screen_scale)?;

    if image.width() == target.width && image.height() == target.height {
        return Ok(Image::new(image.to_rgba8()));
    }

    let resized = image.resize(target.width, target.height, filter.into());
    tracing::debug!(
        from_width = image.width(),
        from_height = image.height(),
        to_width = resized.width(),
        to_height = resized.height(),
        %filter,
        "scaled source image to view"
    );
    Ok(Image::new(resized.to_rgba8()))
}
