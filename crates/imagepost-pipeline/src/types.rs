//! Shared types for the imagepost filter pipeline.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Re-export `RgbaImage` so downstream crates can build and inspect
/// pixel buffers without depending on `image` directly.
pub use image::RgbaImage;

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

/// Rectangular bounds of an image in filter-space coordinates.
///
/// Filters that spread light or tile their input grow the extent of the
/// working image; the final render always crops back to the extent of
/// the image that entered the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extent {
    /// Left edge (inclusive).
    pub x: i64,
    /// Top edge (inclusive).
    pub y: i64,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Extent {
    /// Create an extent from its origin and size.
    #[must_use]
    pub const fn new(x: i64, y: i64, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// An extent of the given size anchored at the filter-space origin.
    #[must_use]
    pub const fn at_origin(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }

    /// Returns `true` if the extent covers no pixels.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Number of pixels covered.
    #[must_use]
    pub const fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Right edge (exclusive).
    #[must_use]
    pub const fn right(&self) -> i64 {
        self.x + self.width as i64
    }

    /// Bottom edge (exclusive).
    #[must_use]
    pub const fn bottom(&self) -> i64 {
        self.y + self.height as i64
    }

    /// Returns `true` if the filter-space point lies inside the extent.
    #[must_use]
    pub const fn contains(&self, x: i64, y: i64) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }

    /// Grow the extent by `margin` pixels on every side.
    #[must_use]
    pub const fn grow(&self, margin: u32) -> Self {
        Self {
            x: self.x - margin as i64,
            y: self.y - margin as i64,
            width: self.width.saturating_add(margin.saturating_mul(2)),
            height: self.height.saturating_add(margin.saturating_mul(2)),
        }
    }

    /// Size of the extent as [`Dimensions`].
    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        Dimensions {
            width: self.width,
            height: self.height,
        }
    }
}

impl fmt::Display for Extent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}@({}, {})", self.width, self.height, self.x, self.y)
    }
}

/// An immutable RGBA raster positioned in filter space.
///
/// The pixel buffer always has exactly the dimensions of the extent;
/// pixel `(0, 0)` sits at `(extent.x, extent.y)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    pixels: RgbaImage,
    extent: Extent,
}

impl Image {
    /// Wrap a pixel buffer, anchoring it at the filter-space origin.
    #[must_use]
    pub fn new(pixels: RgbaImage) -> Self {
        let extent = Extent::at_origin(pixels.width(), pixels.height());
        Self { pixels, extent }
    }

    /// Wrap a pixel buffer at an explicit extent.
    ///
    /// Returns `None` if the buffer size does not match the extent.
    #[must_use]
    pub fn from_parts(pixels: RgbaImage, extent: Extent) -> Option<Self> {
        (pixels.width() == extent.width && pixels.height() == extent.height)
            .then_some(Self { pixels, extent })
    }

    /// The filter-space bounds of this image.
    #[must_use]
    pub const fn extent(&self) -> Extent {
        self.extent
    }

    /// The underlying pixel buffer.
    #[must_use]
    pub const fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    /// Consume the image and return its pixel buffer.
    #[must_use]
    pub fn into_pixels(self) -> RgbaImage {
        self.pixels
    }

    /// Pixel dimensions.
    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        self.extent.dimensions()
    }

    /// Sample the pixel nearest to a filter-space point, clamping
    /// coordinates outside the extent to the closest edge.
    ///
    /// Must not be called on an empty image.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub(crate) fn sample_clamped(&self, x: i64, y: i64) -> image::Rgba<u8> {
        let max_x = i64::from(self.extent.width) - 1;
        let max_y = i64::from(self.extent.height) - 1;
        let px = (x - self.extent.x).clamp(0, max_x) as u32;
        let py = (y - self.extent.y).clamp(0, max_y) as u32;
        *self.pixels.get_pixel(px, py)
    }
}

/// The four switches that gate the optional pipeline stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Gate {
    /// Eightfold reflected tile.
    Tiled,
    /// Bloom (glow).
    Bloom,
    /// Gloom (dulled highlights).
    Gloom,
    /// Pixellate.
    Pixellate,
}

impl Gate {
    /// All gates, in pipeline order.
    pub const ALL: [Self; 4] = [Self::Tiled, Self::Bloom, Self::Gloom, Self::Pixellate];
}

impl fmt::Display for Gate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tiled => f.write_str("tiled"),
            Self::Bloom => f.write_str("bloom"),
            Self::Gloom => f.write_str("gloom"),
            Self::Pixellate => f.write_str("pixellate"),
        }
    }
}

/// Control state for a single render.
///
/// Built fresh from the current slider and switch positions on every
/// render request; it has no identity beyond its values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
#[allow(clippy::struct_excessive_bools)]
pub struct FilterConfig {
    /// Gaussian blur radius (sigma) in pixels. Negative values are
    /// treated as zero.
    pub blur_radius: f32,
    /// Apply the eightfold reflected tile.
    pub tiled_enabled: bool,
    /// Apply bloom.
    pub bloom_enabled: bool,
    /// Apply gloom.
    pub gloom_enabled: bool,
    /// Apply pixellate.
    pub pixellate_enabled: bool,
}

impl FilterConfig {
    /// Default blur radius: no blur.
    pub const DEFAULT_BLUR_RADIUS: f32 = 0.0;

    /// Whether the given gate is switched on.
    #[must_use]
    pub const fn gate(&self, gate: Gate) -> bool {
        match gate {
            Gate::Tiled => self.tiled_enabled,
            Gate::Bloom => self.bloom_enabled,
            Gate::Gloom => self.gloom_enabled,
            Gate::Pixellate => self.pixellate_enabled,
        }
    }

    /// Switch a gate on or off.
    pub const fn set_gate(&mut self, gate: Gate, enabled: bool) {
        match gate {
            Gate::Tiled => self.tiled_enabled = enabled,
            Gate::Bloom => self.bloom_enabled = enabled,
            Gate::Gloom => self.gloom_enabled = enabled,
            Gate::Pixellate => self.pixellate_enabled = enabled,
        }
    }

    /// Return a copy with the blur radius clamped to `>= 0`.
    ///
    /// NaN is treated as zero.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] if the radius is infinite.
    pub fn sanitized(&self) -> Result<Self, PipelineError> {
        if self.blur_radius.is_infinite() && self.blur_radius > 0.0 {
            return Err(PipelineError::InvalidConfig(
                "blur radius must be finite".to_string(),
            ));
        }
        Ok(Self {
            blur_radius: self.blur_radius.max(0.0),
            ..*self
        })
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            blur_radius: Self::DEFAULT_BLUR_RADIUS,
            tiled_enabled: false,
            bloom_enabled: false,
            gloom_enabled: false,
            pixellate_enabled: false,
        }
    }
}

/// Resource limits applied to every pipeline run.
///
/// Pathological inputs (huge images, huge blur radii) are cut off
/// instead of stalling the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderLimits {
    /// Maximum wall-clock time a single stage may take.
    #[serde(with = "crate::diagnostics::duration_serde")]
    pub stage_budget: Duration,
    /// Maximum pixel count of any working image.
    pub max_pixels: u64,
}

impl RenderLimits {
    /// Default per-stage time budget.
    pub const DEFAULT_STAGE_BUDGET: Duration = Duration::from_secs(2);
    /// Default working image pixel cap (64 Mi pixels).
    pub const DEFAULT_MAX_PIXELS: u64 = 64 * 1024 * 1024;
}

impl Default for RenderLimits {
    fn default() -> Self {
        Self {
            stage_budget: Self::DEFAULT_STAGE_BUDGET,
            max_pixels: Self::DEFAULT_MAX_PIXELS,
        }
    }
}

/// Errors that can occur while decoding, scaling or filtering an image.
///
/// Every error is terminal for the run that produced it: no partial
/// output is ever returned.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// No image was supplied. Callers should leave the display blank.
    #[error("input image data is empty")]
    EmptyInput,

    /// The image bytes could not be decoded.
    #[error("failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// A filter stage could not process its input.
    #[error("filter stage `{stage}` failed: {reason}")]
    Filter {
        /// Name of the failing stage.
        stage: &'static str,
        /// Why the stage failed.
        reason: String,
    },

    /// The final crop failed or a resource limit was exceeded.
    #[error("rasterization failed: {0}")]
    Rasterization(String),

    /// Configuration values are invalid.
    #[error("invalid filter configuration: {0}")]
    InvalidConfig(String),
}
