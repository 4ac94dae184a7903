//! Bloom and gloom: blend a blurred copy of the image back over itself.
//!
//! Both filters pad the working image by their radius (replicating the
//! border), build a soft glow layer from it and blend the layer over the
//! padded image:
//!
//! - [`Bloom`] uses a screen blend, lifting shadows and softening edges
//!   into a glow.
//! - [`Gloom`] uses a multiply blend, dulling highlights.
//!
//! Because the glow spreads beyond the original bounds the working
//! extent grows by the radius.
//!
//! The glow layer comes from [`gaussian_blur_rgba`], which blurs large
//! radii on a downscaled copy the way a mip-chain bloom does.

use crate::blur::gaussian_blur_rgba;
use crate::types::{Image, RgbaImage};

/// Screen-blend glow.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bloom {
    /// Glow radius in pixels.
    pub radius: f32,
    /// Blend weight of the glow layer, `0.0..=1.0`.
    pub intensity: f32,
}

impl Bloom {
    /// Default glow radius.
    pub const DEFAULT_RADIUS: f32 = 30.0;
    /// Default blend weight.
    pub const DEFAULT_INTENSITY: f32 = 0.5;

    /// Apply bloom. The caller guarantees `image` is non-empty.
    #[must_use]
    pub fn apply(&self, image: &Image) -> Image {
        let intensity = self.intensity.clamp(0.0, 1.0);
        blend_glow(image, self.radius, |s, g| {
            let g = g * intensity;
            (1.0 - s).mul_add(-(1.0 - g), 1.0)
        })
    }

    /// How far the working extent grows on each side.
    #[must_use]
    pub fn margin(&self) -> u32 {
        radius_margin(self.radius)
    }
}

impl Default for Bloom {
    fn default() -> Self {
        Self {
            radius: Self::DEFAULT_RADIUS,
            intensity: Self::DEFAULT_INTENSITY,
        }
    }
}

/// Multiply-blend glow.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gloom {
    /// Glow radius in pixels.
    pub radius: f32,
    /// Blend weight of the glow layer, `0.0..=1.0`.
    pub intensity: f32,
}

impl Gloom {
    /// Default glow radius.
    pub const DEFAULT_RADIUS: f32 = 10.0;
    /// Default blend weight.
    pub const DEFAULT_INTENSITY: f32 = 0.9;

    /// Apply gloom. The caller guarantees `image` is non-empty.
    #[must_use]
    pub fn apply(&self, image: &Image) -> Image {
        let intensity = self.intensity.clamp(0.0, 1.0);
        blend_glow(image, self.radius, |s, g| s * intensity.mul_add(g - 1.0, 1.0))
    }

    /// How far the working extent grows on each side.
    #[must_use]
    pub fn margin(&self) -> u32 {
        radius_margin(self.radius)
    }
}

impl Default for Gloom {
    fn default() -> Self {
        Self {
            radius: Self::DEFAULT_RADIUS,
            intensity: Self::DEFAULT_INTENSITY,
        }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn radius_margin(radius: f32) -> u32 {
    if radius.is_finite() && radius > 0.0 {
        radius.ceil() as u32
    } else {
        0
    }
}

/// Grow `image` by `margin` on every side, replicating border pixels.
fn pad(image: &Image, margin: u32) -> Image {
    if margin == 0 {
        return image.clone();
    }
    let extent = image.extent().grow(margin);
    let pixels = RgbaImage::from_fn(extent.width, extent.height, |i, j| {
        image.sample_clamped(extent.x + i64::from(i), extent.y + i64::from(j))
    });
    Image::from_parts(pixels, extent).unwrap_or_else(|| image.clone())
}

/// Pad, build the glow layer and blend it per colour channel with `op`
/// (both arguments normalized to `0.0..=1.0`). Alpha is kept from the
/// padded source.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn blend_glow(image: &Image, radius: f32, op: impl Fn(f32, f32) -> f32) -> Image {
    let padded = pad(image, radius_margin(radius));
    let glow = gaussian_blur_rgba(padded.pixels(), radius);

    let src = padded.pixels();
    let pixels = RgbaImage::from_fn(src.width(), src.height(), |x, y| {
        let s = src.get_pixel(x, y).0;
        let g = glow.get_pixel(x, y).0;
        let mut out = s;
        for c in 0..3 {
            let v = op(f32::from(s[c]) / 255.0, f32::from(g[c]) / 255.0);
            out[c] = (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        }
        image::Rgba(out)
    });

    Image::from_parts(pixels, padded.extent()).unwrap_or(padded)
}
