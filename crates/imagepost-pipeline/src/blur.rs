//! Gaussian blur on RGBA rasters.
//!
//! Wraps [`imageproc::filter::gaussian_blur_f32`], which clamps samples
//! at the image border, so flat regions keep their colour right up to
//! the edge instead of fading towards transparent.
//!
//! The cost of a direct blur grows with sigma, so the work is bounded
//! before it starts:
//!
//! - sigma is capped at the longer image side; past that the result is
//!   already close to the clamped image mean.
//! - above [`DIRECT_SIGMA_LIMIT`] the image is blurred on a downscaled
//!   copy and scaled back up, so the kernel sigma never exceeds it.
//!
//! Used directly by the always-on blur stage and by bloom and gloom to
//! build their glow layer.

use image::imageops::{self, FilterType};

use crate::types::{Image, RgbaImage};

/// Largest sigma blurred at full resolution.
pub const DIRECT_SIGMA_LIMIT: f32 = 8.0;

/// Blur an RGBA buffer with bounded cost.
///
/// Non-positive or NaN sigma returns the buffer unchanged, since
/// `imageproc` panics on `sigma <= 0.0`.
#[must_use = "returns the blurred RGBA image"]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn gaussian_blur_rgba(image: &RgbaImage, sigma: f32) -> RgbaImage {
    let (w, h) = image.dimensions();
    if sigma.is_nan() || sigma <= 0.0 || w == 0 || h == 0 {
        return image.clone();
    }

    let sigma = sigma.min(w.max(h) as f32);
    if sigma <= DIRECT_SIGMA_LIMIT {
        return imageproc::filter::gaussian_blur_f32(image, sigma);
    }

    let factor = (sigma / DIRECT_SIGMA_LIMIT).ceil() as u32;
    let small = imageops::resize(image, (w / factor).max(1), (h / factor).max(1), FilterType::Triangle);
    let blurred = imageproc::filter::gaussian_blur_f32(&small, sigma / factor as f32);
    tracing::trace!(sigma, factor, "blurred on downscaled copy");
    imageops::resize(&blurred, w, h, FilterType::Triangle)
}

/// Blur a positioned image, keeping its extent.
///
/// A radius of zero (or less) is an identity pass.
#[must_use = "returns the blurred image"]
pub fn gaussian_blur(image: &Image, radius: f32) -> Image {
    if radius.is_nan() || radius <= 0.0 {
        return image.clone();
    }
    let blurred = gaussian_blur_rgba(image.pixels(), radius);
    Image::from_parts(blurred, image.extent()).unwrap_or_else(|| image.clone())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::Extent;

    /// Left half red, right half blue, sharp boundary at x=5.
    fn red_blue_image() -> RgbaImage {
        RgbaImage::from_fn(10, 10, |x, _y| {
            if x < 5 {
                image::Rgba([255, 0, 0, 255])
            } else {
                image::Rgba([0, 0, 255, 255])
            }
        })
    }

    #[test]
    fn zero_sigma_returns_identical_image() {
        let img = red_blue_image();
        assert_eq!(gaussian_blur_rgba(&img, 0.0), img);
    }

    #[test]
    fn negative_and_nan_sigma_return_identical_image() {
        let img = red_blue_image();
        assert_eq!(gaussian_blur_rgba(&img, -1.0), img);
        assert_eq!(gaussian_blur_rgba(&img, f32::NAN), img);
    }

    #[test]
    fn output_dimensions_preserved() {
        let img = RgbaImage::new(17, 31);
        for sigma in [1.4, 20.0, 1.0e6] {
            let blurred = gaussian_blur_rgba(&img, sigma);
            assert_eq!(blurred.dimensions(), (17, 31), "sigma {sigma}");
        }
    }

    #[test]
    fn blur_smooths_sharp_color_edge() {
        let blurred = gaussian_blur_rgba(&red_blue_image(), 2.0);

        let left = blurred.get_pixel(4, 5).0[0];
        let right = blurred.get_pixel(5, 5).0[0];
        assert!(left < 255, "expected red to decrease near boundary, got {left}");
        assert!(right > 0, "expected red to increase near boundary, got {right}");
    }

    #[test]
    fn uniform_image_stays_uniform_up_to_the_border() {
        let img = RgbaImage::from_pixel(12, 12, image::Rgba([100, 150, 200, 250]));
        for sigma in [3.0, 40.0] {
            let blurred = gaussian_blur_rgba(&img, sigma);
            for pixel in blurred.pixels() {
                for (c, &exp) in [100u8, 150, 200, 250].iter().enumerate() {
                    let diff = i16::from(pixel.0[c]) - i16::from(exp);
                    assert!(diff.abs() <= 1, "sigma {sigma} channel {c}: got {}", pixel.0[c]);
                }
            }
        }
    }

    #[test]
    fn huge_sigma_flattens_towards_the_mean() {
        let blurred = gaussian_blur_rgba(&red_blue_image(), 1.0e30);
        let left = blurred.get_pixel(0, 5).0;
        let right = blurred.get_pixel(9, 5).0;
        assert!(left[0].abs_diff(right[0]) < 128, "left {left:?} right {right:?}");
        assert!(left[2].abs_diff(right[2]) < 128, "left {left:?} right {right:?}");
    }

    #[test]
    fn positioned_blur_keeps_extent() {
        let extent = Extent::new(-7, 3, 10, 10);
        let img = Image::from_parts(red_blue_image(), extent).unwrap();
        let blurred = gaussian_blur(&img, 1.5);
        assert_eq!(blurred.extent(), extent);
        assert_ne!(blurred, img);
    }

    #[test]
    fn positioned_blur_zero_radius_is_identity() {
        let img = Image::new(red_blue_image());
        assert_eq!(gaussian_blur(&img, 0.0), img);
    }
}
